//! Configuration for the shard manager.

use crate::error::{Error, Result};

/// Construction-time configuration for a [`ShardManager`](crate::ShardManager).
///
/// All values are fixed for the lifetime of the manager; changing them requires
/// constructing a new manager.
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Size of the key space. Routing keys are derived modulo this value, so
    /// partitions tile `[0, max_key)`.
    pub max_key: u64,

    /// Split threshold: a partition holding strictly more records than this
    /// after an insert is split.
    pub max_partition_size: usize,

    /// Rebalancing target: the population standard deviation of per-node
    /// record counts the rebalancer tries to get under.
    pub rebalance_std_dev: f64,

    /// Iteration budget for a single rebalancing pass.
    pub rebalance_max_iters: u32,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            max_key: 1000,
            max_partition_size: 10,
            rebalance_std_dev: 1.0,
            rebalance_max_iters: 30,
        }
    }
}

impl ShardConfig {
    /// Create a configuration with the given key-space size.
    pub fn new(max_key: u64) -> Self {
        Self {
            max_key,
            ..Default::default()
        }
    }

    /// Set the partition split threshold.
    pub fn with_max_partition_size(mut self, size: usize) -> Self {
        self.max_partition_size = size;
        self
    }

    /// Set the rebalancing standard-deviation target.
    pub fn with_rebalance_std_dev(mut self, std_dev: f64) -> Self {
        self.rebalance_std_dev = std_dev;
        self
    }

    /// Set the rebalancing iteration budget.
    pub fn with_rebalance_max_iters(mut self, iters: u32) -> Self {
        self.rebalance_max_iters = iters;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_key == 0 {
            return Err(Error::Config("max_key must be greater than zero".into()));
        }
        if self.max_partition_size == 0 {
            return Err(Error::Config(
                "max_partition_size must be greater than zero".into(),
            ));
        }
        if !self.rebalance_std_dev.is_finite() || self.rebalance_std_dev < 0.0 {
            return Err(Error::Config(
                "rebalance_std_dev must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
