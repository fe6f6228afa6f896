//! The shard manager: node registry, routing table, and rebalancing policy.

use crate::config::ShardConfig;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::observer::{NoopObserver, StateObserver};
use crate::oracle::{HashOracle, XxHashOracle};
use crate::partition::Partition;
use crate::routing::RoutingTable;
use crate::types::{ClusterSnapshot, KeyRange, NodeId, Record};
use std::cmp::Reverse;

/// Owns the node registry and the routing table; implements insert, node
/// lifecycle, partition splitting, and the rebalancing policy.
///
/// The manager is single-threaded and synchronous: every operation runs to
/// completion, mutates in-memory state, and finishes by publishing a deep
/// snapshot to the configured observer. There is no internal locking; an
/// embedding driver that calls from multiple threads must serialize access
/// externally.
///
/// The system always starts (and resets to) one node owning one partition
/// spanning the full key space.
pub struct ShardManager {
    config: ShardConfig,
    oracle: Box<dyn HashOracle>,
    observer: Box<dyn StateObserver>,
    nodes: Vec<Node>,
    routing: RoutingTable,
    next_node_id: NodeId,
    inserts: u64,
}

impl ShardManager {
    /// Create a manager with the default `XxHash64` oracle.
    pub fn new(config: ShardConfig) -> Result<Self> {
        Self::with_oracle(config, Box::new(XxHashOracle))
    }

    /// Create a manager with a caller-supplied hash oracle.
    pub fn with_oracle(config: ShardConfig, oracle: Box<dyn HashOracle>) -> Result<Self> {
        config.validate()?;
        let mut manager = Self {
            config,
            oracle,
            observer: Box::new(NoopObserver),
            nodes: Vec::new(),
            routing: RoutingTable::new(),
            next_node_id: 0,
            inserts: 0,
        };
        manager.bootstrap();
        Ok(manager)
    }

    /// Install the observer that receives a snapshot after every mutation.
    pub fn set_observer(&mut self, observer: Box<dyn StateObserver>) {
        self.observer = observer;
    }

    /// The active configuration.
    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total records stored across all partitions.
    pub fn record_count(&self) -> usize {
        self.nodes.iter().map(|n| n.record_count()).sum()
    }

    /// Successful inserts since construction or the last reset.
    pub fn insert_count(&self) -> u64 {
        self.inserts
    }

    /// The routing table (range to owning node).
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Derive the routing key for an identifying field.
    pub fn derive_key(&self, id: &str) -> u64 {
        self.oracle.hash(id) % self.config.max_key
    }

    /// Insert a record, splitting the receiving partition if it ends up over
    /// the size threshold. Returns the derived routing key.
    pub fn insert(&mut self, record: Record) -> Result<u64> {
        let key = self.derive_key(&record.id);
        let Some((_, node_id)) = self.routing.lookup(key) else {
            tracing::error!(key, id = %record.id, "Routing miss: no partition range covers key");
            return Err(Error::RoutingMiss { key });
        };
        let Some(idx) = self.node_index(node_id) else {
            tracing::error!(key, node_id, "Routing table references unregistered node");
            return Err(Error::RoutingMiss { key });
        };
        let Some((range, len)) = self.nodes[idx].insert(record, key) else {
            tracing::error!(key, node_id, "Routing table and node partition list diverged");
            return Err(Error::RoutingMiss { key });
        };
        self.inserts += 1;
        tracing::debug!(key, node_id, %range, records = len, "Inserted record");

        if len > self.config.max_partition_size {
            self.split_overfull(node_id, range);
        }
        self.publish();
        Ok(key)
    }

    /// Register a new empty node and rebalance onto it.
    ///
    /// Node IDs are allocated monotonically and never reused within a session.
    pub fn create_node(&mut self) -> NodeId {
        let node_id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.push(Node::new(node_id));
        tracing::info!(node_id, "Created node");

        if self.nodes.len() > 1 {
            self.rebalance_pass();
        }
        self.publish();
        node_id
    }

    /// Remove a node, handing each of its partitions to the least-busy
    /// survivor. The split threshold is not re-checked on transfer.
    ///
    /// Deleting the only remaining node is refused.
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<()> {
        let idx = self
            .node_index(node_id)
            .ok_or(Error::UnknownNode { node_id })?;
        if self.nodes.len() == 1 {
            tracing::warn!(node_id, "Refusing to delete the last node");
            return Err(Error::LastNode { node_id });
        }

        let node = self.nodes.remove(idx);
        let partitions = node.into_partitions();
        let moved = partitions.len();
        for partition in partitions {
            // Least-busy is recomputed per partition, so earlier transfers
            // influence where later ones land.
            let target = self.least_busy_node();
            let range = partition.range();
            self.routing.reassign(range, target);
            if let Some(tidx) = self.node_index(target) {
                self.nodes[tidx].add_partition(partition);
            }
            tracing::debug!(node_id, target, %range, "Reassigned partition from deleted node");
        }

        tracing::info!(node_id, partitions = moved, "Deleted node");
        self.publish();
        Ok(())
    }

    /// Greedy rebalancing pass, then publish.
    ///
    /// Moves the busiest node's biggest partition to the least-busy node while
    /// the population standard deviation of per-node record counts exceeds the
    /// configured target, within the iteration budget. Ties on busyness break
    /// toward the lowest node ID. The heuristic looks only at aggregate
    /// per-node record counts, not individual partition sizes, and makes no
    /// optimality guarantee.
    ///
    /// The pass ends in one of three ways: the standard deviation drops to the
    /// target, the iteration budget runs out, or the pass stalls — a committed
    /// move failed to reduce the standard deviation (the next iteration would
    /// undo it), or the busiest and least-busy node coincide. A stalled move is
    /// kept, so a whole-partition transfer to a strictly less busy node is
    /// never rolled back.
    pub fn rebalance_nodes(&mut self) {
        self.rebalance_pass();
        self.publish();
    }

    /// Population standard deviation of per-node record counts:
    /// `sqrt(sum((count - mean)^2) / n)`.
    pub fn std_dev(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let n = self.nodes.len() as f64;
        let counts: Vec<f64> = self.nodes.iter().map(|n| n.record_count() as f64).collect();
        let mean = counts.iter().sum::<f64>() / n;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }

    /// Deep, order-stable snapshot of the cluster: nodes sorted by ID,
    /// partitions sorted by range start. Never aliases internal state.
    pub fn get_state(&self) -> ClusterSnapshot {
        let mut nodes: Vec<_> = self.nodes.iter().map(|n| n.snapshot()).collect();
        nodes.sort_by_key(|n| n.id);
        ClusterSnapshot { nodes }
    }

    /// Discard all state and reinitialize to one node owning the full key
    /// space. Node IDs restart at zero.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.routing.clear();
        self.next_node_id = 0;
        self.inserts = 0;
        self.bootstrap();
        tracing::info!("Reset to single-node, single-partition state");
        self.publish();
    }

    fn bootstrap(&mut self) {
        let full = KeyRange::new(0, self.config.max_key - 1);
        let node_id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes
            .push(Node::with_partitions(node_id, vec![Partition::new(full)]));
        self.routing.insert(full, node_id);
    }

    /// Split the over-threshold partition, then any over-threshold halves,
    /// iteratively. Each step keeps the lower half on the originating node and
    /// hands the upper half to the least-busy node. Unit ranges stay put; the
    /// depth guard bounds the loop at one split per bit of key-space width.
    fn split_overfull(&mut self, node_id: NodeId, range: KeyRange) {
        let max_depth = self.config.max_key.ilog2() + 1;
        let mut work = vec![(node_id, range, 0u32)];

        while let Some((origin, range, depth)) = work.pop() {
            if depth >= max_depth {
                tracing::warn!(origin, %range, depth, "Split depth guard reached");
                continue;
            }
            let target = self.least_busy_node();
            let Some(origin_idx) = self.node_index(origin) else {
                continue;
            };
            let upper = match self.nodes[origin_idx].split_partition(
                range,
                self.oracle.as_ref(),
                self.config.max_key,
            ) {
                Ok(partition) => partition,
                Err(Error::UnsplittablePartition { range }) => {
                    tracing::warn!(
                        origin,
                        %range,
                        "Partition over threshold but covers a single key; leaving in place"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::error!(origin, %range, %err, "Split failed");
                    continue;
                }
            };

            let lower_range = KeyRange::new(range.start, range.midpoint());
            let upper_range = upper.range();
            let upper_len = upper.len();
            let lower_len = self.nodes[origin_idx]
                .partition_for(lower_range.start)
                .map(|p| p.len())
                .unwrap_or(0);

            self.routing.remove(range);
            self.routing.insert(lower_range, origin);
            self.routing.insert(upper_range, target);
            if let Some(target_idx) = self.node_index(target) {
                self.nodes[target_idx].add_partition(upper);
            }

            tracing::info!(
                origin,
                target,
                %range,
                %lower_range,
                %upper_range,
                lower = lower_len,
                upper = upper_len,
                "Split partition"
            );

            if lower_len > self.config.max_partition_size {
                work.push((origin, lower_range, depth + 1));
            }
            if upper_len > self.config.max_partition_size {
                work.push((target, upper_range, depth + 1));
            }
        }
    }

    fn rebalance_pass(&mut self) {
        let mut tries = self.config.rebalance_max_iters;
        let mut std_dev = self.std_dev();

        while std_dev > self.config.rebalance_std_dev && tries > 0 {
            let busiest = self.busiest_node();
            let least = self.least_busy_node();
            if busiest == least {
                break;
            }
            let Some(bidx) = self.node_index(busiest) else {
                break;
            };
            let Some(range) = self.nodes[bidx].biggest_partition().map(|p| p.range()) else {
                break;
            };
            let Some(partition) = self.nodes[bidx].take_partition(range) else {
                break;
            };
            let records = partition.len();
            self.routing.reassign(range, least);
            if let Some(lidx) = self.node_index(least) {
                self.nodes[lidx].add_partition(partition);
            }
            tries -= 1;

            let new_std_dev = self.std_dev();
            tracing::info!(
                from = busiest,
                to = least,
                %range,
                records,
                std_dev = new_std_dev,
                "Rebalance: moved partition"
            );

            // A move that does not reduce skew would be undone by the next
            // iteration; stop instead of oscillating the budget away.
            if new_std_dev >= std_dev {
                tracing::warn!(std_dev = new_std_dev, "Rebalance stalled; stopping early");
                std_dev = new_std_dev;
                break;
            }
            std_dev = new_std_dev;
        }

        if tries == 0 && std_dev > self.config.rebalance_std_dev {
            tracing::warn!(
                std_dev,
                budget = self.config.rebalance_max_iters,
                "Rebalance budget exhausted before convergence"
            );
        }
    }

    fn node_index(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == node_id)
    }

    /// Node with the fewest records; ties break toward the lowest ID.
    fn least_busy_node(&self) -> NodeId {
        self.nodes
            .iter()
            .min_by_key(|n| (n.record_count(), n.id()))
            .map(|n| n.id())
            .unwrap_or(0)
    }

    /// Node with the most records; ties break toward the lowest ID.
    fn busiest_node(&self) -> NodeId {
        self.nodes
            .iter()
            .min_by_key(|n| (Reverse(n.record_count()), n.id()))
            .map(|n| n.id())
            .unwrap_or(0)
    }

    fn publish(&self) {
        debug_assert!(
            self.routing.covers_exactly(self.config.max_key),
            "routing table no longer tiles the key space"
        );
        let snapshot = self.get_state();
        self.observer.on_state(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_record, IdentityOracle, RecordingObserver};

    fn manager(max_key: u64, threshold: usize) -> ShardManager {
        ShardManager::with_oracle(
            ShardConfig::new(max_key).with_max_partition_size(threshold),
            Box::new(IdentityOracle),
        )
        .unwrap()
    }

    #[test]
    fn test_starts_with_one_node_owning_full_key_space() {
        let manager = manager(1000, 5);
        let state = manager.get_state();

        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.nodes[0].id, 0);
        assert_eq!(state.nodes[0].partitions.len(), 1);
        assert_eq!(state.nodes[0].partitions[0].range, KeyRange::new(0, 999));
        assert!(manager.routing().covers_exactly(1000));
    }

    #[test]
    fn test_insert_places_record_by_derived_key() {
        let mut manager = manager(1000, 5);
        let key = manager.insert(numbered_record(42)).unwrap();

        assert_eq!(key, 42);
        assert_eq!(manager.record_count(), 1);
        assert_eq!(manager.insert_count(), 1);
    }

    #[test]
    fn test_create_node_allocates_monotonic_ids() {
        let mut manager = manager(1000, 5);
        assert_eq!(manager.create_node(), 1);
        assert_eq!(manager.create_node(), 2);
        manager.delete_node(1).unwrap();
        // IDs are never reused within a session.
        assert_eq!(manager.create_node(), 3);
    }

    #[test]
    fn test_delete_unknown_node() {
        let mut manager = manager(1000, 5);
        manager.create_node();
        assert_eq!(
            manager.delete_node(99),
            Err(Error::UnknownNode { node_id: 99 })
        );
    }

    #[test]
    fn test_std_dev_uses_population_formula() {
        let mut manager = manager(1000, 100);
        manager.create_node();
        // Node 0 owns everything, so all records land there.
        for key in 0..10 {
            manager.insert(numbered_record(key)).unwrap();
        }
        // Counts are (10, 0): mean 5, variance 25, std dev 5.
        assert!((manager.std_dev() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut manager = manager(1000, 5);
        for key in 0..20 {
            manager.insert(numbered_record(key)).unwrap();
        }
        manager.create_node();
        manager.reset();

        let state = manager.get_state();
        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.nodes[0].id, 0);
        assert_eq!(state.record_count(), 0);
        assert_eq!(manager.insert_count(), 0);
        assert!(manager.routing().covers_exactly(1000));
        // ID allocation restarts too.
        assert_eq!(manager.create_node(), 1);
    }

    #[test]
    fn test_observer_invoked_after_every_mutation() {
        let mut manager = manager(1000, 5);
        let observer = RecordingObserver::new();
        let handle = observer.handle();
        manager.set_observer(Box::new(observer));

        manager.insert(numbered_record(1)).unwrap();
        manager.create_node();
        manager.rebalance_nodes();
        manager.delete_node(1).unwrap();
        manager.reset();

        assert_eq!(handle.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_failed_operation_does_not_publish_or_mutate() {
        let mut manager = manager(1000, 5);
        let observer = RecordingObserver::new();
        let handle = observer.handle();
        manager.set_observer(Box::new(observer));

        let before = manager.get_state();
        assert_eq!(
            manager.delete_node(0),
            Err(Error::LastNode { node_id: 0 })
        );
        assert_eq!(manager.get_state(), before);
        assert!(handle.lock().unwrap().is_empty());
    }
}
