//! Testing utilities: deterministic oracles, a recording observer, and record
//! builders shared by the unit and scenario suites.


use crate::observer::StateObserver;
use crate::oracle::{HashOracle, XxHashOracle};
use crate::types::{ClusterSnapshot, Record};
use std::sync::{Arc, Mutex};

/// Route tracing output through the test harness. Safe to call from every
/// test; only the first call installs the subscriber.
#[cfg(test)]
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Oracle that reads the identifying field as the routing key itself.
///
/// `numbered_record(42)` hashes to 42, which makes placement in tests
/// readable at a glance. Non-numeric IDs fall back to the default oracle.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityOracle;

impl HashOracle for IdentityOracle {
    fn hash(&self, id: &str) -> u64 {
        id.parse().unwrap_or_else(|_| XxHashOracle.hash(id))
    }
}

/// Record whose ID is the decimal rendering of `key`; with [`IdentityOracle`]
/// its routing key is `key` itself.
pub fn numbered_record(key: u64) -> Record {
    Record::new(key.to_string(), Vec::new())
}

/// Observer that appends every published snapshot to a shared vector.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<ClusterSnapshot>>>,
}

impl RecordingObserver {
    /// Create an observer with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the captured snapshots; keep it before handing the
    /// observer to the manager.
    pub fn handle(&self) -> Arc<Mutex<Vec<ClusterSnapshot>>> {
        Arc::clone(&self.snapshots)
    }
}

impl StateObserver for RecordingObserver {
    fn on_state(&self, snapshot: &ClusterSnapshot) {
        // Keep recording even if an earlier panic poisoned the mutex, so the
        // failing test reports its own assertion instead of a poison error.
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot.clone());
    }
}
