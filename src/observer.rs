//! State observer sink.
//!
//! The manager publishes a deep [`ClusterSnapshot`] after every mutating
//! operation. Observers receive the snapshot synchronously and must not panic;
//! they cannot mutate manager state through it.

use crate::types::ClusterSnapshot;

/// Listener for cluster state snapshots.
pub trait StateObserver: Send + Sync {
    /// Called after every successful state-mutating operation.
    fn on_state(&self, snapshot: &ClusterSnapshot);
}

/// No-op observer.
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn on_state(&self, _snapshot: &ClusterSnapshot) {}
}

/// Observer that logs a summary of each published snapshot.
pub struct LoggingObserver;

impl StateObserver for LoggingObserver {
    fn on_state(&self, snapshot: &ClusterSnapshot) {
        tracing::debug!(
            nodes = snapshot.nodes.len(),
            partitions = snapshot.partition_count(),
            records = snapshot.record_count(),
            "Cluster state published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingObserver;

    #[test]
    fn test_recording_observer_captures_snapshots() {
        let observer = RecordingObserver::new();
        let handle = observer.handle();

        let snapshot = ClusterSnapshot { nodes: Vec::new() };
        observer.on_state(&snapshot);
        observer.on_state(&snapshot);

        let seen = handle.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], snapshot);
    }

    #[test]
    fn test_recording_observer_survives_poisoned_lock() {
        let observer = RecordingObserver::new();
        let handle = observer.handle();

        let poisoner = std::sync::Arc::clone(&handle);
        std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the snapshot log");
        })
        .join()
        .unwrap_err();

        // Recording still works and the log is still readable.
        observer.on_state(&ClusterSnapshot { nodes: Vec::new() });
        let seen = handle.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(seen.len(), 1);
    }
}
