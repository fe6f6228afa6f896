//! Core types: identifiers, key ranges, records, and state snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier in the cluster.
pub type NodeId = u64;

/// A contiguous, inclusive range of routing keys.
///
/// Ranges are the unit of routing: every partition owns exactly one range, and
/// across the whole cluster the ranges are pairwise disjoint and tile the key
/// space `[0, max_key)` without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    /// First key covered by this range.
    pub start: u64,
    /// Last key covered by this range (inclusive).
    pub end: u64,
}

impl KeyRange {
    /// Create a new inclusive range. `start` must not exceed `end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "invalid range [{start}, {end}]");
        Self { start, end }
    }

    /// Whether `key` falls inside this range (inclusive on both ends).
    pub fn contains(&self, key: u64) -> bool {
        self.start <= key && key <= self.end
    }

    /// Number of keys covered.
    pub fn width(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Midpoint used for splitting: `start + (end - start) / 2`.
    ///
    /// A key equal to the midpoint belongs to the lower half.
    pub fn midpoint(&self) -> u64 {
        self.start + (self.end - self.start) / 2
    }

    /// Whether this range covers a single key and therefore cannot be split.
    pub fn is_unit(&self) -> bool {
        self.start == self.end
    }

    /// Split into `([start, mid], [mid + 1, end])`.
    ///
    /// Returns `None` for a unit range.
    pub fn split(&self) -> Option<(KeyRange, KeyRange)> {
        if self.is_unit() {
            return None;
        }
        let mid = self.midpoint();
        Some((
            KeyRange::new(self.start, mid),
            KeyRange::new(mid + 1, self.end),
        ))
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A record stored in the cluster.
///
/// The `id` is the identifying field fed to the hash oracle; the payload is
/// opaque to the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifying field; hashed to derive the routing key.
    pub id: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl Record {
    /// Create a new record.
    pub fn new(id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Deep copy of a partition's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    /// Key range owned by the partition.
    pub range: KeyRange,
    /// Records currently assigned to the partition, in insertion order.
    pub records: Vec<Record>,
}

/// Deep copy of a node's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// The node's ID.
    pub id: NodeId,
    /// Partitions owned by the node, sorted by range start.
    pub partitions: Vec<PartitionSnapshot>,
}

impl NodeSnapshot {
    /// Total number of records held by this node.
    pub fn record_count(&self) -> usize {
        self.partitions.iter().map(|p| p.records.len()).sum()
    }
}

/// Deep, order-stable copy of the whole cluster state.
///
/// Published to the [`StateObserver`](crate::observer::StateObserver) after
/// every mutating operation. Never an alias of the manager's internal state;
/// mutating a snapshot has no effect on the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// All nodes, sorted by ID.
    pub nodes: Vec<NodeSnapshot>,
}

impl ClusterSnapshot {
    /// Look up a node snapshot by ID.
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Total number of records across all nodes.
    pub fn record_count(&self) -> usize {
        self.nodes.iter().map(|n| n.record_count()).sum()
    }

    /// Total number of partitions across all nodes.
    pub fn partition_count(&self) -> usize {
        self.nodes.iter().map(|n| n.partitions.len()).sum()
    }
}
