//! Flat routing table mapping partition ranges to owning nodes.
//!
//! Entries are keyed by range start in a `BTreeMap`, so containment lookup is
//! a single `range(..=key).next_back()` probe. The table must always tile the
//! key space `[0, max_key)`: pairwise-disjoint ranges with no gaps.

use crate::types::{KeyRange, NodeId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct RouteEntry {
    end: u64,
    node: NodeId,
}

/// Mapping from partition range to owning node.
#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    entries: BTreeMap<u64, RouteEntry>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of routed ranges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no ranges.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the range containing `key` and its owning node.
    pub fn lookup(&self, key: u64) -> Option<(KeyRange, NodeId)> {
        let (&start, entry) = self.entries.range(..=key).next_back()?;
        if entry.end < key {
            return None;
        }
        Some((KeyRange::new(start, entry.end), entry.node))
    }

    /// Route `range` to `node`.
    pub fn insert(&mut self, range: KeyRange, node: NodeId) {
        self.entries.insert(
            range.start,
            RouteEntry {
                end: range.end,
                node,
            },
        );
    }

    /// Remove the entry for exactly `range`, returning its owner.
    pub fn remove(&mut self, range: KeyRange) -> Option<NodeId> {
        match self.entries.get(&range.start) {
            Some(entry) if entry.end == range.end => {
                self.entries.remove(&range.start).map(|e| e.node)
            }
            _ => None,
        }
    }

    /// Re-point the entry for exactly `range` at a new owner.
    ///
    /// Returns false if no such range is routed.
    pub fn reassign(&mut self, range: KeyRange, node: NodeId) -> bool {
        match self.entries.get_mut(&range.start) {
            Some(entry) if entry.end == range.end => {
                entry.node = node;
                true
            }
            _ => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over `(range, node)` pairs in range order.
    pub fn iter(&self) -> impl Iterator<Item = (KeyRange, NodeId)> + '_ {
        self.entries
            .iter()
            .map(|(&start, entry)| (KeyRange::new(start, entry.end), entry.node))
    }

    /// Whether the routed ranges tile `[0, max_key)` exactly: no gaps, no
    /// overlaps, nothing past the end of the key space.
    pub fn covers_exactly(&self, max_key: u64) -> bool {
        let mut next = 0u64;
        for (range, _) in self.iter() {
            if range.start != next || range.end >= max_key {
                return false;
            }
            next = range.end + 1;
        }
        next == max_key
    }
}
