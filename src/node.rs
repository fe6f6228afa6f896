//! A logical storage node owning a disjoint set of partitions.

use crate::error::{Error, Result};
use crate::oracle::HashOracle;
use crate::partition::Partition;
use crate::types::{KeyRange, NodeId, NodeSnapshot, Record};

/// A node in the cluster: a stable ID plus the partitions it currently owns.
///
/// Nodes handle record placement and partition splitting local to themselves;
/// which node a key routes to, and where a split-off half lands, is decided by
/// the manager.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    partitions: Vec<Partition>,
}

impl Node {
    /// Create an empty node.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            partitions: Vec::new(),
        }
    }

    /// Create a node owning the given partitions.
    pub fn with_partitions(id: NodeId, partitions: Vec<Partition>) -> Self {
        Self { id, partitions }
    }

    /// The node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The partitions this node owns, in acquisition order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Total number of records across all owned partitions.
    pub fn record_count(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    /// Find the owned partition whose range contains `key`.
    ///
    /// Ranges on one node are disjoint, so at most one partition matches.
    pub fn partition_for(&self, key: u64) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.range().contains(key))
    }

    /// Append `record` into the partition containing `key`.
    ///
    /// Returns the partition's range and post-insert record count so the
    /// caller can decide whether a split is due, or `None` if no owned
    /// partition covers the key.
    pub fn insert(&mut self, record: Record, key: u64) -> Option<(KeyRange, usize)> {
        let partition = self.partitions.iter_mut().find(|p| p.range().contains(key))?;
        partition.push(record);
        Some((partition.range(), partition.len()))
    }

    /// Split the owned partition covering `range` at its midpoint.
    ///
    /// Each record's routing key is re-derived through the oracle and the
    /// record is assigned to whichever half contains it; a key equal to the
    /// midpoint lands in the lower half. The lower half replaces the original
    /// partition on this node; the upper half is returned for the manager to
    /// place on a target node.
    ///
    /// A unit range is rejected with [`Error::UnsplittablePartition`] and the
    /// partition is left untouched.
    pub fn split_partition(
        &mut self,
        range: KeyRange,
        oracle: &dyn HashOracle,
        max_key: u64,
    ) -> Result<Partition> {
        let idx = self
            .partitions
            .iter()
            .position(|p| p.range() == range)
            .ok_or(Error::RoutingMiss { key: range.start })?;

        let (lower_range, upper_range) = range.split().ok_or(Error::UnsplittablePartition {
            range,
        })?;

        let source = self.partitions.remove(idx);
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        for record in source.into_records() {
            let key = oracle.hash(&record.id) % max_key;
            if lower_range.contains(key) {
                lower.push(record);
            } else {
                upper.push(record);
            }
        }

        tracing::debug!(
            node_id = self.id,
            %range,
            lower = lower.len(),
            upper = upper.len(),
            "Split partition records by re-derived key"
        );

        // Lower half takes the original partition's slot so biggest-partition
        // tie-breaking stays deterministic.
        self.partitions
            .insert(idx, Partition::with_records(lower_range, lower));
        Ok(Partition::with_records(upper_range, upper))
    }

    /// Remove and return the owned partition covering exactly `range`.
    pub fn take_partition(&mut self, range: KeyRange) -> Option<Partition> {
        let idx = self.partitions.iter().position(|p| p.range() == range)?;
        Some(self.partitions.remove(idx))
    }

    /// Take ownership of a partition.
    pub fn add_partition(&mut self, partition: Partition) {
        self.partitions.push(partition);
    }

    /// Consume the node, yielding its partitions in acquisition order.
    pub fn into_partitions(self) -> Vec<Partition> {
        self.partitions
    }

    /// The partition with the greatest record count; earliest-acquired wins
    /// ties. `None` when the node owns no partitions.
    pub fn biggest_partition(&self) -> Option<&Partition> {
        let mut best: Option<&Partition> = None;
        for partition in &self.partitions {
            match best {
                Some(current) if partition.len() <= current.len() => {}
                _ => best = Some(partition),
            }
        }
        best
    }

    /// Deep copy of this node's state, partitions sorted by range start.
    pub fn snapshot(&self) -> NodeSnapshot {
        let mut partitions: Vec<_> = self.partitions.iter().map(|p| p.snapshot()).collect();
        partitions.sort_by_key(|p| p.range.start);
        NodeSnapshot {
            id: self.id,
            partitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_record, IdentityOracle};

    fn node_with_range(id: NodeId, start: u64, end: u64) -> Node {
        Node::with_partitions(id, vec![Partition::new(KeyRange::new(start, end))])
    }

    #[test]
    fn test_insert_routes_to_containing_partition() {
        let mut node = Node::with_partitions(
            0,
            vec![
                Partition::new(KeyRange::new(0, 49)),
                Partition::new(KeyRange::new(50, 99)),
            ],
        );

        let (range, len) = node.insert(numbered_record(75), 75).unwrap();
        assert_eq!(range, KeyRange::new(50, 99));
        assert_eq!(len, 1);
        assert_eq!(node.partition_for(75).unwrap().len(), 1);
        assert!(node.partition_for(25).unwrap().is_empty());
    }

    #[test]
    fn test_insert_honors_inclusive_upper_bound() {
        let mut node = Node::with_partitions(
            0,
            vec![
                Partition::new(KeyRange::new(0, 49)),
                Partition::new(KeyRange::new(50, 99)),
            ],
        );

        let (range, _) = node.insert(numbered_record(49), 49).unwrap();
        assert_eq!(range, KeyRange::new(0, 49));
    }

    #[test]
    fn test_insert_outside_owned_ranges_is_refused() {
        let mut node = node_with_range(0, 0, 49);
        assert!(node.insert(numbered_record(50), 50).is_none());
        assert_eq!(node.record_count(), 0);
    }

    #[test]
    fn test_split_redistributes_by_rederived_key() {
        let oracle = IdentityOracle;
        let mut node = node_with_range(0, 0, 99);
        for key in [10, 49, 50, 90] {
            node.insert(numbered_record(key), key).unwrap();
        }

        let upper = node
            .split_partition(KeyRange::new(0, 99), &oracle, 1000)
            .unwrap();

        let lower = node.partition_for(0).unwrap();
        assert_eq!(lower.range(), KeyRange::new(0, 49));
        assert_eq!(upper.range(), KeyRange::new(50, 99));

        let lower_ids: Vec<_> = lower.records().iter().map(|r| r.id.clone()).collect();
        let upper_ids: Vec<_> = upper.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(lower_ids, vec!["10", "49"]);
        assert_eq!(upper_ids, vec!["50", "90"]);
    }

    #[test]
    fn test_split_unit_range_is_rejected_without_mutation() {
        let oracle = IdentityOracle;
        let mut node = node_with_range(0, 7, 7);
        node.insert(numbered_record(7), 7).unwrap();
        node.insert(numbered_record(7), 7).unwrap();

        let err = node
            .split_partition(KeyRange::new(7, 7), &oracle, 1000)
            .unwrap_err();
        assert_eq!(
            err,
            Error::UnsplittablePartition {
                range: KeyRange::new(7, 7)
            }
        );
        assert_eq!(node.record_count(), 2);
        assert_eq!(node.partitions().len(), 1);
    }

    #[test]
    fn test_biggest_partition_ties_keep_earliest() {
        let mut first = Partition::new(KeyRange::new(0, 49));
        let mut second = Partition::new(KeyRange::new(50, 99));
        first.push(numbered_record(1));
        second.push(numbered_record(60));
        let node = Node::with_partitions(0, vec![first, second]);

        let biggest = node.biggest_partition().unwrap();
        assert_eq!(biggest.range(), KeyRange::new(0, 49));
    }

    #[test]
    fn test_biggest_partition_on_empty_node() {
        let node = Node::new(3);
        assert!(node.biggest_partition().is_none());
    }

    #[test]
    fn test_take_and_add_partition_transfer_ownership() {
        let mut donor = node_with_range(0, 0, 99);
        let mut receiver = Node::new(1);

        let partition = donor.take_partition(KeyRange::new(0, 99)).unwrap();
        receiver.add_partition(partition);

        assert!(donor.partitions().is_empty());
        assert_eq!(receiver.partitions().len(), 1);
        assert!(donor.take_partition(KeyRange::new(0, 99)).is_none());
    }
}
