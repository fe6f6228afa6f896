//! A partition: one contiguous key range plus the records routed to it.

use crate::types::{KeyRange, PartitionSnapshot, Record};

/// A contiguous inclusive key range and the ordered records assigned to it.
///
/// Partitions know nothing about nodes or sibling partitions; placement and
/// split decisions are made above them.
#[derive(Debug, Clone)]
pub struct Partition {
    range: KeyRange,
    records: Vec<Record>,
}

impl Partition {
    /// Create an empty partition covering `range`.
    pub fn new(range: KeyRange) -> Self {
        Self {
            range,
            records: Vec::new(),
        }
    }

    /// Create a partition pre-populated with records.
    pub fn with_records(range: KeyRange, records: Vec<Record>) -> Self {
        Self { range, records }
    }

    /// The key range this partition owns.
    pub fn range(&self) -> KeyRange {
        self.range
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the partition holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// The records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consume the partition, yielding its records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Deep copy of this partition's state.
    pub fn snapshot(&self) -> PartitionSnapshot {
        PartitionSnapshot {
            range: self.range,
            records: self.records.clone(),
        }
    }
}
