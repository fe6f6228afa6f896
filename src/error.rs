//! Error types for the shard manager.

use crate::types::{KeyRange, NodeId};
use thiserror::Error;

/// Result type alias for shard manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the shard manager.
///
/// All variants are non-fatal: a rejected operation leaves the manager fully
/// usable and, except where noted, unmutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A derived routing key is not covered by any partition range.
    ///
    /// The routing table is supposed to tile the key space exactly, so this
    /// indicates an internal-consistency failure. The triggering operation is
    /// aborted without mutating state.
    #[error("routing miss: key {key} is not covered by any partition range")]
    RoutingMiss { key: u64 },

    /// Refusing to delete the only remaining node.
    #[error("cannot delete node {node_id}: it is the last node in the cluster")]
    LastNode { node_id: NodeId },

    /// The node ID is not in the registry.
    #[error("node not found: {node_id}")]
    UnknownNode { node_id: NodeId },

    /// Split attempted on a partition whose range covers a single key.
    ///
    /// Such a partition is left in place and allowed to exceed the size
    /// threshold; a single key cannot be subdivided further.
    #[error("partition {range} covers a single key and cannot be split")]
    UnsplittablePartition { range: KeyRange },

    /// Invalid construction-time configuration.
    #[error("config error: {0}")]
    Config(String),
}
