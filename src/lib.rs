//! In-memory model of a key-range partitioned storage cluster.
//!
//! This crate simulates the partitioning engine of a sharded store inside a
//! single process: records are routed to nodes by a deterministic hash of
//! their identifying field, partitions that grow past a size threshold split
//! in half, and a greedy iteration-bounded rebalancer moves partitions between
//! nodes to limit load skew.
//!
//! # Example
//!
//! ```rust
//! use rangeshard::{Record, Result, ShardConfig, ShardManager};
//!
//! # fn main() -> Result<()> {
//! let config = ShardConfig::new(1000).with_max_partition_size(5);
//! let mut cluster = ShardManager::new(config)?;
//!
//! // Records route by the hash of their identifying field.
//! cluster.insert(Record::new("user:1", b"alice".to_vec()))?;
//! cluster.insert(Record::new("user:2", b"bob".to_vec()))?;
//!
//! // Adding a node rebalances partitions onto it.
//! let node_id = cluster.create_node();
//!
//! let state = cluster.get_state();
//! assert_eq!(state.nodes.len(), 2);
//! assert_eq!(state.record_count(), 2);
//!
//! // Removing a node hands its partitions to the survivors.
//! cluster.delete_node(node_id)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               ShardManager                  │
//! │  • insert / createNode / deleteNode / reset │
//! │  • routing table: range → node (BTreeMap)   │
//! │  • split worklist + greedy rebalancer       │
//! └─────────────────────────────────────────────┘
//!         │                         │
//!         ▼                         ▼
//! ┌───────────────┐        ┌────────────────┐
//! │     Node      │        │  StateObserver │
//! │  partitions,  │        │  snapshot sink │
//! │ local splits  │        └────────────────┘
//! └───────────────┘
//!         │
//!         ▼
//! ┌───────────────┐
//! │   Partition   │
//! │ range+records │
//! └───────────────┘
//! ```
//!
//! # Model
//!
//! - The key space is a fixed integer range `[0, max_key)`; partition ranges
//!   are inclusive, pairwise disjoint, and always tile it exactly.
//! - Partitions are created only by splitting (or at initialization) and are
//!   never destroyed, only reassigned or replaced by their halves.
//! - Everything is single-threaded and synchronous; the embedding driver
//!   serializes calls. After every mutation the manager publishes a deep
//!   state snapshot to the configured [`StateObserver`].
//!
//! This is a conceptual model: there is no persistence, networking,
//! replication, or fault tolerance.

pub mod config;
pub mod error;
pub mod manager;
pub mod node;
pub mod observer;
pub mod oracle;
pub mod partition;
pub mod routing;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use config::ShardConfig;
pub use error::{Error, Result};
pub use manager::ShardManager;
pub use node::Node;
pub use observer::{LoggingObserver, NoopObserver, StateObserver};
pub use oracle::{HashOracle, XxHashOracle};
pub use partition::Partition;
pub use routing::RoutingTable;
pub use types::{
    ClusterSnapshot, KeyRange, NodeId, NodeSnapshot, PartitionSnapshot, Record,
};
