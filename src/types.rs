/*!
 * Allocator Types
 * Errors and statistics snapshots shared by the arena and the pool
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allocator operation result
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocator errors
///
/// Failures never retry; the caller observes the error and decides policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("zero-sized request")]
    ZeroSize,

    #[error("block size {requested} is below the {min}-byte header word")]
    BlockTooSmall { requested: usize, min: usize },

    #[error("node cap reached: {nodes} of {max_nodes} nodes in use")]
    CapacityExceeded { nodes: usize, max_nodes: usize },

    #[error("backing store exhausted: failed to reserve {requested} bytes")]
    BackingExhausted { requested: usize },

    #[error("request for {requested} bytes exceeds the {node_capacity}-byte node capacity")]
    RequestTooLarge { requested: usize, node_capacity: usize },

    #[error("pointer 0x{0:x} does not belong to this allocator")]
    ForeignPointer(usize),

    #[error("header at 0x{0:x} reads zero: double free or never allocated")]
    ZeroHeader(usize),

    #[error("shrinking realloc from {old} to {new} bytes is not supported")]
    ShrinkNotSupported { old: usize, new: usize },

    #[error("free-region descriptor arena exhausted")]
    MetadataExhausted,
}

/// Arena statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    /// Buffer length of one node in bytes
    pub node_size: usize,
    /// Bytes bumped on the head node, headers included
    pub used: usize,
    /// Nodes currently chained
    pub nodes: usize,
    /// Node cap
    pub max_nodes: usize,
}

/// Pool statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Block payload bytes of one node
    pub node_size: usize,
    /// Block length in bytes
    pub block_size: usize,
    /// Live bytes across all nodes, counted block-wise
    pub used: usize,
    /// Nodes currently chained
    pub nodes: usize,
    /// Node cap
    pub max_nodes: usize,
}
