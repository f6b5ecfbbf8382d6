//! Content store gateway for the Hypeline client core
//!
//! Abstracts the remote document collection holding content nodes (videos and
//! their replies). The rest of the client core only sees:
//! - a typed [`ContentNode`] model decoded at a single boundary
//! - a [`Query`] description (equality / `in` / range filters, ordering,
//!   limit, start-after cursor)
//! - the [`ContentStore`] trait with point lookup and query execution
//!
//! [`MemoryStore`] is a full in-process implementation of the trait used by
//! tests and local development.

mod error;
mod memory;
mod model;
mod query;

pub mod gateway;

pub use error::{StoreError, StoreResult};
pub use gateway::ContentStore;
pub use memory::MemoryStore;
pub use model::{ContentNode, EngagementCounts, Visibility};
pub use query::{
    chunk_for_in, Direction, FieldValue, Filter, Order, Query, RangeOp, IN_FILTER_LIMIT,
};

/// Document field names used by queries against the store.
///
/// The remote collection stores camelCase field names; every query and the
/// decode boundary agree on these constants.
pub mod fields {
    pub const CREATOR_ID: &str = "creatorId";
    pub const CREATED_AT: &str = "createdAt";
    pub const THREAD_ID: &str = "threadId";
    pub const REPLY_TO_ID: &str = "replyToId";
    pub const CONVERSATION_DEPTH: &str = "conversationDepth";
    pub const VISIBILITY: &str = "visibility";
    pub const DISCOVERY_EXCLUDED: &str = "discoveryExcluded";
}
