//! The gateway trait the client core speaks to the remote collection through

use crate::error::StoreResult;
use crate::model::ContentNode;
use crate::query::Query;
use async_trait::async_trait;

/// Read access to the remote content collection
///
/// Implementations must honor every clause of [`Query`] or reject the query
/// as a whole with `StoreError::QueryRejected`; silently ignoring a filter
/// would corrupt feed and lane decisions built on top.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Point lookup by document id
    async fn get_node(&self, id: &str) -> StoreResult<ContentNode>;

    /// Execute a query and return decoded nodes in query order
    async fn query_nodes(&self, query: &Query) -> StoreResult<Vec<ContentNode>>;
}
