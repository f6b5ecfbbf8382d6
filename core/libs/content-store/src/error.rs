use thiserror::Error;

/// Result type for content store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure modes surfaced by the content store gateway
///
/// `Unavailable` is transient and safe to retry; callers in the client core
/// degrade to "fewer results" instead of retrying inline. `QueryRejected`
/// means the query shape itself is unsupported (oversized `in` filter,
/// missing index) and retrying the same query will never succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists for the requested id
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store refused the query shape
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Transient I/O failure talking to the store
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be decoded into a typed model
    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether the failure is transient and a later identical call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
