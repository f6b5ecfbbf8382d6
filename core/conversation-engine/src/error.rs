use content_store::StoreError;
use thiserror::Error;

/// Result type for conversation-engine operations
pub type Result<T> = std::result::Result<T, LaneError>;

/// Conversation engine error types
///
/// Only structural operations (lane enumeration, conversation loading)
/// return these; reply permission checks always produce a
/// [`crate::ReplyDecision`] instead.
#[derive(Debug, Error)]
pub enum LaneError {
    /// The content store rejected or failed a request
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The referenced node is not a depth-1 child and cannot anchor lanes
    #[error("node {0} is not a lane anchor")]
    NotAnchor(String),
}
