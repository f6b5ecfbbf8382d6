//! Structured reply-permission outcomes
//!
//! Every permission check produces a decision with a human-readable reason
//! on denial. Cap hits and broken reply chains are normal outcomes here, not
//! errors; the UI renders the reason directly.

use serde::Serialize;

/// Denial reason strings surfaced to the UI layer
pub mod deny_reason {
    /// The reply chain above a stepchild could not be walked to a depth-1
    /// anchor (missing ancestor, cycle, or malformed depths)
    pub const NO_ANCHOR: &str = "could not find lane anchor";
    /// The requester is not one of the two lane participants
    pub const NOT_PARTICIPANT: &str = "not a lane participant; start a spin-off";
    /// Replying to one's own message is never allowed
    pub const SELF_REPLY: &str = "cannot reply to your own message";
    /// The lane's message count could not be verified against the store
    pub const CAP_UNKNOWN: &str = "could not verify lane capacity; try again";

    /// The lane has reached its message cap
    pub fn at_cap(cap: usize) -> String {
        format!("lane at message cap of {}; start a spin-off", cap)
    }
}

/// Outcome of a reply permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyDecision {
    pub allowed: bool,
    /// Present exactly when `allowed` is false
    pub reason: Option<String>,
}

impl ReplyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}
