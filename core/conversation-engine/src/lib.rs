//! Conversation-lane engine for the Hypeline client core
//!
//! Implements the three-tier reply visibility model over a reply tree:
//! thread roots (depth 0) and children (depth 1) are open to everyone;
//! stepchildren (depth 2 and deeper) belong to a two-party lane anchored at
//! their depth-1 ancestor, and only the two lane participants may keep
//! replying, up to a fixed message cap.
//!
//! Permission outcomes are decisions with human-readable reasons, never
//! errors; a broken reply chain fails closed as a denial.

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod lanes;

pub use config::LaneConfig;
pub use decision::{deny_reason, ReplyDecision};
pub use engine::LaneEngine;
pub use error::{LaneError, Result};
pub use lanes::Lane;
