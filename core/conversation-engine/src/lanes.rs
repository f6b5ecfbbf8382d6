//! Lane identity
//!
//! A lane is the private two-party reply channel under one depth-1 child:
//! the child's creator on one side, one specific responder on the other.
//! Lanes are derived from the node graph on demand and never persisted; the
//! message count is computed separately by the engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A two-party conversation lane anchored at a depth-1 child node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lane {
    /// Id of the depth-1 anchor node
    pub anchor_id: String,
    /// Creator of the anchor
    pub participant_a: String,
    /// The responder who opened this lane
    pub participant_b: String,
    /// Creation time of the responder's first depth-2 reply
    pub opened_at: DateTime<Utc>,
}

impl Lane {
    /// Identity key: anchor plus the unordered participant pair
    ///
    /// Two different responders under the same anchor are two different
    /// lanes; the pair ordering is normalized so either participant can be
    /// named first.
    pub fn key(&self) -> (String, String, String) {
        let (first, second) = if self.participant_a <= self.participant_b {
            (self.participant_a.clone(), self.participant_b.clone())
        } else {
            (self.participant_b.clone(), self.participant_a.clone())
        };
        (self.anchor_id.clone(), first, second)
    }

    /// Whether a user is one of the two lane participants
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }
}
