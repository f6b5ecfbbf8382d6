//! Typed content model and the document decode boundary
//!
//! Remote documents are loosely-typed JSON maps. Every field read goes
//! through [`ContentNode::from_document`], the single place that knows the
//! default for each missing field:
//! - engagement counters default to 0
//! - `conversationDepth` defaults to 0 (thread root)
//! - `visibility` defaults to public, `discoveryExcluded` to false
//! - a missing `threadId` means the node is its own thread root
//! - `id`, `creatorId` and `createdAt` are required; their absence is a
//!   decode error, not a default

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visibility of a content node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Engagement counters attached to a content node
///
/// Mutated by the engagement-recording subsystem upstream; read-only here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub approvals: u64,
    #[serde(default)]
    pub disapprovals: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub shares: u64,
}

/// A unit of content: a video post or a reply in a conversation tree
///
/// `conversation_depth` 0 is a thread root, 1 a child (direct reply to a
/// root), 2 and deeper a stepchild restricted to its lane. A node's depth is
/// always its parent's depth plus one; `thread_id` always points at the
/// depth-0 root of its tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: String,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub thread_id: String,
    #[serde(default)]
    pub reply_to_id: Option<String>,
    #[serde(default)]
    pub conversation_depth: u32,
    #[serde(default)]
    pub engagement: EngagementCounts,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default)]
    pub discovery_excluded: bool,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

impl ContentNode {
    /// Decode a raw store document into a typed node
    ///
    /// `id` is the document id (stored outside the document body, as the
    /// remote collection does). Defaults for missing fields are documented
    /// on the module.
    pub fn from_document(id: &str, doc: &Value) -> Result<Self, StoreError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| StoreError::Decode(format!("document {} is not an object", id)))?;

        let creator_id = obj
            .get("creatorId")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode(format!("document {} missing creatorId", id)))?
            .to_string();

        let created_at = obj
            .get("createdAt")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode(format!("document {} missing createdAt", id)))
            .and_then(|raw| {
                raw.parse::<DateTime<Utc>>().map_err(|e| {
                    StoreError::Decode(format!("document {} bad createdAt: {}", id, e))
                })
            })?;

        let thread_id = obj
            .get("threadId")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();

        let reply_to_id = obj
            .get("replyToId")
            .and_then(Value::as_str)
            .map(str::to_string);

        let conversation_depth = obj
            .get("conversationDepth")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        let engagement = EngagementCounts {
            views: counter(obj, "viewCount"),
            approvals: counter(obj, "approveCount"),
            disapprovals: counter(obj, "disapproveCount"),
            replies: counter(obj, "replyCount"),
            shares: counter(obj, "shareCount"),
        };

        let visibility = match obj.get("visibility").and_then(Value::as_str) {
            Some("private") => Visibility::Private,
            _ => Visibility::Public,
        };

        let discovery_excluded = obj
            .get("discoveryExcluded")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(ContentNode {
            id: id.to_string(),
            creator_id,
            created_at,
            thread_id,
            reply_to_id,
            conversation_depth,
            engagement,
            visibility,
            discovery_excluded,
        })
    }

    /// Whether the node is a thread root (depth 0)
    pub fn is_thread_root(&self) -> bool {
        self.conversation_depth == 0
    }

    /// Whether the node is a child (depth 1), the anchor level for lanes
    pub fn is_child(&self) -> bool {
        self.conversation_depth == 1
    }

    /// Whether the node is a stepchild (depth 2 or deeper)
    pub fn is_stepchild(&self) -> bool {
        self.conversation_depth >= 2
    }
}

fn counter(obj: &serde_json::Map<String, Value>, field: &str) -> u64 {
    obj.get(field).and_then(Value::as_u64).unwrap_or(0)
}
