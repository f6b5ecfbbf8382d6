//! Lane resolution and message-cap enforcement
//!
//! [`LaneEngine`] answers two questions for the UI layer:
//! - may this user reply to this node ([`LaneEngine::can_reply`])
//! - what does a lane's conversation look like and how long is it
//!
//! Anchor resolution walks `reply_to_id` pointers upward through the
//! gateway. The walk is bounded and cycle-guarded: a malformed chain in the
//! data denies the reply instead of looping or guessing.
//!
//! Message counting prefers a cached, fully materialized lane conversation
//! (breadth-first load under the anchor, restricted to the two
//! participants). With a cold cache it falls back to counting only direct
//! depth-2 replies to the anchor. The fallback undercounts deep exchanges,
//! which loosens cap enforcement until the conversation is loaded; keep that
//! in mind before changing either path. A count that cannot be obtained at
//! all denies the reply, like every other resolution failure here.

use crate::config::LaneConfig;
use crate::decision::{deny_reason, ReplyDecision};
use crate::error::{LaneError, Result};
use crate::lanes::Lane;
use content_store::{fields, ContentNode, ContentStore, Query};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use timed_cache::TimedCache;
use tracing::{debug, warn};

/// Cache key: anchor plus the normalized participant pair
#[derive(Clone, PartialEq, Eq, Hash)]
struct LaneKey {
    anchor_id: String,
    pair: (String, String),
}

impl LaneKey {
    fn new(anchor_id: &str, participant_a: &str, participant_b: &str) -> Self {
        let pair = if participant_a <= participant_b {
            (participant_a.to_string(), participant_b.to_string())
        } else {
            (participant_b.to_string(), participant_a.to_string())
        };
        Self {
            anchor_id: anchor_id.to_string(),
            pair,
        }
    }
}

/// Reply-permission and lane-conversation service for one session
pub struct LaneEngine<S> {
    store: Arc<S>,
    config: LaneConfig,
    conversations: TimedCache<LaneKey, Vec<ContentNode>>,
}

impl<S: ContentStore> LaneEngine<S> {
    pub fn new(store: Arc<S>, config: LaneConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            store,
            config,
            conversations: TimedCache::new(ttl),
        }
    }

    /// Decide whether `requesting_user_id` may reply to `target`
    ///
    /// Depth 0 and 1 are always open (the reply opens a new child or a new
    /// lane). Depth 2 and deeper requires lane membership, a lane below its
    /// message cap, and a target the requester did not author. Resolution
    /// failures fail closed as denials; this method never errors.
    pub async fn can_reply(&mut self, target: &ContentNode, requesting_user_id: &str) -> ReplyDecision {
        if !target.is_stepchild() {
            return ReplyDecision::allow();
        }

        let Some((anchor, opener)) = self.resolve_lane(target).await else {
            return ReplyDecision::deny(deny_reason::NO_ANCHOR);
        };
        let lane = Lane {
            anchor_id: anchor.id,
            participant_a: anchor.creator_id,
            participant_b: opener.creator_id,
            opened_at: opener.created_at,
        };

        if !lane.has_participant(requesting_user_id) {
            return ReplyDecision::deny(deny_reason::NOT_PARTICIPANT);
        }

        let count = match self
            .count_messages(&lane.anchor_id, &lane.participant_a, &lane.participant_b)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("lane {} cap check failed, denying: {}", lane.anchor_id, e);
                return ReplyDecision::deny(deny_reason::CAP_UNKNOWN);
            }
        };
        if count >= self.config.message_cap {
            return ReplyDecision::deny(deny_reason::at_cap(self.config.message_cap));
        }

        if target.creator_id == requesting_user_id {
            return ReplyDecision::deny(deny_reason::SELF_REPLY);
        }

        ReplyDecision::allow()
    }

    /// The lane a stepchild belongs to, if its chain resolves
    pub async fn lane_of(&self, target: &ContentNode) -> Option<Lane> {
        if !target.is_stepchild() {
            return None;
        }
        let (anchor, opener) = self.resolve_lane(target).await?;
        Some(Lane {
            anchor_id: anchor.id,
            participant_a: anchor.creator_id,
            participant_b: opener.creator_id,
            opened_at: opener.created_at,
        })
    }

    /// Count the messages exchanged in one lane
    ///
    /// Uses the cached materialized conversation when present; otherwise
    /// counts direct depth-2 replies to the anchor filtered to the two
    /// participants. The fallback is a conservative approximation that
    /// undercounts deeper exchanges (see module docs). A store failure
    /// propagates; [`Self::can_reply`] turns it into a denial.
    pub async fn count_messages(
        &mut self,
        anchor_id: &str,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<usize> {
        let key = LaneKey::new(anchor_id, participant_a, participant_b);
        if let Some(conversation) = self.conversations.get(&key) {
            debug!("lane {} count from cached conversation", anchor_id);
            return Ok(conversation.len());
        }

        let query = Query::new()
            .filter_eq_str(fields::REPLY_TO_ID, anchor_id)
            .order_asc(fields::CREATED_AT);
        let replies = self.store.query_nodes(&query).await?;
        Ok(replies
            .iter()
            .filter(|r| r.creator_id == participant_a || r.creator_id == participant_b)
            .count())
    }

    /// Load and cache the full lane conversation
    ///
    /// Breadth-first traversal of the reply graph from the anchor, following
    /// only edges into nodes authored by either participant, with bounded
    /// lookup fan-out and a depth guard. Result is ordered by depth, then
    /// creation time, and excludes the anchor itself.
    pub async fn load_conversation(
        &mut self,
        anchor_id: &str,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<Vec<ContentNode>> {
        let anchor = self.store.get_node(anchor_id).await?;
        if !anchor.is_child() {
            return Err(LaneError::NotAnchor(anchor_id.to_string()));
        }

        let mut collected: Vec<ContentNode> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(anchor.id.clone());
        let mut frontier: Vec<String> = vec![anchor.id];
        let mut level = 0;

        while !frontier.is_empty() && level < self.config.max_walk_depth {
            let store = Arc::clone(&self.store);
            let results: Vec<_> = stream::iter(frontier.drain(..).map(|parent_id| {
                let store = Arc::clone(&store);
                async move {
                    let query = Query::new()
                        .filter_eq_str(fields::REPLY_TO_ID, &parent_id)
                        .order_asc(fields::CREATED_AT);
                    store.query_nodes(&query).await
                }
            }))
            .buffer_unordered(self.config.lookup_fanout)
            .collect()
            .await;

            let mut next = Vec::new();
            for result in results {
                for node in result? {
                    if node.creator_id != participant_a && node.creator_id != participant_b {
                        continue;
                    }
                    if !visited.insert(node.id.clone()) {
                        continue;
                    }
                    next.push(node.id.clone());
                    collected.push(node);
                }
            }
            frontier = next;
            level += 1;
        }

        collected.sort_by(|x, y| {
            x.conversation_depth
                .cmp(&y.conversation_depth)
                .then(x.created_at.cmp(&y.created_at))
        });
        debug!(
            "loaded lane {} conversation: {} messages",
            anchor_id,
            collected.len()
        );
        self.conversations.put(
            LaneKey::new(anchor_id, participant_a, participant_b),
            collected.clone(),
        );
        Ok(collected)
    }

    /// Enumerate the distinct lanes under one child node
    ///
    /// Depth-2 direct replies grouped by responder, creation-time ascending:
    /// the first reply per responder opens that responder's lane, later
    /// replies extend it.
    pub async fn lanes_under(&self, child_id: &str) -> Result<Vec<Lane>> {
        let child = self.store.get_node(child_id).await?;
        if !child.is_child() {
            return Err(LaneError::NotAnchor(child_id.to_string()));
        }

        let query = Query::new()
            .filter_eq_str(fields::REPLY_TO_ID, child_id)
            .order_asc(fields::CREATED_AT);
        let replies = self.store.query_nodes(&query).await?;

        let mut responders: HashSet<String> = HashSet::new();
        let mut lanes = Vec::new();
        for reply in replies {
            if responders.insert(reply.creator_id.clone()) {
                lanes.push(Lane {
                    anchor_id: child.id.clone(),
                    participant_a: child.creator_id.clone(),
                    participant_b: reply.creator_id,
                    opened_at: reply.created_at,
                });
            }
        }
        Ok(lanes)
    }

    /// Invalidate cached conversations after a new reply under `anchor_id`
    pub fn record_reply(&mut self, anchor_id: &str) {
        let dropped = self
            .conversations
            .invalidate_where(|key| key.anchor_id == anchor_id);
        if dropped > 0 {
            debug!("invalidated {} cached conversations under {}", dropped, anchor_id);
        }
    }

    /// Drop every cached conversation (session reset)
    pub fn clear_caches(&mut self) {
        self.conversations.clear();
    }

    /// Walk the reply chain up from a stepchild to its depth-1 anchor
    ///
    /// Returns the anchor and the node directly below it on the path (the
    /// lane opener). The walk is bounded, refuses cycles, and requires depth
    /// to strictly decrease at every hop; any violation or missing ancestor
    /// resolves to None and the caller fails closed.
    async fn resolve_lane(&self, target: &ContentNode) -> Option<(ContentNode, ContentNode)> {
        if !target.is_stepchild() {
            return None;
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(target.id.clone());
        let mut current = target.clone();

        for _ in 0..self.config.max_walk_depth {
            let parent_id = match &current.reply_to_id {
                Some(id) => id.clone(),
                None => {
                    warn!("node {} at depth {} has no parent", current.id, current.conversation_depth);
                    return None;
                }
            };
            if !visited.insert(parent_id.clone()) {
                warn!("reply chain cycle at {}", parent_id);
                return None;
            }
            let parent = match self.store.get_node(&parent_id).await {
                Ok(parent) => parent,
                Err(e) => {
                    warn!("lane anchor walk broke at {}: {}", parent_id, e);
                    return None;
                }
            };
            if parent.conversation_depth >= current.conversation_depth {
                warn!(
                    "depth not decreasing: {} ({}) -> {} ({})",
                    current.id, current.conversation_depth, parent.id, parent.conversation_depth
                );
                return None;
            }
            if parent.is_child() {
                return Some((parent, current));
            }
            if parent.is_thread_root() {
                // Reached the root without passing a depth-1 anchor
                return None;
            }
            current = parent;
        }
        warn!("lane anchor walk exceeded {} hops", self.config.max_walk_depth);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use content_store::{MemoryStore, Visibility};

    fn create_test_node(
        id: &str,
        creator: &str,
        depth: u32,
        reply_to: Option<&str>,
        minutes_ago: i64,
    ) -> ContentNode {
        ContentNode {
            id: id.to_string(),
            creator_id: creator.to_string(),
            created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
            thread_id: "t-root".to_string(),
            reply_to_id: reply_to.map(str::to_string),
            conversation_depth: depth,
            engagement: Default::default(),
            visibility: Visibility::Public,
            discovery_excluded: false,
        }
    }

    /// root(alice) <- child(bob) <- s1(carol) <- s2(bob) <- s3(carol)
    fn lane_fixture() -> (Arc<MemoryStore>, ContentNode) {
        let store = Arc::new(MemoryStore::new());
        store.insert(create_test_node("t-root", "alice", 0, None, 100));
        store.insert(create_test_node("c-1", "bob", 1, Some("t-root"), 90));
        store.insert(create_test_node("s-1", "carol", 2, Some("c-1"), 80));
        store.insert(create_test_node("s-2", "bob", 3, Some("s-1"), 70));
        let s3 = create_test_node("s-3", "carol", 4, Some("s-2"), 60);
        store.insert(s3.clone());
        (store, s3)
    }

    #[tokio::test]
    async fn test_resolve_lane_walks_to_anchor() {
        let (store, s3) = lane_fixture();
        let engine = LaneEngine::new(store, LaneConfig::default());

        let lane = engine.lane_of(&s3).await.unwrap();
        assert_eq!(lane.anchor_id, "c-1");
        assert_eq!(lane.participant_a, "bob");
        assert_eq!(lane.participant_b, "carol");
    }

    #[tokio::test]
    async fn test_resolve_fails_on_missing_ancestor() {
        let (store, s3) = lane_fixture();
        store.remove("s-1");
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        let decision = engine.can_reply(&s3, "bob").await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some(deny_reason::NO_ANCHOR));
    }

    #[tokio::test]
    async fn test_resolve_fails_on_cycle() {
        let store = Arc::new(MemoryStore::new());
        store.insert(create_test_node("a", "alice", 3, Some("b"), 10));
        store.insert(create_test_node("b", "bob", 2, Some("a"), 20));
        let target = create_test_node("c", "carol", 4, Some("a"), 5);
        store.insert(target.clone());
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        // a -> b -> a never reaches depth 1; the depth guard or the visited
        // set stops the walk
        let decision = engine.can_reply(&target, "alice").await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some(deny_reason::NO_ANCHOR));
    }

    #[tokio::test]
    async fn test_resolve_fails_on_transient_store_error() {
        let (store, s3) = lane_fixture();
        store.fail_next_gets(10);
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        let decision = engine.can_reply(&s3, "bob").await;
        assert!(!decision.allowed, "fails closed on store failure");
        assert_eq!(decision.reason.as_deref(), Some(deny_reason::NO_ANCHOR));
    }

    #[tokio::test]
    async fn test_load_conversation_orders_and_filters() {
        let (store, _) = lane_fixture();
        // An outsider reply under the anchor is not part of the lane
        store.insert(create_test_node("outsider", "dave", 2, Some("c-1"), 75));
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        let conversation = engine.load_conversation("c-1", "bob", "carol").await.unwrap();
        let ids: Vec<&str> = conversation.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s-1", "s-2", "s-3"]);
    }

    #[tokio::test]
    async fn test_count_prefers_cached_conversation() {
        let (store, _) = lane_fixture();
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        // Cold cache: only the direct depth-2 reply (s-1) is counted
        assert_eq!(engine.count_messages("c-1", "bob", "carol").await.unwrap(), 1);

        // Materialized: the full exchange is counted
        engine.load_conversation("c-1", "bob", "carol").await.unwrap();
        assert_eq!(engine.count_messages("c-1", "bob", "carol").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cap_check_store_failure_denies() {
        let (store, s3) = lane_fixture();
        // Point lookups succeed so the anchor walk completes; the cap-count
        // query then fails
        store.fail_next_queries(1);
        let mut engine = LaneEngine::new(store, LaneConfig::default());

        let decision = engine.can_reply(&s3, "bob").await;
        assert!(!decision.allowed, "an unverifiable cap fails closed");
        assert_eq!(decision.reason.as_deref(), Some(deny_reason::CAP_UNKNOWN));
    }

    #[tokio::test]
    async fn test_record_reply_invalidates_cache() {
        let (store, _) = lane_fixture();
        let mut engine = LaneEngine::new(store.clone(), LaneConfig::default());
        engine.load_conversation("c-1", "bob", "carol").await.unwrap();
        assert_eq!(engine.count_messages("c-1", "bob", "carol").await.unwrap(), 3);

        store.insert(create_test_node("s-4", "bob", 5, Some("s-3"), 1));
        engine.record_reply("c-1");

        // Back on the fallback until the conversation is reloaded
        assert_eq!(engine.count_messages("c-1", "bob", "carol").await.unwrap(), 1);
        let reloaded = engine.load_conversation("c-1", "bob", "carol").await.unwrap();
        assert_eq!(reloaded.len(), 4);
    }

    #[tokio::test]
    async fn test_lanes_under_groups_by_first_responder() {
        let store = Arc::new(MemoryStore::new());
        store.insert(create_test_node("t-root", "alice", 0, None, 100));
        store.insert(create_test_node("c-1", "bob", 1, Some("t-root"), 90));
        store.insert(create_test_node("r-carol-1", "carol", 2, Some("c-1"), 80));
        store.insert(create_test_node("r-dave", "dave", 2, Some("c-1"), 70));
        store.insert(create_test_node("r-carol-2", "carol", 2, Some("c-1"), 60));
        let engine = LaneEngine::new(store, LaneConfig::default());

        let lanes = engine.lanes_under("c-1").await.unwrap();
        assert_eq!(lanes.len(), 2, "a repeat responder extends their lane");
        assert_eq!(lanes[0].participant_b, "carol");
        assert_eq!(lanes[1].participant_b, "dave");
        assert!(lanes[0].opened_at < lanes[1].opened_at);
    }

    #[tokio::test]
    async fn test_lanes_under_rejects_non_child() {
        let store = Arc::new(MemoryStore::new());
        store.insert(create_test_node("t-root", "alice", 0, None, 100));
        let engine = LaneEngine::new(store, LaneConfig::default());

        assert!(matches!(
            engine.lanes_under("t-root").await,
            Err(LaneError::NotAnchor(_))
        ));
    }
}
