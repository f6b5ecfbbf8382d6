//! Per-session feed state
//!
//! A [`FeedSession`] remembers every node surfaced to one user session and
//! drives the exhaustion replay: once the store has nothing new, pages are
//! served from a reshuffled replay of the accumulated history instead of
//! returning empty. Exhaustion is sticky for the life of the session; only
//! [`FeedSession::reset`] (a manual refresh) returns to live fetching.

use crate::diversity::diversify;
use content_store::ContentNode;
use std::collections::HashSet;
use tracing::debug;

/// Ephemeral feed pagination state for one user session
#[derive(Default)]
pub struct FeedSession {
    seen_ids: HashSet<String>,
    all_fetched: Vec<ContentNode>,
    exhausted: bool,
    replay_order: Vec<ContentNode>,
    replay_cursor: usize,
}

impl FeedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this node id has been fetched this session
    pub fn is_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// Ids to exclude from store queries this session
    pub fn exclude_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }

    /// Record a fetched node; returns false for a duplicate
    ///
    /// Keeps the invariant that `seen_ids` is exactly the id set of the
    /// accumulated history.
    pub fn record(&mut self, node: ContentNode) -> bool {
        if !self.seen_ids.insert(node.id.clone()) {
            return false;
        }
        self.all_fetched.push(node);
        true
    }

    /// Number of nodes accumulated this session
    pub fn seen_count(&self) -> usize {
        self.all_fetched.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Enter the sticky exhausted state
    pub fn mark_exhausted(&mut self) {
        if !self.exhausted {
            debug!(
                "feed session exhausted after {} items, switching to replay",
                self.all_fetched.len()
            );
        }
        self.exhausted = true;
    }

    /// Serve a page from the reshuffled replay of the session history
    ///
    /// Reshuffles on the first call after exhaustion and again every time the
    /// cursor wraps, so one full replay loop covers every accumulated item
    /// exactly once. Returns an empty page only if nothing was ever fetched.
    pub fn replay_page(&mut self, page_size: usize) -> Vec<ContentNode> {
        if self.all_fetched.is_empty() || page_size == 0 {
            return Vec::new();
        }
        if self.replay_order.is_empty() || self.replay_cursor >= self.replay_order.len() {
            self.replay_order = diversify(self.all_fetched.clone());
            self.replay_cursor = 0;
            debug!("reshuffled replay of {} items", self.replay_order.len());
        }
        let end = (self.replay_cursor + page_size).min(self.replay_order.len());
        let page = self.replay_order[self.replay_cursor..end].to_vec();
        self.replay_cursor = end;
        page
    }

    /// Discard all session state, returning to live fetching
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
