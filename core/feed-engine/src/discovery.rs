//! Session feeds that never dead-end
//!
//! [`DiscoveryFeed`] pages through all public, discoverable thread roots;
//! [`FollowingFeed`] pages through a followed-creator set via the
//! time-stratified fetcher. Both record everything they fetch in a
//! [`FeedSession`] and, once the store stops yielding never-seen items,
//! switch permanently to serving reshuffled replays of the session history.
//! A transient store failure is served as a short (possibly empty) page and
//! does not trigger the exhausted state.

use crate::config::FeedConfig;
use crate::diversity::diversify_with_window;
use crate::session::FeedSession;
use crate::stratified::{fetch_stratified, RotationCursor};
use content_store::{fields, ContentNode, ContentStore, Query};
use std::sync::Arc;
use tracing::{debug, warn};

/// Infinite-scroll discovery over all discoverable content
pub struct DiscoveryFeed<S> {
    store: Arc<S>,
    config: FeedConfig,
    session: FeedSession,
    page_cursor: Option<String>,
}

impl<S: ContentStore> DiscoveryFeed<S> {
    pub fn new(store: Arc<S>, config: FeedConfig) -> Self {
        Self {
            store,
            config,
            session: FeedSession::new(),
            page_cursor: None,
        }
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    /// Serve the next discovery page
    ///
    /// Non-empty for every call once anything has been fetched this session,
    /// live or replayed.
    pub async fn next_page(&mut self, page_size: usize) -> Vec<ContentNode> {
        if page_size == 0 {
            return Vec::new();
        }
        if !self.session.is_exhausted() {
            let fresh = self.fetch_live(page_size).await;
            if !fresh.is_empty() {
                return diversify_with_window(
                    fresh,
                    self.config.diversity_window,
                    &mut rand::thread_rng(),
                );
            }
            if !self.session.is_exhausted() {
                // Transient failure with nothing gathered; do not replay, the
                // store may still have unseen content
                return Vec::new();
            }
        }
        self.session.replay_page(page_size)
    }

    /// Manual refresh: discard the session and return to live fetching
    pub fn reset(&mut self) {
        self.session.reset();
        self.page_cursor = None;
        debug!("discovery feed reset");
    }

    /// Pull never-seen nodes from the store until the page fills or the
    /// store runs dry
    async fn fetch_live(&mut self, page_size: usize) -> Vec<ContentNode> {
        let mut page = Vec::with_capacity(page_size);
        while page.len() < page_size {
            // Ask for exactly what is still missing; overshooting would step
            // the cursor past nodes this session never recorded
            let need = page_size - page.len();
            let mut query = Query::new()
                .filter_eq_str(fields::VISIBILITY, "public")
                .filter_eq_bool(fields::DISCOVERY_EXCLUDED, false)
                .filter_eq_int(fields::CONVERSATION_DEPTH, 0)
                .order_desc(fields::CREATED_AT)
                .with_limit(need);
            if let Some(cursor) = &self.page_cursor {
                query = query.start_after(cursor);
            }

            let batch = match self.store.query_nodes(&query).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("discovery fetch degraded to {} items: {}", page.len(), e);
                    break;
                }
            };
            if batch.is_empty() {
                // The store is fully paginated for this session
                self.session.mark_exhausted();
                break;
            }
            self.page_cursor = batch.last().map(|n| n.id.clone());
            for node in batch {
                if page.len() >= page_size {
                    break;
                }
                if self.session.record(node.clone()) {
                    page.push(node);
                }
            }
        }
        page
    }
}

/// Personalized feed over a followed-creator set
pub struct FollowingFeed<S> {
    store: Arc<S>,
    config: FeedConfig,
    session: FeedSession,
    followed_creator_ids: Vec<String>,
    rotation: RotationCursor,
}

impl<S: ContentStore> FollowingFeed<S> {
    pub fn new(store: Arc<S>, config: FeedConfig, followed_creator_ids: Vec<String>) -> Self {
        Self {
            store,
            config,
            session: FeedSession::new(),
            followed_creator_ids,
            rotation: RotationCursor::default(),
        }
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    pub fn rotation(&self) -> RotationCursor {
        self.rotation
    }

    /// Serve the next following-feed page: stratified fetch, then diversity
    /// reorder, falling back to replay once the store has nothing new
    pub async fn next_page(&mut self, page_size: usize) -> Vec<ContentNode> {
        if page_size == 0 {
            return Vec::new();
        }
        if !self.session.is_exhausted() {
            let fetched = fetch_stratified(
                self.store.as_ref(),
                &self.config,
                &self.followed_creator_ids,
                page_size,
                self.session.exclude_ids(),
                self.rotation,
            )
            .await;
            self.rotation = fetched.rotation;

            if !fetched.nodes.is_empty() {
                for node in &fetched.nodes {
                    self.session.record(node.clone());
                }
                return diversify_with_window(
                    fetched.nodes,
                    self.config.diversity_window,
                    &mut rand::thread_rng(),
                );
            }
            if !fetched.complete {
                // Empty because the store was unreachable, not drained; the
                // next call retries live fetching
                warn!("following fetch degraded to an empty page");
                return Vec::new();
            }
            self.session.mark_exhausted();
        }
        self.session.replay_page(page_size)
    }

    /// Manual refresh: discard the session and return to live fetching
    pub fn reset(&mut self) {
        self.session.reset();
        self.rotation = RotationCursor::default();
        debug!("following feed reset");
    }
}
