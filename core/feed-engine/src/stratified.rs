//! Time-stratified fetching for the following feed
//!
//! A feed page is sampled across four non-overlapping recency bands so a
//! session is not dominated by only the newest posts. Each band gets a fixed
//! share of the page (floored) and one bounded query per creator chunk; a
//! failed band degrades to fewer results rather than failing the page.
//!
//! Large follow sets are sampled through a rotating window so every followed
//! creator is eventually queried. The rotation cursor is an explicit value
//! passed in and returned, never hidden mutable state.

use crate::config::FeedConfig;
use chrono::{DateTime, Duration, Utc};
use content_store::{chunk_for_in, fields, ContentNode, ContentStore, Query, RangeOp};
use futures::future;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One recency band with its share of the page
#[derive(Debug, Clone, Copy)]
pub struct AgeBand {
    pub min_days: i64,
    pub max_days: i64,
    pub share: f64,
}

/// The four bands: recent 40%, medium 30%, older 20%, deep-cut 10%
pub const AGE_BANDS: [AgeBand; 4] = [
    AgeBand {
        min_days: 0,
        max_days: 7,
        share: 0.40,
    },
    AgeBand {
        min_days: 7,
        max_days: 30,
        share: 0.30,
    },
    AgeBand {
        min_days: 30,
        max_days: 90,
        share: 0.20,
    },
    AgeBand {
        min_days: 90,
        max_days: 365,
        share: 0.10,
    },
];

/// Explicit rotation cursor over a followed-creator list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationCursor(pub usize);

impl RotationCursor {
    /// Select this call's creator window and the advanced cursor
    ///
    /// Follow sets within the batch size are returned whole with the cursor
    /// untouched. Larger sets get a wrapping window of `batch` creators
    /// starting at the cursor offset; the cursor advances by `batch` so
    /// successive calls walk the whole set.
    pub fn window(&self, creators: &[String], batch: usize) -> (Vec<String>, RotationCursor) {
        if creators.len() <= batch || batch == 0 {
            return (creators.to_vec(), *self);
        }
        let start = self.0 % creators.len();
        let selected = (0..batch)
            .map(|i| creators[(start + i) % creators.len()].clone())
            .collect();
        (selected, RotationCursor(self.0 + batch))
    }
}

/// Result of one stratified fetch
#[derive(Debug)]
pub struct StratifiedPage {
    pub nodes: Vec<ContentNode>,
    /// Rotation cursor advanced past this call's creator window
    pub rotation: RotationCursor,
    /// False when at least one band query failed. An empty incomplete page
    /// means the store was unreachable, not drained; callers must not treat
    /// it as exhaustion.
    pub complete: bool,
}

/// Build one following-feed page sampled across the age bands
///
/// Returns the gathered nodes (possibly short when bands are sparse or
/// degraded) and the advanced rotation cursor. Band queries run
/// concurrently; exclusion and per-band quotas are applied at merge time so
/// duplicates never survive within one page.
pub async fn fetch_stratified<S: ContentStore + ?Sized>(
    store: &S,
    config: &FeedConfig,
    followed_creator_ids: &[String],
    page_size: usize,
    exclude_ids: &HashSet<String>,
    rotation: RotationCursor,
) -> StratifiedPage {
    if followed_creator_ids.is_empty() || page_size == 0 {
        // No queries to make: an empty result here is definitive
        return StratifiedPage {
            nodes: Vec::new(),
            rotation,
            complete: true,
        };
    }

    let (window, next_rotation) = rotation.window(followed_creator_ids, config.follow_batch_size);
    let now = Utc::now();
    let quotas: Vec<usize> = AGE_BANDS
        .iter()
        .map(|band| (page_size as f64 * band.share) as usize)
        .collect();

    let band_results = future::join_all(
        AGE_BANDS
            .iter()
            .zip(&quotas)
            .map(|(band, &quota)| fetch_band(store, config, &window, band, quota, now)),
    )
    .await;

    let mut page: Vec<ContentNode> = Vec::with_capacity(page_size);
    let mut taken: HashSet<String> = HashSet::new();
    let mut complete = true;
    for ((candidates, band_complete), &quota) in band_results.into_iter().zip(&quotas) {
        complete &= band_complete;
        let mut filled = 0;
        for node in candidates {
            if filled >= quota {
                break;
            }
            if exclude_ids.contains(&node.id) || !taken.insert(node.id.clone()) {
                continue;
            }
            page.push(node);
            filled += 1;
        }
    }

    debug!(
        "stratified fetch gathered {} of {} requested items (complete: {})",
        page.len(),
        page_size,
        complete
    );
    StratifiedPage {
        nodes: page,
        rotation: next_rotation,
        complete,
    }
}

/// Fetch raw candidates for one band, tolerating partial failure
///
/// The second element is false when a chunk query failed and the band's
/// candidates are incomplete.
async fn fetch_band<S: ContentStore + ?Sized>(
    store: &S,
    config: &FeedConfig,
    window: &[String],
    band: &AgeBand,
    quota: usize,
    now: DateTime<Utc>,
) -> (Vec<ContentNode>, bool) {
    let mut candidates = Vec::new();
    if quota == 0 {
        return (candidates, true);
    }

    let raw_limit = (quota * config.raw_candidate_multiplier).max(config.raw_candidate_floor);
    let newest = now - Duration::days(band.min_days);
    let oldest = now - Duration::days(band.max_days);

    for chunk in chunk_for_in(window) {
        let query = Query::new()
            .filter_in(fields::CREATOR_ID, chunk)
            .filter_eq_int(fields::CONVERSATION_DEPTH, 0)
            .filter_range_time(fields::CREATED_AT, RangeOp::Ge, oldest)
            .filter_range_time(fields::CREATED_AT, RangeOp::Lt, newest)
            .order_desc(fields::CREATED_AT)
            .with_limit(raw_limit);

        match store.query_nodes(&query).await {
            Ok(nodes) => candidates.extend(nodes),
            Err(e) => {
                warn!(
                    "band {}-{}d query failed, keeping {} gathered so far: {}",
                    band.min_days,
                    band.max_days,
                    candidates.len(),
                    e
                );
                return (candidates, false);
            }
        }
    }
    (candidates, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_store::{MemoryStore, Visibility};

    fn create_test_node(id: &str, creator: &str, age_days: i64) -> ContentNode {
        ContentNode {
            id: id.to_string(),
            creator_id: creator.to_string(),
            created_at: Utc::now() - Duration::days(age_days) - Duration::hours(1),
            thread_id: id.to_string(),
            reply_to_id: None,
            conversation_depth: 0,
            engagement: Default::default(),
            visibility: Visibility::Public,
            discovery_excluded: false,
        }
    }

    fn creators(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("creator-{:02}", i)).collect()
    }

    fn stock_store(store: &MemoryStore, creator: &str) {
        // Ten posts in every band for one creator, ages spread inside each
        // band's range
        let bands: [(usize, i64, i64); 4] = [(0, 1, 0), (1, 8, 2), (2, 31, 5), (3, 91, 20)];
        for (band, base_age, step) in bands {
            for i in 0..10i64 {
                store.insert(create_test_node(
                    &format!("{}-b{}-{}", creator, band, i),
                    creator,
                    base_age + i * step,
                ));
            }
        }
    }

    #[test]
    fn test_rotation_window_small_set_untouched() {
        let ids = creators(10);
        let cursor = RotationCursor::default();
        let (window, next) = cursor.window(&ids, 15);
        assert_eq!(window, ids);
        assert_eq!(next, cursor);
    }

    #[test]
    fn test_rotation_window_wraps_and_advances() {
        let ids = creators(20);
        let (first, cursor) = RotationCursor::default().window(&ids, 15);
        assert_eq!(first.len(), 15);
        assert_eq!(first[0], "creator-00");
        assert_eq!(cursor, RotationCursor(15));

        let (second, cursor) = cursor.window(&ids, 15);
        assert_eq!(second[0], "creator-15");
        // Wraps past the end back to the start
        assert_eq!(second[5], "creator-00");
        assert_eq!(cursor, RotationCursor(30));
    }

    #[test]
    fn test_rotation_covers_every_creator() {
        let ids = creators(37);
        let mut cursor = RotationCursor::default();
        let mut sampled: HashSet<String> = HashSet::new();
        for _ in 0..10 {
            let (window, next) = cursor.window(&ids, 15);
            sampled.extend(window);
            cursor = next;
        }
        assert_eq!(sampled.len(), 37);
    }

    #[tokio::test]
    async fn test_band_quota_split() {
        let store = MemoryStore::new();
        for c in creators(3) {
            stock_store(&store, &c);
        }

        let fetched = fetch_stratified(
            &store,
            &FeedConfig::default(),
            &creators(3),
            40,
            &HashSet::new(),
            RotationCursor::default(),
        )
        .await;
        assert!(fetched.complete);
        let page = fetched.nodes;

        // Every band is well stocked (30 candidates each), so the quotas for
        // a 40-item page land exactly on the 40/30/20/10 split.
        assert_eq!(page.len(), 40);

        let now = Utc::now();
        let in_band = |node: &ContentNode, min: i64, max: i64| {
            let age = now - node.created_at;
            age >= Duration::days(min) && age < Duration::days(max)
        };
        let recent = page.iter().filter(|n| in_band(n, 0, 7)).count();
        let medium = page.iter().filter(|n| in_band(n, 7, 30)).count();
        let older = page.iter().filter(|n| in_band(n, 30, 90)).count();
        let deep = page.iter().filter(|n| in_band(n, 90, 365)).count();
        assert_eq!((recent, medium, older, deep), (16, 12, 8, 4));
    }

    #[tokio::test]
    async fn test_excluded_and_duplicate_ids_skipped() {
        let store = MemoryStore::new();
        stock_store(&store, "creator-00");

        let mut exclude = HashSet::new();
        exclude.insert("creator-00-b0-0".to_string());

        let page = fetch_stratified(
            &store,
            &FeedConfig::default(),
            &creators(1),
            40,
            &exclude,
            RotationCursor::default(),
        )
        .await
        .nodes;

        assert!(page.iter().all(|n| n.id != "creator-00-b0-0"));
        let distinct: HashSet<&String> = page.iter().map(|n| &n.id).collect();
        assert_eq!(distinct.len(), page.len(), "no within-page duplicates");
    }

    #[tokio::test]
    async fn test_band_failure_degrades_not_fatal() {
        let store = MemoryStore::new();
        stock_store(&store, "creator-00");
        // First band query fails; the other three still contribute
        store.fail_next_queries(1);

        let fetched = fetch_stratified(
            &store,
            &FeedConfig::default(),
            &creators(1),
            40,
            &HashSet::new(),
            RotationCursor::default(),
        )
        .await;
        assert!(!fetched.complete, "a failed band marks the page incomplete");
        let page = fetched.nodes;

        assert!(!page.is_empty(), "one failed band must not empty the page");
        // The recent band lost its query; the other three still fill their
        // quotas (10 of 12 medium, 8 older, 4 deep)
        let now = Utc::now();
        let recent = page
            .iter()
            .filter(|n| now - n.created_at < Duration::days(7))
            .count();
        assert_eq!(recent, 0);
        assert_eq!(page.len(), 22);
    }

    #[tokio::test]
    async fn test_empty_follow_set() {
        let store = MemoryStore::new();
        let fetched = fetch_stratified(
            &store,
            &FeedConfig::default(),
            &[],
            40,
            &HashSet::new(),
            RotationCursor(3),
        )
        .await;
        assert!(fetched.nodes.is_empty());
        assert!(fetched.complete, "no queries made means a definitive answer");
        assert_eq!(fetched.rotation, RotationCursor(3));
    }

    #[tokio::test]
    async fn test_all_bands_failing_is_incomplete() {
        let store = MemoryStore::new();
        stock_store(&store, "creator-00");
        store.fail_next_queries(4);

        let fetched = fetch_stratified(
            &store,
            &FeedConfig::default(),
            &creators(1),
            40,
            &HashSet::new(),
            RotationCursor::default(),
        )
        .await;
        assert!(fetched.nodes.is_empty());
        assert!(!fetched.complete, "an outage must not look like a drained store");
    }
}
