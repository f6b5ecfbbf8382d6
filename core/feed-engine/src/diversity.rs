//! Creator-diversity reordering for feed pages
//!
//! Reorders a flat candidate list so consecutive items rarely share a
//! creator. Grouping is by creator bucket; each bucket is shuffled, then
//! items are drawn one at a time from buckets outside a rolling window of
//! recently emitted creators. The output is always a permutation of the
//! input.

use content_store::ContentNode;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Upper bound on the no-repeat creator window
pub const MAX_CREATOR_WINDOW: usize = 5;

/// Reorder candidates for creator diversity
pub fn diversify(nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    diversify_with_rng(nodes, &mut rand::thread_rng())
}

/// [`diversify`] with an injected RNG, for deterministic tests
pub fn diversify_with_rng<R: Rng>(nodes: Vec<ContentNode>, rng: &mut R) -> Vec<ContentNode> {
    diversify_with_window(nodes, MAX_CREATOR_WINDOW, rng)
}

/// [`diversify`] with an explicit window cap
///
/// The effective window is `min(window_cap, creator_count - 1)`, never less
/// than 1, so a pool with few distinct creators still makes progress. A
/// single-creator input is returned unchanged.
pub fn diversify_with_window<R: Rng>(
    nodes: Vec<ContentNode>,
    window_cap: usize,
    rng: &mut R,
) -> Vec<ContentNode> {
    let total = nodes.len();

    // Buckets keyed by creator, first-seen order
    let mut buckets: Vec<(String, Vec<ContentNode>)> = Vec::new();
    for node in nodes {
        match buckets.iter_mut().find(|(c, _)| *c == node.creator_id) {
            Some((_, bucket)) => bucket.push(node),
            None => buckets.push((node.creator_id.clone(), vec![node])),
        }
    }

    // Nothing to interleave with fewer than two creators
    if buckets.len() <= 1 {
        return buckets.into_iter().flat_map(|(_, b)| b).collect();
    }

    let window_size = window_cap.min(buckets.len() - 1).max(1);

    for (_, bucket) in buckets.iter_mut() {
        bucket.shuffle(rng);
    }

    let mut window: VecDeque<String> = VecDeque::with_capacity(window_size + 1);
    let mut out = Vec::with_capacity(total);

    while !buckets.is_empty() {
        let eligible: Vec<usize> = (0..buckets.len())
            .filter(|&i| !window.contains(&buckets[i].0))
            .collect();

        // Fall back to any non-empty bucket when the window excludes them all
        let idx = if eligible.is_empty() {
            rng.gen_range(0..buckets.len())
        } else {
            eligible[rng.gen_range(0..eligible.len())]
        };

        let creator = buckets[idx].0.clone();
        if let Some(node) = buckets[idx].1.pop() {
            out.push(node);
        }
        if buckets[idx].1.is_empty() {
            buckets.remove(idx);
        }

        window.push_back(creator);
        if window.len() > window_size {
            window.pop_front();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use content_store::Visibility;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn create_test_node(id: &str, creator: &str) -> ContentNode {
        ContentNode {
            id: id.to_string(),
            creator_id: creator.to_string(),
            created_at: Utc::now(),
            thread_id: id.to_string(),
            reply_to_id: None,
            conversation_depth: 0,
            engagement: Default::default(),
            visibility: Visibility::Public,
            discovery_excluded: false,
        }
    }

    fn pool(creators: &[(&str, usize)]) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        for (creator, count) in creators {
            for i in 0..*count {
                nodes.push(create_test_node(&format!("{}-{}", creator, i), creator));
            }
        }
        nodes
    }

    fn id_multiset(nodes: &[ContentNode]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for node in nodes {
            *counts.entry(node.id.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_multiset_preserved() {
        for seed in 0..20u64 {
            let input = pool(&[("a", 7), ("b", 3), ("c", 1), ("d", 12)]);
            let expected = id_multiset(&input);
            let mut rng = StdRng::seed_from_u64(seed);
            let output = diversify_with_rng(input, &mut rng);
            assert_eq!(id_multiset(&output), expected);
        }
    }

    #[test]
    fn test_single_creator_unchanged() {
        let input = pool(&[("solo", 5)]);
        let input_ids: Vec<String> = input.iter().map(|n| n.id.clone()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let output = diversify_with_rng(input, &mut rng);
        let output_ids: Vec<String> = output.iter().map(|n| n.id.clone()).collect();
        assert_eq!(output_ids, input_ids);
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(diversify_with_rng(Vec::new(), &mut rng).is_empty());
    }

    #[test]
    fn test_two_balanced_creators_alternate() {
        // With two creators the window is 1 and equal bucket sizes force
        // strict alternation, whatever the seed.
        for seed in 0..20u64 {
            let input = pool(&[("a", 6), ("b", 6)]);
            let mut rng = StdRng::seed_from_u64(seed);
            let output = diversify_with_rng(input, &mut rng);
            for pair in output.windows(2) {
                assert_ne!(
                    pair[0].creator_id, pair[1].creator_id,
                    "seed {}: adjacent items share a creator",
                    seed
                );
            }
        }
    }

    #[test]
    fn test_window_property_balanced_six_creators() {
        // Six equal buckets against a window of five force a round-robin, so
        // no creator may reappear within five positions for any seed.
        for seed in 0..20u64 {
            let input = pool(&[("a", 4), ("b", 4), ("c", 4), ("d", 4), ("e", 4), ("f", 4)]);
            let mut rng = StdRng::seed_from_u64(seed);
            let output = diversify_with_rng(input, &mut rng);

            for (i, node) in output.iter().enumerate() {
                let window_start = i.saturating_sub(MAX_CREATOR_WINDOW);
                for earlier in &output[window_start..i] {
                    assert_ne!(
                        earlier.creator_id, node.creator_id,
                        "seed {}: creator {} repeats within window at position {}",
                        seed, node.creator_id, i
                    );
                }
            }
        }
    }

    #[test]
    fn test_distinct_creators_one_item_each() {
        let input = pool(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let mut rng = StdRng::seed_from_u64(3);
        let output = diversify_with_rng(input, &mut rng);
        assert_eq!(output.len(), 4);
        let creators: std::collections::HashSet<String> =
            output.iter().map(|n| n.creator_id.clone()).collect();
        assert_eq!(creators.len(), 4);
    }
}
