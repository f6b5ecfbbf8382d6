use serde::{Deserialize, Serialize};

/// Tunables for feed building
///
/// Defaults match production behavior; tests override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// How many followed creators are queried per call before the rotation
    /// window advances
    #[serde(default = "default_follow_batch_size")]
    pub follow_batch_size: usize,
    /// Raw candidates requested per band = max(quota * multiplier, floor),
    /// leaving room for client-side exclusion filtering
    #[serde(default = "default_raw_candidate_multiplier")]
    pub raw_candidate_multiplier: usize,
    #[serde(default = "default_raw_candidate_floor")]
    pub raw_candidate_floor: usize,
    /// Upper bound on the creator no-repeat window used by diversification
    #[serde(default = "default_diversity_window")]
    pub diversity_window: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            follow_batch_size: default_follow_batch_size(),
            raw_candidate_multiplier: default_raw_candidate_multiplier(),
            raw_candidate_floor: default_raw_candidate_floor(),
            diversity_window: default_diversity_window(),
        }
    }
}

fn default_follow_batch_size() -> usize {
    15
}

fn default_raw_candidate_multiplier() -> usize {
    3
}

fn default_raw_candidate_floor() -> usize {
    30
}

fn default_diversity_window() -> usize {
    5
}
