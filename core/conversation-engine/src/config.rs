use serde::{Deserialize, Serialize};

/// Tunables for lane resolution and cap enforcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Messages allowed in one lane before replies are denied
    #[serde(default = "default_message_cap")]
    pub message_cap: usize,
    /// Upper bound on ancestor-walk hops and conversation BFS depth; guards
    /// against malformed reply chains
    #[serde(default = "default_max_walk_depth")]
    pub max_walk_depth: usize,
    /// Concurrent gateway lookups during conversation loading
    #[serde(default = "default_lookup_fanout")]
    pub lookup_fanout: usize,
    /// Seconds a cached lane conversation stays valid
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            message_cap: default_message_cap(),
            max_walk_depth: default_max_walk_depth(),
            lookup_fanout: default_lookup_fanout(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_message_cap() -> usize {
    20
}

fn default_max_walk_depth() -> usize {
    64
}

fn default_lookup_fanout() -> usize {
    5
}

fn default_cache_ttl_secs() -> u64 {
    60
}
