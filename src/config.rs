//! Runtime configuration, read once from the environment at startup.

/// Knobs for the armory pipeline. Every field has a working default so the
/// binary runs with no environment at all.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the armory API, no trailing slash.
    pub base_url: String,
    /// Per-request timeout for upstream calls.
    pub request_timeout_secs: u64,
    /// Freshness window for cached responses and snapshots.
    pub cache_ttl_secs: u64,
    /// Percent at which an in-progress collection counts as near completion.
    pub near_completion_threshold: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ASC_API_BASE_URL")
                .unwrap_or_else(|_| "https://asc-api-admin.atkz.dev".to_string()),
            request_timeout_secs: env_u64("ARMORY_TIMEOUT_SECS", 8),
            cache_ttl_secs: env_u64("ARMORY_CACHE_TTL_SECS", 300),
            near_completion_threshold: std::env::var("NEAR_COMPLETION_PCT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::snapshot::NEAR_COMPLETION_THRESHOLD),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
