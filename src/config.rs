use serde::Deserialize;
use std::time::Duration;

use crate::services::retry::RetryPolicy;

/// How an approximate cache lookup decides that a stored recipe matches a query
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrictness {
    /// At least one query ingredient appears in the recipe's ingredient names
    #[default]
    Any,
    /// Every query ingredient appears in the recipe's ingredient names
    All,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Without it recipes live in process memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL. Without it the search index cache lives in process memory.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Recipe provider API key
    pub recipe_api_key: String,

    /// Recipe provider base URL
    #[serde(default = "default_recipe_api_url")]
    pub recipe_api_url: String,

    #[serde(default = "default_recipe_api_timeout_ms")]
    pub recipe_api_timeout_ms: u64,

    /// Enhancement service base URL. Enhancement is disabled when unset.
    #[serde(default)]
    pub enhancement_api_url: Option<String>,

    #[serde(default)]
    pub enhancement_api_key: Option<String>,

    #[serde(default = "default_enhancement_timeout_ms")]
    pub enhancement_timeout_ms: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    #[serde(default)]
    pub cache_match_strictness: MatchStrictness,

    /// TTL for ingredient search index entries
    #[serde(default = "default_search_cache_ttl_secs")]
    pub search_cache_ttl_secs: u64,

    #[serde(default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    #[serde(default = "default_detail_batch_pause_ms")]
    pub detail_batch_pause_ms: u64,

    /// Maximum number of background tasks running at once
    #[serde(default = "default_background_concurrency")]
    pub background_concurrency: usize,

    /// Queued background jobs beyond this are dropped
    #[serde(default = "default_background_queue_capacity")]
    pub background_queue_capacity: usize,

    #[serde(default = "default_search_history_limit")]
    pub search_history_limit: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_recipe_api_url() -> String {
    "https://api.spoonacular.com".to_string()
}

fn default_recipe_api_timeout_ms() -> u64 {
    15_000
}

fn default_enhancement_timeout_ms() -> u64 {
    10_000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

fn default_search_cache_ttl_secs() -> u64 {
    3600
}

fn default_detail_batch_size() -> usize {
    5
}

fn default_detail_batch_pause_ms() -> u64 {
    250
}

fn default_background_concurrency() -> usize {
    8
}

fn default_background_queue_capacity() -> usize {
    1024
}

fn default_search_history_limit() -> usize {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Retry policy shared by the provider client and the enhancement gateway
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.detail_batch_pause_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let config = from_pairs(&[("RECIPE_API_KEY", "secret")]);
        assert_eq!(config.recipe_api_key, "secret");
        assert_eq!(config.recipe_api_url, "https://api.spoonacular.com");
        assert_eq!(config.database_url, None);
        assert_eq!(config.enhancement_api_url, None);
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.cache_match_strictness, MatchStrictness::Any);
        assert_eq!(config.detail_batch_size, 5);
        assert_eq!(config.search_history_limit, 10);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_strictness_parses() {
        let config = from_pairs(&[
            ("RECIPE_API_KEY", "secret"),
            ("CACHE_MATCH_STRICTNESS", "all"),
        ]);
        assert_eq!(config.cache_match_strictness, MatchStrictness::All);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let result = envy::from_iter::<_, Config>(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = from_pairs(&[
            ("RECIPE_API_KEY", "secret"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("RETRY_INITIAL_DELAY_MS", "100"),
            ("RETRY_MAX_DELAY_MS", "1000"),
        ]);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_millis(1000));
    }
}
