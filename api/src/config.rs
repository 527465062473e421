use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::app::FeedSettings;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// WPGraphQL endpoint, e.g. https://cms.example.gt/graphql
    pub wordpress_graphql_url: String,
    /// Bearer token for private CMS content
    pub wordpress_auth_token: Option<String>,
    /// How many related posts to request per article
    pub wordpress_related_limit: u32,
    /// How many posts to request per "more in category" lookup
    pub wordpress_category_limit: u32,
    /// Secret for verifying live-coverage webhooks (HMAC-SHA256)
    pub live_webhook_secret: Option<String>,
    /// Per-IP rate limit on session creation
    pub rate_limit_enabled: bool,
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
    pub max_sessions: usize,
    pub feed: FeedSettings,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = FeedSettings::default();
        let feed = FeedSettings {
            prefetch_debounce: Duration::from_millis(parse_or(
                "FEED_PREFETCH_DEBOUNCE_MS",
                defaults.prefetch_debounce.as_millis() as u64,
            )),
            fetch_timeout: Duration::from_millis(parse_or(
                "FEED_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )),
            timeout_retries: parse_or("FEED_TIMEOUT_RETRIES", defaults.timeout_retries),
            visibility_threshold: parse_or(
                "FEED_VISIBILITY_THRESHOLD",
                defaults.visibility_threshold,
            ),
            prefetch_margin_px: parse_or("FEED_PREFETCH_MARGIN_PX", defaults.prefetch_margin_px),
        };

        Self {
            port: parse_or("PORT", 8080),
            wordpress_graphql_url: env::var("WORDPRESS_GRAPHQL_URL")
                .expect("WORDPRESS_GRAPHQL_URL must be set"),
            wordpress_auth_token: env::var("WORDPRESS_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            wordpress_related_limit: parse_or("WORDPRESS_RELATED_LIMIT", 6),
            wordpress_category_limit: parse_or("WORDPRESS_CATEGORY_LIMIT", 10),
            live_webhook_secret: env::var("LIVE_WEBHOOK_SECRET").ok(),
            rate_limit_enabled: parse_or("RATE_LIMIT_ENABLED", true),
            session_idle_ttl: Duration::from_secs(parse_or("SESSION_IDLE_TTL_SECS", 1800)),
            session_sweep_interval: Duration::from_secs(parse_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                60,
            )),
            max_sessions: parse_or("MAX_SESSIONS", 10_000),
            feed,
        }
    }

    /// Check if live-coverage webhooks are signed
    pub fn live_webhook_signed(&self) -> bool {
        self.live_webhook_secret.is_some()
    }
}

/// Read and parse an env var, falling back to `default` when unset or malformed
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Malformed config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for handler tests: no network, no rate limiting
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            wordpress_graphql_url: "http://cms.test/graphql".to_string(),
            wordpress_auth_token: None,
            wordpress_related_limit: 6,
            wordpress_category_limit: 10,
            live_webhook_secret: None,
            rate_limit_enabled: false,
            session_idle_ttl: Duration::from_secs(1800),
            session_sweep_interval: Duration::from_secs(60),
            max_sessions: 100,
            feed: FeedSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_missing_key() {
        assert_eq!(parse_or("RADIONEWS_TEST_UNSET_KEY", 42u32), 42);
    }

    #[test]
    fn parse_or_falls_back_on_garbage() {
        env::set_var("RADIONEWS_TEST_GARBAGE_KEY", "not-a-number");
        assert_eq!(parse_or("RADIONEWS_TEST_GARBAGE_KEY", 7u64), 7);
        env::remove_var("RADIONEWS_TEST_GARBAGE_KEY");
    }

    #[test]
    fn parse_or_reads_value() {
        env::set_var("RADIONEWS_TEST_FLOAT_KEY", " 0.5 ");
        assert_eq!(parse_or("RADIONEWS_TEST_FLOAT_KEY", 0.3f64), 0.5);
        env::remove_var("RADIONEWS_TEST_FLOAT_KEY");
    }

    #[test]
    fn webhook_signing_flag() {
        let mut config = Config::for_tests();
        assert!(!config.live_webhook_signed());
        config.live_webhook_secret = Some("s3cret".into());
        assert!(config.live_webhook_signed());
    }
}
