//! Configuration module for environment variable parsing.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::notification::DEFAULT_MAX_UNWRAP_DEPTH;
use crate::sink::SUPPRESSION_QUEUE;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Timeout in milliseconds for the SubscribeURL confirmation request
    pub confirm_timeout_ms: u64,

    /// Maximum number of nested `Notification` envelopes to unwrap
    pub max_unwrap_depth: usize,

    /// RabbitMQ connection URL; suppression events are only logged when unset
    pub cloudamqp_url: Option<String>,

    /// Queue that receives published suppression events
    pub suppression_queue: String,

    /// Shared token callbacks must carry as `?token=`
    pub callback_token: Option<String>,

    /// Accepted values of the `{transport}` path segment
    pub allowed_transports: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 8080),

            confirm_timeout_ms: parse_var("CONFIRM_TIMEOUT_MS", 10_000),

            max_unwrap_depth: parse_unwrap_depth("MAX_UNWRAP_DEPTH"),

            cloudamqp_url: env::var("CLOUDAMQP_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            suppression_queue: env::var("SUPPRESSION_QUEUE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| SUPPRESSION_QUEUE.to_string()),

            callback_token: env::var("CALLBACK_TOKEN").ok(),

            allowed_transports: parse_csv("ALLOWED_TRANSPORTS"),
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            confirm_timeout_ms: 10_000,
            max_unwrap_depth: DEFAULT_MAX_UNWRAP_DEPTH,
            cloudamqp_url: None,
            suppression_queue: SUPPRESSION_QUEUE.to_string(),
            callback_token: None,
            allowed_transports: None,
        }
    }
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse the unwrap depth; zero would reject every `Notification`, so it
/// falls back to the default.
fn parse_unwrap_depth(name: &str) -> usize {
    match parse_var(name, DEFAULT_MAX_UNWRAP_DEPTH) {
        0 => {
            warn!(env_var = name, value = 0, "Invalid value, using default");
            DEFAULT_MAX_UNWRAP_DEPTH
        }
        depth => depth,
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_valid() {
        env::set_var("TEST_CONFIRM_TIMEOUT", " 2500 ");
        let result: u64 = parse_var("TEST_CONFIRM_TIMEOUT", 0);
        assert_eq!(result, 2500);
        env::remove_var("TEST_CONFIRM_TIMEOUT");
    }

    #[test]
    fn test_parse_var_invalid_uses_default() {
        env::set_var("TEST_BAD_PORT", "eighty");
        let result: u16 = parse_var("TEST_BAD_PORT", 8080);
        assert_eq!(result, 8080);
        env::remove_var("TEST_BAD_PORT");
    }

    #[test]
    fn test_parse_var_default() {
        let result: usize = parse_var("NONEXISTENT_VAR", 8);
        assert_eq!(result, 8);
    }

    #[test]
    fn test_parse_unwrap_depth_zero_uses_default() {
        env::set_var("TEST_UNWRAP_DEPTH_ZERO", "0");
        assert_eq!(
            parse_unwrap_depth("TEST_UNWRAP_DEPTH_ZERO"),
            DEFAULT_MAX_UNWRAP_DEPTH
        );
        env::remove_var("TEST_UNWRAP_DEPTH_ZERO");
    }

    #[test]
    fn test_parse_unwrap_depth_valid() {
        env::set_var("TEST_UNWRAP_DEPTH", "3");
        assert_eq!(parse_unwrap_depth("TEST_UNWRAP_DEPTH"), 3);
        env::remove_var("TEST_UNWRAP_DEPTH");
    }

    #[test]
    fn test_parse_csv() {
        env::set_var("TEST_TRANSPORTS", "amazon, ses,, ");
        let result = parse_csv("TEST_TRANSPORTS");
        assert_eq!(result, Some(vec!["amazon".to_string(), "ses".to_string()]));
        env::remove_var("TEST_TRANSPORTS");
    }

    #[test]
    fn test_confirm_timeout() {
        let config = Config {
            confirm_timeout_ms: 1500,
            ..Config::default()
        };
        assert_eq!(config.confirm_timeout(), Duration::from_millis(1500));
    }
}
