//! Client configuration from the environment

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_GENERATION_POLL: Duration = Duration::from_millis(2000);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, no trailing slash
    pub api_url: String,
    /// Longest a send may stay streaming without a terminal signal
    pub stream_timeout: Duration,
    pub generation_poll_interval: Duration,
    /// Whole-request timeout for REST calls; also the connect timeout for streams
    pub request_timeout: Duration,
    /// Existing session to reuse instead of creating one
    pub session_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            generation_poll_interval: DEFAULT_GENERATION_POLL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_id: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values fall back to
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| non_empty(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            api_url: non_empty("STUDIO_API_URL")
                .map_or(defaults.api_url, |url| url.trim().trim_end_matches('/').to_string()),
            stream_timeout: number("STUDIO_STREAM_TIMEOUT_SECS")
                .map_or(defaults.stream_timeout, Duration::from_secs),
            generation_poll_interval: number("STUDIO_GENERATION_POLL_MS")
                .filter(|&ms| ms > 0)
                .map_or(defaults.generation_poll_interval, Duration::from_millis),
            request_timeout: number("STUDIO_REQUEST_TIMEOUT_SECS")
                .map_or(defaults.request_timeout, Duration::from_secs),
            session_id: non_empty("STUDIO_SESSION_ID"),
        }
    }
}
