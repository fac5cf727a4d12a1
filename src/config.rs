//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DASHBOARD_REFRESH_SECS: u64 = 300;
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeouts: HttpTimeouts,
    pub dashboard_refresh_secs: u64,
    pub notice_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            dashboard_refresh_secs: DEFAULT_DASHBOARD_REFRESH_SECS,
            notice_ttl_secs: DEFAULT_NOTICE_TTL_SECS,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// All optional:
    /// - `SABLES_API_URL`: backend base URL, default `http://localhost:8000/api`
    /// - `SABLES_ACCESS_TOKEN`: bearer token attached to every request
    /// - `SABLES_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SABLES_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SABLES_DASHBOARD_REFRESH_SECS`: default 300
    /// - `SABLES_NOTICE_TTL_SECS`: default 4
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = normalize_base_url(
            &std::env::var("SABLES_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        );
        let access_token = std::env::var("SABLES_ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("SABLES_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("SABLES_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Self {
            base_url,
            access_token,
            timeouts,
            dashboard_refresh_secs: env_parse_u64("SABLES_DASHBOARD_REFRESH_SECS", DEFAULT_DASHBOARD_REFRESH_SECS),
            notice_ttl_secs: env_parse_u64("SABLES_NOTICE_TTL_SECS", DEFAULT_NOTICE_TTL_SECS),
        }
    }

    /// Replace the base URL and/or token with explicit overrides (CLI flags).
    #[must_use]
    pub fn with_overrides(mut self, base_url: Option<&str>, access_token: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = normalize_base_url(url);
        }
        if access_token.is_some() {
            self.access_token = access_token;
        }
        self
    }

    #[must_use]
    pub fn dashboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_secs.max(1))
    }

    #[must_use]
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
