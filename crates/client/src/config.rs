//! Client configuration from environment variables.

use std::time::Duration;

use chathub_shared::DEFAULT_HUB_PATH;
use url::Url;

use crate::error::ClientError;
use crate::ws::ReconnectConfig;

const DEFAULT_URL: &str = "ws://localhost:8080/chatHub";
const DEFAULT_INVOKE_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the hub.
    pub url: String,
    pub invoke_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CHATHUB_URL`: hub URL; `http(s)` is mapped to `ws(s)` and a bare
    ///   host gets the default hub path (default: "ws://localhost:8080/chatHub")
    /// - `CHATHUB_INVOKE_TIMEOUT_MS`: how long to wait for an acknowledgement
    ///   (default: 30000)
    /// - `CHATHUB_RECONNECT_MAX_ATTEMPTS`: 0 retries forever (default: 10)
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let url = hub_url(&lookup("CHATHUB_URL").unwrap_or_else(|| DEFAULT_URL.to_string()))?;

        let invoke_timeout = Duration::from_millis(parse_or(
            &lookup,
            "CHATHUB_INVOKE_TIMEOUT_MS",
            DEFAULT_INVOKE_TIMEOUT_MS,
        ));

        let defaults = ReconnectConfig::default();
        let reconnect = ReconnectConfig {
            max_attempts: parse_or(&lookup, "CHATHUB_RECONNECT_MAX_ATTEMPTS", defaults.max_attempts),
            ..defaults
        };

        Ok(Self {
            url,
            invoke_timeout,
            reconnect,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("invalid {} {:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// Normalize a configured hub address into a WebSocket URL.
pub fn hub_url(raw: &str) -> Result<String, ClientError> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch scheme".to_string()))?;

    if url.path() == "/" {
        url.set_path(DEFAULT_HUB_PATH);
    }
    Ok(url.to_string())
}
