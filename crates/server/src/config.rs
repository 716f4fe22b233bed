//! Server configuration from environment variables.

use std::net::SocketAddr;

use chathub_shared::DEFAULT_HUB_PATH;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Path of the WebSocket hub endpoint. Always starts with `/`.
    pub hub_path: String,
    /// Browser origins allowed to connect with credentials.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            hub_path: DEFAULT_HUB_PATH.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CHATHUB_BIND_ADDR`: listen address (default: "0.0.0.0:8080")
    /// - `CHATHUB_HUB_PATH`: hub endpoint path (default: "/chatHub")
    /// - `CHATHUB_ALLOWED_ORIGINS`: comma-separated CORS origins
    ///   (default: "http://localhost:3000,http://localhost:5173")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = match lookup("CHATHUB_BIND_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("invalid CHATHUB_BIND_ADDR {:?} ({}), using {}", raw, e, DEFAULT_BIND_ADDR);
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let hub_path = lookup("CHATHUB_HUB_PATH")
            .map(|p| normalize_path(&p))
            .filter(|p| p != "/")
            .unwrap_or(defaults.hub_path);

        let allowed_origins = lookup("CHATHUB_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .filter(|o| {
                        // A wildcard cannot be combined with credentials.
                        if o == "*" {
                            tracing::warn!("ignoring wildcard in CHATHUB_ALLOWED_ORIGINS");
                        }
                        o != "*"
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Self {
            bind_addr,
            hub_path,
            allowed_origins,
        }
    }
}

fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim().trim_matches('/'))
}
