//! Server configuration from the environment
//!
//! `.env` files are honoured (loaded by `main` through dotenvy). Every
//! setting has a default so the server runs with no configuration at all.

use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(60);
pub const DEFAULT_RESIGN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// How long a room survives with nobody online
    pub disconnect_grace: Duration,
    /// How long a room survives after a resignation
    pub resign_grace: Duration,
    /// Build stamp reported by `server_info` and `/__whoami`
    pub build: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            resign_grace: DEFAULT_RESIGN_GRACE,
            build: format!("neonchess-server {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServerConfig {
    /// Read `PORT`, `DISCONNECT_GRACE_MS`, `RESIGN_GRACE_MS` and `BUILD_ID`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
        }
        if let Some(ms) = lookup("DISCONNECT_GRACE_MS") {
            config.disconnect_grace = parse_millis("DISCONNECT_GRACE_MS", &ms)?;
        }
        if let Some(ms) = lookup("RESIGN_GRACE_MS") {
            config.resign_grace = parse_millis("RESIGN_GRACE_MS", &ms)?;
        }
        if let Some(build) = lookup("BUILD_ID").filter(|b| !b.trim().is_empty()) {
            config.build = build;
        }

        Ok(config)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    let ms: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be milliseconds, got {value:?}"))?;
    Ok(Duration::from_millis(ms))
}
