//! Gateway configuration, read from the environment

use anyhow::{Context, Result};
use std::str::FromStr;
use tracking_core::TrackingConfig;

/// Environment variable holding the upstream bearer token
pub const TOKEN_VAR: &str = "ORBITAL_API_TOKEN";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream producer base URL (default: http://localhost:8080)
    pub api_base: String,
    /// Listen port (default: 18601)
    pub port: u16,
    /// Upstream request timeout in seconds (default: 10)
    pub http_timeout_sec: u64,
    pub tracking: TrackingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            port: 18601,
            http_timeout_sec: 10,
            tracking: TrackingConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base) = lookup("ORBITAL_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(port) = lookup("ORBITAL_GATEWAY_PORT").or_else(|| lookup("PORT")) {
            config.port = parse("ORBITAL_GATEWAY_PORT", &port)?;
        }
        if let Some(secs) = lookup("ORBITAL_HTTP_TIMEOUT_SECS") {
            config.http_timeout_sec = parse("ORBITAL_HTTP_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("ORBITAL_CATALOG_INTERVAL_SECS") {
            config.tracking.catalog_interval_sec = parse("ORBITAL_CATALOG_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("ORBITAL_WARNING_INTERVAL_SECS") {
            config.tracking.warning_interval_sec = parse("ORBITAL_WARNING_INTERVAL_SECS", &secs)?;
        }
        if let Some(ms) = lookup("ORBITAL_SEARCH_DEBOUNCE_MS") {
            config.tracking.search_debounce_ms = parse("ORBITAL_SEARCH_DEBOUNCE_MS", &ms)?;
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
}
