//! Startup configuration (§6 "Configuration").
//!
//! Values are merged, lowest to highest priority: built-in defaults, then
//! the `VELLUM_*` environment variables, the same layering the teacher's
//! own `config::Settings` used (`config` crate + `serde`), trimmed down to
//! the handful of knobs this server actually has.

use std::net::SocketAddr;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::database::keyspace::DEFAULT_MAX_LIST_SIZE;

fn default_listen_address() -> String {
    "127.0.0.1:2000".to_string()
}

fn default_max_connections() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// TCP address the event loop listens on (§6, default `127.0.0.1:2000`).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Soft cap on simultaneously open client sockets.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// `tracing` env-filter directive; raised to `debug` when the `DEBUG`
    /// env var is set (§6), independent of this field.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Settings {
    /// Loads settings from defaults plus `VELLUM_*` environment overrides
    /// (e.g. `VELLUM_LISTEN_ADDRESS`, `VELLUM_MAX_CONNECTIONS`).
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .set_default("listen_address", default_listen_address())?
            .set_default("max_connections", default_max_connections() as i64)?
            .set_default("log_level", default_log_level())?
            .add_source(Environment::with_prefix("VELLUM").separator("_"))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.listen_address.parse()
    }

    /// `true` when the `DEBUG` env var is set to anything but empty/`0`
    /// (§6).
    pub fn debug_enabled() -> bool {
        match std::env::var("DEBUG") {
            Ok(v) => !v.is_empty() && v != "0",
            Err(_) => false,
        }
    }
}

/// Reads `SET_MAX_ZIPLIST_ENTRIES` (§6), falling back to
/// [`DEFAULT_MAX_LIST_SIZE`] when unset or `<= 0`.
pub fn max_list_size_from_env() -> usize {
    std::env::var("SET_MAX_ZIPLIST_ENTRIES")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_MAX_LIST_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_list_size_defaults_when_unset() {
        std::env::remove_var("SET_MAX_ZIPLIST_ENTRIES");
        assert_eq!(max_list_size_from_env(), DEFAULT_MAX_LIST_SIZE);
    }

    #[test]
    fn max_list_size_ignores_non_positive() {
        std::env::set_var("SET_MAX_ZIPLIST_ENTRIES", "-5");
        assert_eq!(max_list_size_from_env(), DEFAULT_MAX_LIST_SIZE);
        std::env::remove_var("SET_MAX_ZIPLIST_ENTRIES");
    }

    #[test]
    fn max_list_size_reads_override() {
        std::env::set_var("SET_MAX_ZIPLIST_ENTRIES", "128");
        assert_eq!(max_list_size_from_env(), 128);
        std::env::remove_var("SET_MAX_ZIPLIST_ENTRIES");
    }
}
