//! Server configuration for `certbadge`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `CERTBADGE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use certbadge_core::template::TemplateSource;

/// Default listen port.
const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Lifetime of response-cache entries, also sent as `max-age`.
    pub cache_ttl: Duration,
    /// Interval between sweeps of expired response-cache entries.
    pub cache_sweep_interval: Duration,
    /// Certificate template asset. Embedded when not configured.
    pub certificate_template: TemplateSource,
    /// Key expected in `X-Api-Key` on admin routes. Admin routes are
    /// disabled when unset.
    pub admin_api_key: Option<String>,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// `RocksDB` persistent storage.
    RocksDb { path: String },
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            storage_backend: StorageBackendType::Memory,
            log_level: "info".to_owned(),
            cache_ttl: certbadge_core::cache::DEFAULT_TTL,
            cache_sweep_interval: Duration::from_secs(60),
            certificate_template: TemplateSource::Embedded,
            admin_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `CERTBADGE_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `CERTBADGE_STORAGE`: `memory` or `rocksdb` (default: `memory`)
    /// - `CERTBADGE_STORAGE_PATH`: path for persistent backends (default: `./data`)
    /// - `CERTBADGE_LOG_LEVEL`: log filter (default: `info`)
    /// - `CERTBADGE_CACHE_TTL`: response cache TTL in seconds (default: `300`)
    /// - `CERTBADGE_CACHE_SWEEP_INTERVAL`: seconds between cache sweeps (default: `60`)
    /// - `CERTBADGE_CERTIFICATE_TEMPLATE`: certificate template path (default: embedded)
    /// - `CERTBADGE_ADMIN_API_KEY`: admin API key (default: admin API disabled)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Priority: CERTBADGE_BIND_ADDR > PORT > default
        let bind_addr = if let Some(addr) = lookup("CERTBADGE_BIND_ADDR") {
            addr.parse().unwrap_or(defaults.bind_addr)
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            defaults.bind_addr
        };

        let storage_path = lookup("CERTBADGE_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned());

        let storage_backend = match lookup("CERTBADGE_STORAGE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "rocksdb" => StorageBackendType::RocksDb { path: storage_path },
            _ => StorageBackendType::Memory,
        };

        let log_level = lookup("CERTBADGE_LOG_LEVEL").unwrap_or(defaults.log_level);

        let seconds = |name: &str| {
            lookup(name)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .map(Duration::from_secs)
        };
        let cache_ttl = seconds("CERTBADGE_CACHE_TTL").unwrap_or(defaults.cache_ttl);
        let cache_sweep_interval =
            seconds("CERTBADGE_CACHE_SWEEP_INTERVAL").unwrap_or(defaults.cache_sweep_interval);

        let certificate_template = lookup("CERTBADGE_CERTIFICATE_TEMPLATE")
            .filter(|p| !p.is_empty())
            .map_or(TemplateSource::Embedded, |p| {
                TemplateSource::File(PathBuf::from(p))
            });

        let admin_api_key = lookup("CERTBADGE_ADMIN_API_KEY").filter(|k| !k.is_empty());

        Self {
            bind_addr,
            storage_backend,
            log_level,
            cache_ttl,
            cache_sweep_interval,
            certificate_template,
            admin_api_key,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.storage_backend, StorageBackendType::Memory);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.cache_sweep_interval, Duration::from_secs(60));
        assert_eq!(cfg.certificate_template, TemplateSource::Embedded);
        assert!(cfg.admin_api_key.is_none());
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let cfg = config(&[("PORT", "9000"), ("CERTBADGE_BIND_ADDR", "10.0.0.1:7000")]);
        assert_eq!(cfg.bind_addr, "10.0.0.1:7000".parse().unwrap());

        let cfg = config(&[("PORT", "9000")]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn rocksdb_uses_storage_path() {
        let cfg = config(&[("CERTBADGE_STORAGE", "RocksDB"), ("CERTBADGE_STORAGE_PATH", "/var/lib/cb")]);
        assert_eq!(
            cfg.storage_backend,
            StorageBackendType::RocksDb {
                path: "/var/lib/cb".to_owned()
            }
        );
    }

    #[test]
    fn invalid_durations_fall_back_to_defaults() {
        let cfg = config(&[("CERTBADGE_CACHE_TTL", "soon"), ("CERTBADGE_CACHE_SWEEP_INTERVAL", "0")]);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.cache_sweep_interval, Duration::from_secs(60));

        let cfg = config(&[("CERTBADGE_CACHE_TTL", "30")]);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn template_and_api_key_are_optional() {
        let cfg = config(&[
            ("CERTBADGE_CERTIFICATE_TEMPLATE", "/etc/cb/cert.svg"),
            ("CERTBADGE_ADMIN_API_KEY", ""),
        ]);
        assert_eq!(
            cfg.certificate_template,
            TemplateSource::File(PathBuf::from("/etc/cb/cert.svg"))
        );
        assert!(cfg.admin_api_key.is_none());
    }
}
