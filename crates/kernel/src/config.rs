//! Configuration loaded from environment variables.
//!
//! Settings the service can run without are read safely: a value that does
//! not parse is logged and replaced by its default. Database settings are
//! strict and fail startup instead.

use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::Backend;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL-protocol connection URL. When None, nothing is written.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Backend named by `QL_DEFAULT_DB`, if set to a known backend.
    pub default_db: Option<Backend>,

    /// Backend routing read from the YAML file `QL_CONFIG` points to.
    pub routing: Option<BackendRouting>,

    /// Upper bound in bytes for the row data of one insert statement.
    /// When None, a notification is inserted in a single statement.
    pub insert_max_size: Option<u64>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its
    /// value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let default_db = safe_read(&lookup, "QL_DEFAULT_DB", Backend::from_name);

        let routing = lookup("QL_CONFIG").and_then(|path| BackendRouting::from_file(&path));

        let insert_max_size = safe_read(&lookup, "INSERT_MAX_SIZE", parse_byte_size);

        Ok(Self {
            database_url,
            database_max_connections,
            default_db,
            routing,
            insert_max_size,
        })
    }

    /// The backend to use when no tenant-specific choice applies.
    ///
    /// `QL_DEFAULT_DB` wins over the routing file's `default-backend`; with
    /// neither set this is CrateDB.
    pub fn default_backend(&self) -> Backend {
        self.default_db
            .or_else(|| self.routing.as_ref().and_then(BackendRouting::default_backend))
            .unwrap_or_default()
    }

    /// The backend that stores `tenant`'s entities.
    pub fn backend_for(&self, tenant: Option<&str>) -> Backend {
        let backend = tenant
            .zip(self.routing.as_ref())
            .and_then(|(tenant, routing)| routing.tenant_backend(tenant))
            .unwrap_or_else(|| self.default_backend());
        debug!(tenant = tenant.unwrap_or_default(), %backend, "backend selected");
        backend
    }
}

/// Per-tenant backend choices, e.g.
///
/// ```yaml
/// tenants:
///   t1:
///     backend: timescale
/// default-backend: crate
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendRouting {
    #[serde(default)]
    tenants: HashMap<String, TenantConfig>,
    default_backend: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TenantConfig {
    backend: Option<String>,
}

impl BackendRouting {
    /// Parse a routing document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(yaml).context("invalid backend routing YAML")
    }

    /// Read the routing file at `path`. Any failure is logged and treated
    /// as no routing at all.
    fn from_file(path: &str) -> Option<Self> {
        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {path}"))
            .and_then(|yaml| Self::from_yaml(&yaml));
        match parsed {
            Ok(routing) => {
                debug!(path, tenants = routing.tenants.len(), "backend routing loaded");
                Some(routing)
            }
            Err(e) => {
                warn!(path, error = %format!("{e:#}"), "ignoring backend routing file");
                None
            }
        }
    }

    /// The backend configured for `tenant`. Unknown names count as CrateDB.
    pub fn tenant_backend(&self, tenant: &str) -> Option<Backend> {
        let name = self.tenants.get(tenant)?.backend.as_deref()?;
        Some(Backend::from_name(name).unwrap_or_default())
    }

    /// The routing file's `default-backend`. Unknown names count as CrateDB.
    pub fn default_backend(&self) -> Option<Backend> {
        let name = self.default_backend.as_deref()?;
        Some(Backend::from_name(name).unwrap_or_default())
    }
}

fn safe_read<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(var)?;
    match parse(&raw) {
        Some(value) => {
            debug!(var, value = %raw, "config value read");
            Some(value)
        }
        None => {
            warn!(var, value = %raw, "ignoring unparseable config value, using default");
            None
        }
    }
}

/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static BYTE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:([kKMGTPE])(i?))?([bB])\s*$").expect("valid regex literal")
});

/// Parse a byte-size descriptor such as `10MB`, `512 KiB` or `800b` into a
/// number of bytes.
///
/// SI prefixes are powers of 1000, IEC prefixes (`Ki`, `Mi`, ...) powers of
/// 1024. A trailing lowercase `b` counts bits; fractions of a byte are
/// dropped.
pub fn parse_byte_size(raw: &str) -> Option<u64> {
    let caps = BYTE_SIZE.captures(raw)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let exponent = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        None => 0,
        Some(prefix) => match prefix.as_str() {
            "K" => 1,
            "M" => 2,
            "G" => 3,
            "T" => 4,
            "P" => 5,
            "E" => 6,
            _ => return None,
        },
    };
    let iec = caps.get(3).is_some_and(|m| !m.as_str().is_empty());
    let base: f64 = if iec { 1024.0 } else { 1000.0 };
    let bits = caps.get(4).is_some_and(|m| m.as_str() == "b");

    let mut bytes = amount * base.powi(exponent);
    if bits {
        bytes /= 8.0;
    }
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return None;
    }
    Some(bytes.floor() as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.default_backend(), Backend::Crate);
        assert_eq!(config.backend_for(Some("t1")), Backend::Crate);
        assert!(config.insert_max_size.is_none());
    }

    #[test]
    fn reads_values() {
        let config = config(&[
            ("DATABASE_URL", "postgres://quantumleap@localhost/quantumleap"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("QL_DEFAULT_DB", "Timescale"),
            ("INSERT_MAX_SIZE", "1MiB"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://quantumleap@localhost/quantumleap")
        );
        assert_eq!(config.database_max_connections, 4);
        assert_eq!(config.default_backend(), Backend::Timescale);
        assert_eq!(config.insert_max_size, Some(1024 * 1024));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = config(&[
            ("QL_DEFAULT_DB", "influx"),
            ("INSERT_MAX_SIZE", "ten megabytes"),
        ]);
        assert_eq!(config.default_backend(), Backend::Crate);
        assert!(config.insert_max_size.is_none());
    }

    #[test]
    fn bad_pool_size_is_an_error() {
        let err = Config::from_vars(|name| {
            (name == "DATABASE_MAX_CONNECTIONS").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(parse_byte_size("10MB"), Some(10_000_000));
        assert_eq!(parse_byte_size("512 KiB"), Some(512 * 1024));
        assert_eq!(parse_byte_size("1kB"), Some(1000));
        assert_eq!(parse_byte_size("2GiB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_byte_size("800b"), Some(100));
        assert_eq!(parse_byte_size("1Mb"), Some(125_000));
        assert_eq!(parse_byte_size("1.5 KB"), Some(1500));
        assert_eq!(parse_byte_size(" 42B "), Some(42));
        assert_eq!(parse_byte_size("42"), None);
        assert_eq!(parse_byte_size("MB"), None);
        assert_eq!(parse_byte_size("10 XB"), None);
    }

    #[test]
    fn routing_by_tenant() {
        let routing = BackendRouting::from_yaml(
            "tenants:\n  t1:\n    backend: Timescale\n  t2:\n    backend: crate\n  t3:\n    backend: influx\ndefault-backend: timescale\n",
        )
        .unwrap();
        let config = Config {
            routing: Some(routing),
            ..config(&[])
        };
        assert_eq!(config.backend_for(Some("t1")), Backend::Timescale);
        assert_eq!(config.backend_for(Some("t2")), Backend::Crate);
        assert_eq!(config.backend_for(Some("t3")), Backend::Crate);
        assert_eq!(config.backend_for(Some("t4")), Backend::Timescale);
        assert_eq!(config.backend_for(None), Backend::Timescale);
    }

    #[test]
    fn env_default_wins_over_routing_default() {
        let routing = BackendRouting::from_yaml("default-backend: timescale\n").unwrap();
        let config = Config {
            routing: Some(routing),
            ..config(&[("QL_DEFAULT_DB", "crate")])
        };
        assert_eq!(config.default_backend(), Backend::Crate);
    }

    #[test]
    fn routing_file() {
        let path = env::temp_dir().join(format!("tempora-routing-{}.yml", std::process::id()));
        std::fs::write(&path, "tenants:\n  t1:\n    backend: timescale\n").unwrap();
        let config = config(&[("QL_CONFIG", path.to_str().unwrap())]);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.backend_for(Some("t1")), Backend::Timescale);
        assert_eq!(config.backend_for(Some("t2")), Backend::Crate);
    }

    #[test]
    fn missing_or_empty_routing() {
        let config = config(&[("QL_CONFIG", "/nonexistent/tempora/ql-config.yml")]);
        assert!(config.routing.is_none());
        assert_eq!(config.default_backend(), Backend::Crate);

        let routing = BackendRouting::from_yaml("").unwrap();
        assert!(routing.default_backend().is_none());
        assert!(routing.tenant_backend("t1").is_none());
        assert!(BackendRouting::from_yaml("tenants: [").is_err());
    }
}
