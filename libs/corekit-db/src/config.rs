//! Serde-facing database configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConnectOpts;

/// `database` section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    pub dsn: String,
    pub pool: PoolCfg,
    /// Apply module migrations on startup.
    pub migrate: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://data/core-api.db?mode=rwc".to_owned(),
            pool: PoolCfg::default(),
            migrate: true,
        }
    }
}

/// Pool knobs. Durations use humantime strings such as `"30s"` or `"5m"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolCfg {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: bool,
}

impl From<&PoolCfg> for ConnectOpts {
    fn from(cfg: &PoolCfg) -> Self {
        let defaults = Self::default();
        Self {
            max_conns: cfg.max_conns.or(defaults.max_conns),
            min_conns: cfg.min_conns.or(defaults.min_conns),
            acquire_timeout: cfg.acquire_timeout.or(defaults.acquire_timeout),
            idle_timeout: cfg.idle_timeout.or(defaults.idle_timeout),
            max_lifetime: cfg.max_lifetime.or(defaults.max_lifetime),
            test_before_acquire: cfg.test_before_acquire,
        }
    }
}

/// Redact credentials from a DSN for logging.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    if !dsn.contains('@') {
        return dsn.to_owned();
    }
    match url::Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                return "***".to_owned();
            }
            parsed.to_string()
        }
        Err(_) => "***".to_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn pool_durations_parse_from_humantime() {
        let cfg: DbConfig = serde_json::from_value(serde_json::json!({
            "dsn": "postgres://app:secret@db:5432/core",
            "pool": { "max_conns": 20, "acquire_timeout": "5s", "idle_timeout": "10m" }
        }))
        .unwrap();
        assert_eq!(cfg.pool.max_conns, Some(20));
        assert_eq!(cfg.pool.acquire_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.pool.idle_timeout, Some(Duration::from_secs(600)));
        assert!(cfg.migrate);
    }

    #[test]
    fn connect_opts_fill_missing_values_from_defaults() {
        let opts = ConnectOpts::from(&PoolCfg {
            min_conns: Some(2),
            ..PoolCfg::default()
        });
        assert_eq!(opts.min_conns, Some(2));
        assert_eq!(opts.max_conns, ConnectOpts::default().max_conns);
        assert_eq!(opts.acquire_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn dsn_password_is_redacted() {
        assert_eq!(
            redact_dsn("postgres://app:secret@db:5432/core"),
            "postgres://app:***@db:5432/core"
        );
        assert_eq!(redact_dsn("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<PoolCfg, _> =
            serde_json::from_value(serde_json::json!({ "max_connections": 5 }));
        assert!(res.is_err());
    }
}
