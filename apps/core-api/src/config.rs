//! Layered service configuration.
//!
//! Sources, lowest priority first: built-in defaults, the YAML file, then
//! `APP__*` environment variables (`APP__SERVER__BIND_ADDR` sets
//! `server.bind_addr`). Before parsing, `${VAR}` and `${VAR:default}`
//! placeholders in the file are replaced from the process environment.
//!
//! A module may carry an overlay at `<config dir>/<module>/config.yaml`. Its
//! values are merged over the global file before the environment, so a module
//! can point at its own database while inheriting everything else.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use corekit_db::DbConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "APP__";

/// Directory searched for module overlays when no global file is given.
pub const DEFAULT_CONFIG_DIR: &str = "config";

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").ok());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub database: DbConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub name: String,
    pub env: String,
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "core-api".to_owned(),
            env: "local".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Deadline given to every request's context.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_owned(),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info,sqlx=warn"`. `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` if given, then the environment.
    ///
    /// # Errors
    /// Fails when the file cannot be read, a placeholder has no value and no
    /// default, or the merged values do not fit the schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_layers(path.as_slice())
    }

    /// Load defaults, then every file in `files` in order, then the
    /// environment.
    ///
    /// # Errors
    /// See [`AppConfig::load`].
    pub fn load_layers<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        for path in files {
            let path = path.as_ref();
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let expanded = expand_placeholders(&raw)
                .with_context(|| format!("expanding placeholders in {}", path.display()))?;
            figment = figment.merge(Yaml::string(&expanded));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }
}

/// Global configuration plus the effective configuration of every module
/// that ships an overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostConfig {
    pub global: AppConfig,
    pub modules: BTreeMap<String, AppConfig>,
}

impl From<AppConfig> for HostConfig {
    fn from(global: AppConfig) -> Self {
        Self {
            global,
            modules: BTreeMap::new(),
        }
    }
}

impl HostConfig {
    /// Load the global configuration and the overlay of each name in
    /// `modules` that has one.
    ///
    /// # Errors
    /// See [`AppConfig::load`]; an overlay that exists but fails to load is
    /// an error too.
    pub fn load(path: Option<&Path>, modules: &[&str]) -> Result<Self> {
        let global = AppConfig::load(path)?;
        let mut loaded = BTreeMap::new();
        for &name in modules {
            let overlay = overlay_path(path, name);
            if !overlay.is_file() {
                continue;
            }
            let layers: Vec<&Path> = path.into_iter().chain([overlay.as_path()]).collect();
            let cfg = AppConfig::load_layers(&layers)
                .with_context(|| format!("loading configuration of module '{name}'"))?;
            tracing::debug!(module = name, overlay = %overlay.display(), "module overlay loaded");
            loaded.insert(name.to_owned(), cfg);
        }
        Ok(Self {
            global,
            modules: loaded,
        })
    }

    /// Effective configuration of `name`, the global one without an overlay.
    #[must_use]
    pub fn module(&self, name: &str) -> &AppConfig {
        self.modules.get(name).unwrap_or(&self.global)
    }

    /// Global and module configurations, for overrides that apply to all.
    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut AppConfig> {
        std::iter::once(&mut self.global).chain(self.modules.values_mut())
    }
}

/// `<dir of the global file>/<module>/config.yaml`.
#[must_use]
pub fn overlay_path(global: Option<&Path>, module: &str) -> PathBuf {
    let dir = global
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), Path::to_path_buf);
    dir.join(module).join("config.yaml")
}

/// Replace `${VAR}` and `${VAR:default}` from the environment. An empty
/// variable counts as unset.
///
/// # Errors
/// Fails when a variable without default is unset.
pub fn expand_placeholders(input: &str) -> Result<String> {
    let re = PLACEHOLDER
        .as_ref()
        .context("placeholder pattern failed to compile")?;
    let mut missing = Vec::new();
    let out = re.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name).ok().filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => caps.get(2).map_or_else(
                || {
                    missing.push(name.to_owned());
                    String::new()
                },
                |d| d.as_str().to_owned(),
            ),
        }
    });
    if !missing.is_empty() {
        anyhow::bail!("environment variable(s) not set: {}", missing.join(", "));
    }
    Ok(out.into_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn placeholders_use_env_then_default() {
        temp_env::with_vars(
            [("CORE_TEST_HOST", Some("db.internal")), ("CORE_TEST_EMPTY", Some(""))],
            || {
                let out = expand_placeholders(
                    "host: ${CORE_TEST_HOST:localhost}\nuser: ${CORE_TEST_EMPTY:app}\nport: ${CORE_TEST_UNSET:5432}",
                )
                .unwrap();
                assert_eq!(out, "host: db.internal\nuser: app\nport: 5432");
            },
        );
    }

    #[test]
    fn placeholder_without_default_must_be_set() {
        temp_env::with_var_unset("CORE_TEST_REQUIRED", || {
            let err = expand_placeholders("dsn: ${CORE_TEST_REQUIRED}").unwrap_err();
            assert!(err.to_string().contains("CORE_TEST_REQUIRED"));
        });
    }

    #[test]
    fn empty_default_is_allowed() {
        temp_env::with_var_unset("CORE_TEST_OPTIONAL", || {
            assert_eq!(
                expand_placeholders("x: '${CORE_TEST_OPTIONAL:}'").unwrap(),
                "x: ''"
            );
        });
    }

    #[test]
    fn overlay_sits_next_to_the_global_file() {
        assert_eq!(
            overlay_path(Some(Path::new("/etc/core/config.yaml")), "booking"),
            PathBuf::from("/etc/core/booking/config.yaml")
        );
        assert_eq!(
            overlay_path(Some(Path::new("config.yaml")), "booking"),
            PathBuf::from("config/booking/config.yaml")
        );
        assert_eq!(
            overlay_path(None, "booking"),
            PathBuf::from("config/booking/config.yaml")
        );
    }

    #[test]
    fn defaults_apply_without_a_file() {
        temp_env::with_var_unset("APP__SERVER__BIND_ADDR", || {
            let cfg = AppConfig::load(None).unwrap();
            assert_eq!(cfg, AppConfig::default());
        });
    }
}
