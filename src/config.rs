//! Proxy configuration loading and validation.
//!
//! A [`ProxyConfig`] is resolved once at startup and injected into the
//! executor and adapters. Layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. Optional YAML file (`--config` or `SEOFORGE_CONFIG`), with `${VAR}` and
//!    `${VAR:-default}` interpolation
//! 3. Environment variables (`API_BASE_URL`, `SEOFORGE_API_KEY`, ...)
//! 4. Command-line flags ([`ConfigOverrides`])

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::tools::Catalog;
use crate::upstream::RetryPolicy;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Hosted SEO Forge server.
pub const DEFAULT_BASE_URL: &str = "https://seoforge-mcp-server.onrender.com";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_LOG_LEVEL: &str = "seoforge_mcp=info,warn";

/// Env var naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "SEOFORGE_CONFIG";

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A value was present but unusable.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ─── ProxyConfig ─────────────────────────────────────────────────────────────

/// Runtime configuration for the proxy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upstream API root; tool endpoints are appended to it.
    pub base_url: String,
    /// Sent as both `Authorization: Bearer` and `X-API-Key` when set.
    pub api_key: Option<String>,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Total attempts per call, including the first.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Whether non-2xx responses are retried like transport failures.
    pub retry_client_errors: bool,
    /// Tool table served by `serve`, `call` and `tools`.
    pub catalog: Catalog,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log to this file (rotated) instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            retry_client_errors: true,
            catalog: Catalog::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub catalog: Option<Catalog>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ProxyConfig {
    /// Resolve all layers against the process environment and validate.
    ///
    /// `path` wins over `SEOFORGE_CONFIG`. A missing file is an error only
    /// when a path was given explicitly.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_yaml_file(&p)?,
            None => Self::default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file after env-var interpolation. Keys that are
    /// absent keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let interpolated = interpolate_env_vars(&raw);
        if interpolated.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Self =
            serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.log_file = config
            .log_file
            .map(|p| PathBuf::from(expand_tilde(&p.to_string_lossy())));

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply environment variables through `lookup`. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("API_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = get("SEOFORGE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(v) = get("API_TIMEOUT") {
            self.timeout_ms = parse_env("API_TIMEOUT", &v)?;
        }
        if let Some(v) = get("API_RETRIES") {
            self.max_retries = parse_env("API_RETRIES", &v)?;
        }
        if let Some(v) = get("API_RETRY_BASE_DELAY") {
            self.base_delay_ms = parse_env("API_RETRY_BASE_DELAY", &v)?;
        }
        if let Some(v) = get("SEOFORGE_CATALOG") {
            self.catalog = v.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "SEOFORGE_CATALOG".into(),
                reason,
            })?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.base_url {
            self.base_url = url.clone();
        }
        if let Some(key) = &overrides.api_key {
            self.api_key = Some(key.clone());
        }
        if let Some(ms) = overrides.timeout_ms {
            self.timeout_ms = ms;
        }
        if let Some(n) = overrides.max_retries {
            self.max_retries = n;
        }
        if let Some(catalog) = overrides.catalog {
            self.catalog = catalog;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if let Some(path) = &overrides.log_file {
            self.log_file = Some(path.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".into(),
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_retries".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            retry_client_errors: self.retry_client_errors,
        }
    }

    /// Join a tool endpoint path onto the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{value}': {e}"),
        })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Substitute `${NAME}` and `${NAME:-fallback}` from the process environment.
///
/// Unset names without a fallback become empty. An unterminated `${` is left as is.
fn interpolate_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        out.push_str(&lookup_var(&body[..end]));
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

fn lookup_var(reference: &str) -> String {
    let (name, fallback) = match reference.split_once(":-") {
        Some((name, fallback)) => (name, Some(fallback)),
        None => (reference, None),
    };
    match (std::env::var(name), fallback) {
        (Ok(value), _) => value,
        (Err(_), Some(fallback)) => expand_tilde(fallback),
        (Err(_), None) => String::new(),
    }
}

/// `~/x` becomes `$HOME/x`; other paths are returned unchanged.
fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
        _ => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert!(config.retry_client_errors);
        assert_eq!(config.catalog, Catalog::SeoForge);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_layer() {
        let mut config = ProxyConfig::default();
        config
            .apply_env_with(env(&[
                ("API_BASE_URL", "http://localhost:8000"),
                ("SEOFORGE_API_KEY", "secret"),
                ("API_TIMEOUT", "5000"),
                ("API_RETRIES", "5"),
                ("SEOFORGE_CATALOG", "unified"),
                ("LOG_LEVEL", ""),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.catalog, Catalog::Unified);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL, "empty values are ignored");
    }

    #[test]
    fn test_env_rejects_garbage_numbers() {
        let mut config = ProxyConfig::default();
        let err = config
            .apply_env_with(env(&[("API_RETRIES", "three")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "API_RETRIES"));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = ProxyConfig::default();
        config
            .apply_env_with(env(&[("API_BASE_URL", "http://from-env")]))
            .unwrap();
        config.apply_overrides(&ConfigOverrides {
            base_url: Some("http://from-flag".into()),
            max_retries: Some(1),
            ..Default::default()
        });
        assert_eq!(config.base_url, "http://from-flag");
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_validate() {
        let bad_url = ProxyConfig {
            base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_retries = ProxyConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(zero_retries.validate().is_err());

        let zero_timeout = ProxyConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_yaml_file_partial() {
        std::env::set_var("__SEOFORGE_TEST_KEY__", "yaml-secret");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: http://127.0.0.1:9000\napi_key: ${{__SEOFORGE_TEST_KEY__}}\nmax_retries: 2\ncatalog: client"
        )
        .unwrap();

        let config = ProxyConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.api_key.as_deref(), Some("yaml-secret"));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.catalog, Catalog::Client);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        std::env::remove_var("__SEOFORGE_TEST_KEY__");
    }

    #[test]
    fn test_yaml_file_missing() {
        let err = ProxyConfig::from_yaml_file(Path::new("/nonexistent/seoforge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_yaml_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries: [not, a, number]").unwrap();
        let err = ProxyConfig::from_yaml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_endpoint_url_joins_slashes() {
        let config = ProxyConfig {
            base_url: "http://api.test/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint_url("/universal-mcp/status"),
            "http://api.test/universal-mcp/status"
        );
        assert_eq!(join_url("http://api.test", "mcp/tools/execute"), "http://api.test/mcp/tools/execute");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = ProxyConfig {
            max_retries: 4,
            base_delay_ms: 250,
            retry_client_errors: false,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert!(!policy.retry_client_errors);
    }

    #[test]
    fn test_interpolate_with_default() {
        std::env::remove_var("__SEOFORGE_UNSET_VAR__");
        assert_eq!(
            interpolate_env_vars("url: ${__SEOFORGE_UNSET_VAR__:-http://fallback}"),
            "url: http://fallback"
        );
    }

    #[test]
    fn test_interpolate_unset_and_unterminated() {
        assert_eq!(interpolate_env_vars("a${__SEOFORGE_UNSET_VAR__}b"), "ab");
        assert_eq!(interpolate_env_vars("key: ${OPEN"), "key: ${OPEN");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain: value";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/logs/seoforge.log");
        assert!(!result.starts_with('~'));
        assert!(result.ends_with("/logs/seoforge.log"));
    }
}
