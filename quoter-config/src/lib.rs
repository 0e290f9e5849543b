//! Loader for the quoter configuration: one file (YAML, JSON or TOML by suffix)
//! overlaid with `QUOTER__`-prefixed environment variables.
//!
//! Environment variables win over the file and use `__` for nesting, so
//! `QUOTER__GITHUB__DRY_RUN=true` flips `github.dry_run`. `${VAR}` placeholders
//! inside string values are expanded after merging.
use config::{Config, ConfigError, Environment, File};
use quoter_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_MAX_STATUS_LENGTH: usize = 80;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
/// Environment variable that overrides `github.token`.
pub const TOKEN_ENV: &str = "QUOTER_GITHUB_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct QuoterConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true", rename = "loop")]
    pub loop_enabled: bool,
    #[serde(default)]
    pub refresh_interval_seconds: u64,
    #[serde(default)]
    pub logging: LoggingSection,
    pub parser: ParserSection,
    #[serde(default)]
    pub github: Option<GithubSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: true,
            filter: default_filter(),
        }
    }
}

/// Where the quotes page lives and how to pull quote/author pairs out of it.
#[derive(Debug, Clone, Deserialize)]
pub struct ParserSection {
    pub url: String,
    pub quote_selector: String,
    #[serde(default)]
    pub source_selector: Option<String>,
    /// Attribute holding the author; empty means "use the element text".
    #[serde(default = "default_source_attr")]
    pub source_attr: String,
    #[serde(default)]
    pub block_selector: Option<String>,
    #[serde(default)]
    pub max_attempts: i64,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: f64,
}

impl ParserSection {
    /// Attempt cap for the fetch loop; `0` means unlimited.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.clamp(0, u32::MAX as i64) as u32
    }

    pub fn retry_interval(&self) -> Duration {
        if self.retry_interval_seconds.is_finite() && self.retry_interval_seconds > 0.0 {
            Duration::from_secs_f64(self.retry_interval_seconds)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub graphql_url: Option<String>,
    #[serde(default)]
    pub max_status_length: Option<usize>,
}

impl QuoterConfig {
    /// Seconds between cycles; `0` means run once. `loop: false` forces a single run.
    pub fn refresh_interval(&self) -> u64 {
        if self.loop_enabled {
            self.refresh_interval_seconds
        } else {
            0
        }
    }

    pub fn max_status_length(&self) -> usize {
        self.github
            .as_ref()
            .and_then(|g| g.max_status_length)
            .filter(|len| *len > 0)
            .unwrap_or(DEFAULT_MAX_STATUS_LENGTH)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

impl GithubSection {
    pub fn endpoint(&self) -> &str {
        self.graphql_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_GRAPHQL_URL)
    }
}

/// Pick the status-service credential: a non-empty override (normally the
/// `QUOTER_GITHUB_TOKEN` variable) wins, then the configured token. Configured
/// values still holding an unexpanded `${VAR}` count as absent.
///
/// ```
/// use quoter_config::resolve_credential;
///
/// assert_eq!(resolve_credential(Some("env".into()), Some("file")), Some("env".into()));
/// assert_eq!(resolve_credential(Some("  ".into()), Some("file")), Some("file".into()));
/// assert_eq!(resolve_credential(None, Some("${GITHUB_TOKEN}")), None);
/// assert_eq!(resolve_credential(None, None), None);
/// ```
pub fn resolve_credential(env_override: Option<String>, configured: Option<&str>) -> Option<String> {
    env_override
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            configured
                .map(str::trim)
                .filter(|t| !t.is_empty() && !t.contains("${"))
                .map(str::to_string)
        })
}

fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_filter() -> String {
    "info".into()
}
fn default_source_attr() -> String {
    "data-source".into()
}
fn default_retry_interval() -> f64 {
    1.0
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (files first, environment last).
pub struct QuoterConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for QuoterConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoterConfigLoader {
    /// ```
    /// use quoter_config::QuoterConfigLoader;
    ///
    /// let cfg = QuoterConfigLoader::new()
    ///     .with_yaml_str("parser:\n  url: https://example.com\n  quote_selector: p.quote\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.timeout, 10);
    /// assert!(cfg.loop_enabled);
    /// assert_eq!(cfg.parser.source_attr, "data-source");
    /// assert_eq!(cfg.max_status_length(), 80);
    /// assert!(cfg.github.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests and doc examples).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Add the environment overlay, expand `${VAR}` placeholders and
    /// deserialize into [`QuoterConfig`].
    pub fn load(self) -> Result<QuoterConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("QUOTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
