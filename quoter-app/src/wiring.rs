//! Turn a loaded [`QuoterConfig`] into the pieces one update cycle needs.
use anyhow::{Context, Result};
use quoter_config::{QuoterConfig, resolve_credential};
use quoter_core::{CycleSettings, RetryPolicy};
use quoter_social::{ClientConfig, GithubStatusClient, StatusPublisher};
use quoter_web::{ExtractionRules, PageQuotesSource};
use std::time::Duration;

/// How the status destination ended up after reading the config.
pub enum PublisherSetup {
    /// No `github` section, or `enabled: false`.
    Disabled,
    /// Enabled, but the client cannot be built (no token and not dry-run).
    Misconfigured { reason: String },
    Ready(GithubStatusClient),
}

impl PublisherSetup {
    /// `env_token` is the value of the token override variable, if set.
    pub fn from_config(cfg: &QuoterConfig, env_token: Option<String>) -> Self {
        let Some(github) = cfg.github.as_ref().filter(|g| g.enabled) else {
            return PublisherSetup::Disabled;
        };

        let client_cfg = ClientConfig {
            token: resolve_credential(env_token, github.token.as_deref()),
            api_url: github.endpoint().to_string(),
            default_emoji: github.emoji.clone().filter(|e| !e.is_empty()),
            timeout: Duration::from_secs(github.timeout.unwrap_or(cfg.timeout).max(1)),
            dry_run: github.dry_run,
            debug: cfg.debug,
        };
        match GithubStatusClient::new(client_cfg) {
            Ok(client) => PublisherSetup::Ready(client),
            Err(err) => PublisherSetup::Misconfigured {
                reason: err.to_string(),
            },
        }
    }

    pub fn publisher(&self) -> Option<&dyn StatusPublisher> {
        match self {
            PublisherSetup::Ready(client) => Some(client as &dyn StatusPublisher),
            _ => None,
        }
    }

    /// A misconfigured publisher would fail the same way every cycle.
    pub fn forces_single_run(&self) -> bool {
        matches!(self, PublisherSetup::Misconfigured { .. })
    }

    pub fn describe(&self) {
        match self {
            PublisherSetup::Disabled => {
                tracing::info!("GitHub status publishing is disabled, quotes are only reported")
            }
            PublisherSetup::Misconfigured { reason } => tracing::warn!(
                %reason,
                "GitHub token is not set, the status will not be updated; running once"
            ),
            PublisherSetup::Ready(client) if client.is_dry_run() => {
                tracing::info!("GitHub status client ready (dry-run)")
            }
            PublisherSetup::Ready(client) => tracing::info!(
                endpoint = %client.config().api_url,
                "GitHub status client ready"
            ),
        }
    }
}

pub fn build_source(cfg: &QuoterConfig) -> Result<PageQuotesSource> {
    let parser = &cfg.parser;
    let mut rules = ExtractionRules::new(parser.quote_selector.clone());
    if let Some(sel) = parser.source_selector.as_deref().filter(|s| !s.trim().is_empty()) {
        rules = rules.with_source(sel, Some(parser.source_attr.as_str()));
    }
    if let Some(sel) = parser.block_selector.as_deref().filter(|s| !s.trim().is_empty()) {
        rules = rules.with_block(sel);
    }
    PageQuotesSource::new(&parser.url, rules, cfg.network_timeout())
        .with_context(|| format!("invalid parser configuration for {}", parser.url))
}

/// Seconds between cycles after accounting for the publisher state.
pub fn effective_refresh(cfg: &QuoterConfig, setup: &PublisherSetup) -> Duration {
    if setup.forces_single_run() {
        return Duration::ZERO;
    }
    Duration::from_secs(cfg.refresh_interval())
}

pub fn cycle_settings(cfg: &QuoterConfig, refresh_interval: Duration) -> CycleSettings {
    CycleSettings {
        max_status_length: cfg.max_status_length(),
        refresh_interval,
        retry: RetryPolicy {
            max_attempts: cfg.parser.max_attempts(),
            retry_interval: cfg.parser.retry_interval(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoter_config::QuoterConfigLoader;

    fn load(yaml: &str) -> QuoterConfig {
        temp_env::with_vars_unset(
            ["QUOTER__GITHUB__TOKEN", "QUOTER__GITHUB__DRY_RUN", "QUOTER__LOOP"],
            || QuoterConfigLoader::new().with_yaml_str(yaml).load().unwrap(),
        )
    }

    const PARSER: &str = r#"
parser:
  url: "https://citaty.info/random"
  quote_selector: "div.field-name-body a > p"
  source_selector: "div.field-name-field-source a"
  block_selector: "div.node-quote"
  max_attempts: 5
  retry_interval_seconds: 0.5
"#;

    #[test]
    fn no_github_section_is_disabled() {
        let cfg = load(PARSER);
        let setup = PublisherSetup::from_config(&cfg, None);
        assert!(matches!(setup, PublisherSetup::Disabled));
        assert!(setup.publisher().is_none());
        assert!(!setup.forces_single_run());
    }

    #[test]
    fn explicitly_disabled_github_is_disabled() {
        let cfg = load(&format!("{PARSER}github:\n  enabled: false\n  token: abc\n"));
        assert!(matches!(
            PublisherSetup::from_config(&cfg, None),
            PublisherSetup::Disabled
        ));
    }

    #[test]
    fn missing_token_is_misconfigured_and_runs_once() {
        let cfg = load(&format!(
            "{PARSER}refresh_interval_seconds: 600\ngithub:\n  enabled: true\n"
        ));
        let setup = PublisherSetup::from_config(&cfg, None);
        assert!(matches!(setup, PublisherSetup::Misconfigured { .. }));
        assert!(setup.publisher().is_none());
        assert_eq!(effective_refresh(&cfg, &setup), Duration::ZERO);
    }

    #[test]
    fn env_token_makes_client_ready() {
        let cfg = load(&format!(
            "{PARSER}refresh_interval_seconds: 600\ngithub:\n  emoji: \":books:\"\n"
        ));
        let setup = PublisherSetup::from_config(&cfg, Some("ghp_env".into()));
        let PublisherSetup::Ready(client) = &setup else {
            panic!("expected a ready client");
        };
        assert_eq!(client.config().token.as_deref(), Some("ghp_env"));
        assert_eq!(client.config().default_emoji.as_deref(), Some(":books:"));
        assert!(!client.is_dry_run());
        assert_eq!(effective_refresh(&cfg, &setup), Duration::from_secs(600));
    }

    #[test]
    fn dry_run_without_token_is_ready() {
        let cfg = load(&format!("{PARSER}github:\n  dry_run: true\n"));
        let setup = PublisherSetup::from_config(&cfg, None);
        assert!(setup.publisher().is_some_and(|p| p.is_dry_run()));
    }

    #[test]
    fn loop_disabled_means_single_run() {
        let cfg = load(&format!("{PARSER}loop: false\nrefresh_interval_seconds: 600\n"));
        let setup = PublisherSetup::from_config(&cfg, None);
        assert_eq!(effective_refresh(&cfg, &setup), Duration::ZERO);
    }

    #[test]
    fn cycle_settings_follow_config() {
        let cfg = load(&format!("{PARSER}github:\n  max_status_length: 60\n  dry_run: true\n"));
        let settings = cycle_settings(&cfg, Duration::from_secs(30));
        assert_eq!(settings.max_status_length, 60);
        assert_eq!(settings.refresh_interval, Duration::from_secs(30));
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.retry_interval, Duration::from_millis(500));
    }

    #[test]
    fn source_is_built_from_parser_section() {
        let cfg = load(PARSER);
        let source = build_source(&cfg).unwrap();
        assert_eq!(source.rules().block_selector.as_deref(), Some("div.node-quote"));
        assert_eq!(source.rules().source_attr.as_deref(), Some("data-source"));
    }

    #[test]
    fn bad_selector_is_rejected() {
        let cfg = load("parser:\n  url: https://example.com\n  quote_selector: \"p[[\"\n");
        assert!(build_source(&cfg).is_err());
    }
}
