//! GitHub GraphQL client for the authenticated user's status.
//!
//! Writes go through the `changeUserStatus` mutation, reads through the
//! `viewer { status }` query. GitHub answers GraphQL failures with HTTP 200 and
//! an `errors` list, so every response is checked for it before the data is
//! trusted.
use crate::github::types::{
    ChangeUserStatusData, ChangeUserStatusInput, GraphQlRequest, GraphQlResponse,
    MutationVariables, STATUS_MUTATION, StatusMutation, StatusNode, VIEWER_STATUS_QUERY,
    ViewerData,
};
use crate::publisher::{RemoteStatus, StatusPublisher};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use quoter_common::{QuoterError, Result};
use quoter_http::{Auth, HttpClient, RequestOpts};
use quoter_runtime::{Sleeper, TokioSleeper};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Per-run settings for [`GithubStatusClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub token: Option<String>,
    pub api_url: String,
    pub default_emoji: Option<String>,
    pub timeout: Duration,
    pub dry_run: bool,
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: GITHUB_GRAPHQL_URL.to_string(),
            default_emoji: None,
            timeout: Duration::from_secs(10),
            dry_run: false,
            debug: false,
        }
    }
}

#[derive(Clone)]
pub struct GithubStatusClient {
    http: HttpClient,
    config: ClientConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl GithubStatusClient {
    /// A token is required unless `dry_run` is set; a client without a token
    /// always runs dry.
    pub fn new(mut config: ClientConfig) -> Result<Self> {
        config.token = config
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if config.token.is_none() && !config.dry_run {
            return Err(QuoterError::Config(
                "GitHub token is required unless dry_run is enabled".into(),
            ));
        }
        config.dry_run = config.dry_run || config.token.is_none();

        let http = HttpClient::new(&config.api_url)
            .map_err(|e| QuoterError::Config(format!("invalid GraphQL endpoint: {e}")))?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            config,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the mutation body without sending it.
    pub fn build_request(
        &self,
        message: &str,
        emoji: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> StatusMutation {
        let emoji = emoji
            .filter(|e| !e.is_empty())
            .or(self.config.default_emoji.as_deref().filter(|e| !e.is_empty()))
            .map(str::to_string);
        let expires_at = expires_in_secs
            .filter(|secs| *secs > 0)
            .map(|secs| expiry_timestamp(Utc::now(), secs));

        GraphQlRequest {
            query: STATUS_MUTATION,
            variables: Some(MutationVariables {
                input: ChangeUserStatusInput {
                    message: message.to_string(),
                    emoji,
                    expires_at,
                },
            }),
        }
    }

    /// Send one GraphQL document. `Ok(None)` when the response carries
    /// neither errors nor data.
    async fn post<B, T>(&self, body: &B, label: &'static str) -> Result<Option<T>>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        // Token presence is guaranteed outside dry-run by the constructor.
        let token = self.config.token.as_deref().unwrap_or_default();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let raw: Value = self
            .http
            .post_json_opts(
                &self.config.api_url,
                body,
                RequestOpts {
                    timeout: Some(self.config.timeout),
                    auth: Some(Auth::Bearer(token)),
                    headers: Some(headers),
                    allow_absolute: true,
                },
            )
            .await
            .map_err(|e| QuoterError::Remote(format!("GitHub API request failed: {e}")))?;

        if self.config.debug {
            tracing::info!(target: "quoter.status", response = %raw, "[debug] {label} response");
        } else {
            tracing::debug!(target: "quoter.status", response = %raw, "{label} response");
        }

        let envelope: GraphQlResponse<T> = serde_json::from_value(raw)
            .map_err(|e| QuoterError::Remote(format!("unexpected GitHub API payload: {e}")))?;
        if let Some(errors) = envelope.errors.filter(|errs| !errs.is_empty()) {
            let joined = errors
                .iter()
                .map(|e| match &e.kind {
                    Some(kind) => format!("{kind}: {}", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(QuoterError::Remote(format!("GitHub API errors: {joined}")));
        }
        Ok(envelope.data)
    }
}

/// `now + secs` as ISO-8601 UTC with a `Z` suffix.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use quoter_social::github::client::expiry_timestamp;
///
/// let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
/// assert_eq!(expiry_timestamp(now, 90), "2025-01-01T00:01:30Z");
/// ```
pub fn expiry_timestamp(now: DateTime<Utc>, secs: u64) -> String {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    let at = chrono::Duration::try_seconds(secs)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn to_remote(node: StatusNode) -> RemoteStatus {
    let expires_at = node.expires_at.as_deref().and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| tracing::warn!(raw, error = %e, "status.expires_at.unparseable"))
            .ok()
    });
    RemoteStatus {
        message: node.message.unwrap_or_default(),
        emoji: node.emoji,
        expires_at,
    }
}

#[async_trait]
impl StatusPublisher for GithubStatusClient {
    async fn set_status(
        &self,
        message: &str,
        emoji: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<Option<RemoteStatus>> {
        if message.is_empty() {
            return Err(QuoterError::Config("status message is required".into()));
        }

        let request = self.build_request(message, emoji, expires_in_secs);
        let payload = serde_json::to_string(&request).unwrap_or_default();
        if self.config.debug {
            tracing::info!(target: "quoter.status", %payload, "[debug] prepared status payload");
        }

        if self.config.dry_run {
            let pretty = serde_json::to_string_pretty(&request).unwrap_or(payload);
            tracing::info!("[dry-run] Would send status mutation:\n{pretty}");
            return Ok(None);
        }

        let data: Option<ChangeUserStatusData> = self.post(&request, "changeUserStatus").await?;
        let status = data
            .and_then(|d| d.change_user_status)
            .and_then(|p| p.status)
            .ok_or_else(|| QuoterError::Remote("GitHub API returned empty status".into()))?;
        Ok(Some(to_remote(status)))
    }

    async fn fetch_status(&self) -> Result<Option<RemoteStatus>> {
        if self.config.dry_run {
            tracing::info!("[dry-run] Would request current status");
            return Ok(None);
        }

        let request: GraphQlRequest<()> = GraphQlRequest {
            query: VIEWER_STATUS_QUERY,
            variables: None,
        };
        let data: Option<ViewerData> = self.post(&request, "viewer status").await?;
        Ok(data
            .and_then(|d| d.viewer)
            .and_then(|v| v.status)
            .map(to_remote))
    }

    fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    fn is_debug(&self) -> bool {
        self.config.debug
    }

    fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }
}
