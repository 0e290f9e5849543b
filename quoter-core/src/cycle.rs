//! One update tick: fetch, report, clip, publish, verify.
use crate::fetch::{FetchOutcome, RetryPolicy, fetch_with_retries};
use crate::format::enforce_length;
use quoter_common::Result;
use quoter_runtime::Sleeper;
use quoter_social::{StatusPublisher, Verification};
use quoter_web::{Candidate, QuotesSource};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const VERIFY_ATTEMPTS: u32 = 3;
pub const VERIFY_DELAY: Duration = Duration::from_secs(2);

const NOT_FOUND: &str = "not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    pub max_status_length: usize,
    /// Also sent as the status expiry; zero means no expiry.
    pub refresh_interval: Duration,
    pub retry: RetryPolicy,
}

/// What a successful cycle did. Failures come back as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// No usable quote on any attempt.
    NothingToPublish { attempts: u32 },
    /// Cancelled while still looking for a quote that fits; nothing was sent.
    Interrupted { attempts: u32 },
    /// A quote was found but there is no publisher to hand it to.
    ReportOnly {
        candidate: Option<Candidate>,
        message: String,
        attempts: u32,
        within_limit: bool,
    },
    Published {
        message: String,
        truncated: bool,
        attempts: u32,
        verification: Verification,
    },
}

impl CycleReport {
    pub fn message(&self) -> Option<&str> {
        match self {
            CycleReport::NothingToPublish { .. } | CycleReport::Interrupted { .. } => None,
            CycleReport::ReportOnly { message, .. } | CycleReport::Published { message, .. } => {
                Some(message.as_str())
            }
        }
    }
}

pub struct UpdateCycle<'a> {
    source: &'a dyn QuotesSource,
    publisher: Option<&'a dyn StatusPublisher>,
    sleeper: &'a dyn Sleeper,
    settings: CycleSettings,
    cancel: CancellationToken,
}

impl<'a> UpdateCycle<'a> {
    pub fn new(
        source: &'a dyn QuotesSource,
        publisher: Option<&'a dyn StatusPublisher>,
        sleeper: &'a dyn Sleeper,
        settings: CycleSettings,
    ) -> Self {
        Self {
            source,
            publisher,
            sleeper,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop retrying the source once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Run a single cycle.
    ///
    /// Source failures and failed status writes are returned as errors; a
    /// verification mismatch is reported inside [`CycleReport::Published`].
    pub async fn update_once(&self) -> Result<CycleReport> {
        let limit = self.settings.max_status_length;
        let outcome = fetch_with_retries(
            self.source,
            limit,
            &self.settings.retry,
            self.sleeper,
            &self.cancel,
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch the quotes page"))?;

        let FetchOutcome {
            candidate,
            message,
            attempts,
            within_limit,
        } = outcome;
        if !within_limit && self.cancel.is_cancelled() {
            tracing::info!(attempts, "Stopped by Ctrl+C before a quote was published");
            return Ok(CycleReport::Interrupted { attempts });
        }
        let Some(message) = message.filter(|m| !m.is_empty()) else {
            tracing::info!(attempts, "No quote found, nothing to publish");
            return Ok(CycleReport::NothingToPublish { attempts });
        };

        report_found(candidate.as_ref(), attempts, within_limit, limit);

        let Some(publisher) = self.publisher else {
            return Ok(CycleReport::ReportOnly {
                candidate,
                message,
                attempts,
                within_limit,
            });
        };

        let (message, truncated) = enforce_length(&message, limit);
        if truncated {
            tracing::warn!("Status is longer than {limit} characters and was truncated: {message}");
        }
        if publisher.is_debug() {
            tracing::info!("[debug] formatted status message: {message}");
        }

        let expires_in = self.settings.refresh_interval.as_secs();
        publisher
            .set_status(&message, None, Some(expires_in))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to update the status"))?;

        let verification = publisher
            .verify_status(&message, VERIFY_ATTEMPTS, VERIFY_DELAY)
            .await;
        if verification.matched {
            tracing::info!("Status updated and confirmed");
        } else {
            let current = verification
                .observed
                .as_ref()
                .map(|s| s.message.as_str())
                .unwrap_or("<empty>");
            tracing::warn!("Status does not match what was sent. Current value: {current}");
        }

        Ok(CycleReport::Published {
            message,
            truncated,
            attempts,
            verification,
        })
    }
}

fn report_found(candidate: Option<&Candidate>, attempts: u32, within_limit: bool, limit: usize) {
    if within_limit && attempts > 1 {
        tracing::info!("Quote found after {attempts} attempts");
    } else if !within_limit {
        tracing::warn!(
            "No quote fits in {limit} characters. Using the first result, truncating if needed"
        );
    }

    let quote = candidate
        .and_then(|c| c.quote.as_deref())
        .filter(|q| !q.is_empty())
        .unwrap_or(NOT_FOUND);
    let source = candidate
        .and_then(|c| c.source.as_deref())
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_FOUND);
    tracing::info!("QUOTE: {quote}");
    tracing::info!("SOURCE: {source}");
}
