use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quoter_common::Result;
use quoter_runtime::Sleeper;
use serde::Serialize;
use std::time::Duration;

/// The status as the remote service currently reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStatus {
    pub message: String,
    pub emoji: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of polling the service for a just-written message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub matched: bool,
    /// What the last successful poll returned.
    pub observed: Option<RemoteStatus>,
}

/// Write/read access to a single status destination.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Publish `message`. `emoji` overrides the configured default; the expiry
    /// is only sent for a positive number of seconds. Dry-run returns `Ok(None)`.
    async fn set_status(
        &self,
        message: &str,
        emoji: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<Option<RemoteStatus>>;

    /// Read the current status; `Ok(None)` when none is set or in dry-run.
    async fn fetch_status(&self) -> Result<Option<RemoteStatus>>;

    fn is_dry_run(&self) -> bool;

    fn is_debug(&self) -> bool {
        false
    }

    /// Delays between verification polls go through here.
    fn sleeper(&self) -> &dyn Sleeper;

    /// Poll [`StatusPublisher::fetch_status`] until it reports `expected`.
    ///
    /// Runs at least once; sleeps `delay` between non-matching polls but not
    /// after the last. A failed read is logged and treated as a mismatch for
    /// that poll. Dry-run has nothing to verify and reports a match.
    async fn verify_status(&self, expected: &str, attempts: u32, delay: Duration) -> Verification {
        if self.is_dry_run() {
            return Verification {
                matched: true,
                observed: None,
            };
        }

        let attempts = attempts.max(1);
        let mut observed = None;
        for attempt in 1..=attempts {
            match self.fetch_status().await {
                Ok(Some(status)) if status.message == expected => {
                    return Verification {
                        matched: true,
                        observed: Some(status),
                    };
                }
                Ok(status) => observed = status,
                Err(err) => {
                    tracing::warn!(attempt, attempts, error = %err, "status.verify.read_failed");
                }
            }

            if attempt < attempts {
                self.sleeper().sleep(delay).await;
            }
        }

        Verification {
            matched: false,
            observed,
        }
    }
}
