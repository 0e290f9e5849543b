//! The retrying fetch loop: ask the source again until a batch yields a
//! message that fits, or the attempt cap runs out.
use crate::format::display_len;
use crate::select::select_for_length;
use quoter_common::Result;
use quoter_runtime::{Sleeper, sleep_or_cancel};
use quoter_web::{Candidate, QuotesSource};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 0 means unlimited.
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            retry_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub candidate: Option<Candidate>,
    pub message: Option<String>,
    pub attempts: u32,
    pub within_limit: bool,
}

/// Run the source until a batch yields a message of at most `limit` chars.
///
/// Source failures propagate immediately; only empty or over-limit batches
/// are retried. When the cap is hit or `cancel` fires, the first usable
/// selection seen on any attempt is returned with `within_limit = false`.
pub async fn fetch_with_retries(
    source: &dyn QuotesSource,
    limit: usize,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<FetchOutcome> {
    let mut attempts: u32 = 0;
    let mut fallback: Option<(Candidate, String)> = None;

    loop {
        attempts = attempts.saturating_add(1);
        let batch = source.fetch_all().await?;
        tracing::debug!(
            target: "quoter.fetch",
            attempt = attempts,
            candidates = batch.len(),
            source = source.location(),
            "fetch.attempt"
        );

        if let Some((candidate, message)) = select_for_length(&batch, limit) {
            if display_len(&message) <= limit {
                return Ok(FetchOutcome {
                    candidate: Some(candidate),
                    message: Some(message),
                    attempts,
                    within_limit: true,
                });
            }
            if fallback.is_none() {
                fallback = Some((candidate, message));
            }
        }

        if policy.max_attempts > 0 && attempts >= policy.max_attempts {
            break;
        }
        if cancel.is_cancelled() {
            tracing::info!(target: "quoter.fetch", attempts, "fetch.cancelled");
            break;
        }
        if !policy.retry_interval.is_zero()
            && !sleep_or_cancel(sleeper, policy.retry_interval, cancel).await
        {
            tracing::info!(target: "quoter.fetch", attempts, "fetch.cancelled");
            break;
        }
    }

    let (candidate, message) = fallback.unzip();
    Ok(FetchOutcome {
        candidate,
        message,
        attempts,
        within_limit: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quoter_common::QuoterError;
    use quoter_runtime::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Hands out scripted batches in order, repeating the last one.
    struct ScriptedSource {
        batches: Vec<Result<Vec<Candidate>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Result<Vec<Candidate>>>) -> Self {
            Self {
                batches,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuotesSource for ScriptedSource {
        async fn fetch_all(&self) -> Result<Vec<Candidate>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let idx = n.min(self.batches.len() - 1);
            self.batches[idx].clone()
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            retry_interval: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn returns_on_second_attempt_after_one_sleep() {
        let source = ScriptedSource::new(vec![
            Ok(vec![Candidate::new("x".repeat(100), None)]),
            Ok(vec![Candidate::new("короткая", None)]),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy(5),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.within_limit);
        assert_eq!(outcome.message.as_deref(), Some("\"короткая\""));
        assert_eq!(sleeper.calls(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn cap_returns_first_attempts_fallback() {
        let source = ScriptedSource::new(vec![
            Ok(vec![Candidate::new("a".repeat(100), Some("First"))]),
            Ok(vec![Candidate::new("b".repeat(100), Some("Second"))]),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy(2),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(source.calls(), 2);
        assert!(!outcome.within_limit);
        assert_eq!(
            outcome.candidate.and_then(|c| c.source).as_deref(),
            Some("First")
        );
        assert_eq!(sleeper.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_batches_leave_nothing() {
        let source = ScriptedSource::new(vec![Ok(vec![])]);
        let sleeper = RecordingSleeper::default();

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy(3),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.candidate, None);
        assert_eq!(outcome.message, None);
        assert!(!outcome.within_limit);
    }

    #[tokio::test]
    async fn source_failure_aborts_without_retry() {
        let source = ScriptedSource::new(vec![Err(QuoterError::SourceUnavailable("down".into()))]);
        let sleeper = RecordingSleeper::default();

        let err = fetch_with_retries(
            &source,
            80,
            &policy(0),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, QuoterError::SourceUnavailable(_)));
        assert_eq!(source.calls(), 1);
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn unlimited_attempts_keep_going_until_a_fit() {
        let mut batches: Vec<Result<Vec<Candidate>>> =
            (0..6).map(|_| Ok(vec![Candidate::new("z".repeat(90), None)])).collect();
        batches.push(Ok(vec![Candidate::new("fits", None)]));
        let source = ScriptedSource::new(batches);
        let sleeper = RecordingSleeper::default();

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy(0),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 7);
        assert!(outcome.within_limit);
        assert_eq!(sleeper.calls().len(), 6);
    }

    #[tokio::test]
    async fn zero_interval_skips_sleeping() {
        let source = ScriptedSource::new(vec![Ok(vec![Candidate::new("q".repeat(90), None)])]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            retry_interval: Duration::ZERO,
        };

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy,
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_ends_unlimited_loop_with_fallback() {
        let source =
            ScriptedSource::new(vec![Ok(vec![Candidate::new("v".repeat(90), Some("Kept"))])]);
        let sleeper = RecordingSleeper::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = fetch_with_retries(&source, 80, &policy(0), &sleeper, &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.within_limit);
        assert_eq!(outcome.candidate.and_then(|c| c.source).as_deref(), Some("Kept"));
    }

    #[tokio::test]
    async fn cancellation_during_retries_stops_after_current_attempt() {
        /// Cancels the token on its third call; never yields a usable quote.
        struct CancellingSource {
            calls: AtomicU32,
            cancel: CancellationToken,
        }

        #[async_trait]
        impl QuotesSource for CancellingSource {
            async fn fetch_all(&self) -> Result<Vec<Candidate>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    self.cancel.cancel();
                }
                Ok(vec![])
            }
        }

        let cancel = CancellationToken::new();
        let source = CancellingSource {
            calls: AtomicU32::new(0),
            cancel: cancel.clone(),
        };
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 0,
            retry_interval: Duration::ZERO,
        };

        let outcome = fetch_with_retries(&source, 80, &policy, &sleeper, &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.candidate, None);
        assert!(!outcome.within_limit);
    }

    #[tokio::test]
    async fn fallback_survives_later_empty_batches() {
        let source = ScriptedSource::new(vec![
            Ok(vec![Candidate::new("w".repeat(90), Some("Kept"))]),
            Ok(vec![]),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = fetch_with_retries(
            &source,
            80,
            &policy(3),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!outcome.within_limit);
        assert_eq!(outcome.candidate.and_then(|c| c.source).as_deref(), Some("Kept"));
    }
}
