//! Runtime plumbing for the quoter binary: a single-threaded tokio runtime,
//! a shared cancellation token wired to Ctrl+C, and the [`Sleeper`] seam every
//! retry/verify delay goes through.
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

/// Something that can wait. Production code uses [`TokioSleeper`]; tests swap
/// in [`RecordingSleeper`] to count delays without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, dur: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// Records requested delays and returns immediately.
///
/// ```
/// use quoter_runtime::{RecordingSleeper, Sleeper};
/// use std::time::Duration;
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let sleeper = RecordingSleeper::default();
/// rt.block_on(sleeper.sleep(Duration::from_secs(2)));
/// assert_eq!(sleeper.calls(), vec![Duration::from_secs(2)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, dur: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(dur);
        }
    }
}

/// Wait for `dur` unless `cancel` fires first. Returns `false` when cancelled.
pub async fn sleep_or_cancel(
    sleeper: &dyn Sleeper,
    dur: Duration,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleeper.sleep(dur) => !cancel.is_cancelled(),
    }
}

pub struct QuoterRuntime {
    runtime: Runtime,
    cancel: CancellationToken,
}

impl QuoterRuntime {
    /// Build the current-thread runtime the update loop runs on.
    ///
    /// ```
    /// use quoter_runtime::QuoterRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = QuoterRuntime::build("doctest-runtime").expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name(thread_name)
            .build()?;
        Ok(Self {
            runtime,
            cancel: CancellationToken::new(),
        })
    }

    /// Token cancelled on Ctrl+C (after [`QuoterRuntime::cancel_on_ctrl_c`]) or shutdown.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a watcher that cancels the shared token on the first Ctrl+C.
    pub fn cancel_on_ctrl_c(&self) {
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl+C received, stopping");
                cancel.cancel();
            }
        });
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}
