//! The quote-to-status pipeline.
//!
//! - [`format`]: candidate to display string, and length clipping
//! - [`select`]: pick a candidate from one batch against a length budget
//! - [`fetch`]: retry the source until a batch fits or attempts run out
//! - [`cycle`]: one full update (fetch, publish, verify)
pub mod cycle;
pub mod fetch;
pub mod format;
pub mod select;

pub use cycle::{CycleReport, CycleSettings, UpdateCycle, VERIFY_ATTEMPTS, VERIFY_DELAY};
pub use fetch::{FetchOutcome, RetryPolicy, fetch_with_retries};
pub use format::{DEFAULT_STATUS_LENGTH, TRUNCATION_SUFFIX, enforce_length, format_status_message};
pub use select::select_for_length;
