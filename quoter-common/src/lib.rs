//! Types and utilities shared across the quoter crates.
//!
//! This crate holds the error kinds every stage of an update cycle reports,
//! plus the observability bootstrap. It stays dependency-light so the web
//! source, the status client and the orchestrator can all depend on it.
//!
//! # Overview
//!
//! - [`QuoterError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use quoter_common::QuoterError;
//!
//! let err = QuoterError::Config("status message is required".into());
//! assert_eq!(err.to_string(), "Configuration error: status message is required");
//! ```
pub mod observability;

/// Error kinds raised while fetching, publishing or wiring a cycle.
///
/// A verification mismatch is not represented here: it is a reported outcome,
/// not a failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoterError {
    /// The quotes page could not be fetched or parsed.
    #[error("Quotes source unavailable: {0}")]
    SourceUnavailable(String),

    /// Invalid usage or incomplete configuration (empty message, missing token, bad selector).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The status service rejected a request or returned an unusable payload.
    #[error("Status service error: {0}")]
    Remote(String),
}

/// Convenient alias for results that use [`QuoterError`].
pub type Result<T> = std::result::Result<T, QuoterError>;
