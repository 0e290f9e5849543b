//! Quote acquisition: the [`QuotesSource`] capability and its HTML-page
//! implementation.
//!
//! - [`Candidate`]: one quote/author pair as found on the page
//! - [`extract`]: pure CSS-selector extraction over an HTML document
//! - [`page`]: fetch a page over HTTP and run the extraction
use async_trait::async_trait;
use quoter_common::Result;
use serde::{Deserialize, Serialize};

pub mod extract;
pub mod page;

pub use extract::ExtractionRules;
pub use page::PageQuotesSource;

/// A quote/author pair produced by a source. Never mutated after extraction;
/// a candidate without a quote is unusable and gets skipped by selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub quote: Option<String>,
    pub source: Option<String>,
}

impl Candidate {
    pub fn new(quote: impl Into<String>, source: Option<&str>) -> Self {
        Self {
            quote: Some(quote.into()),
            source: source.map(str::to_string),
        }
    }
}

/// Anything that can list the quote candidates available right now.
///
/// Transport or parse failures surface as `QuoterError::SourceUnavailable`;
/// an empty list is a valid answer.
#[async_trait]
pub trait QuotesSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Candidate>>;

    /// Human-readable location, used in log lines.
    fn location(&self) -> &str {
        "<quotes source>"
    }
}
