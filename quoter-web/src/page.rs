//! HTML page source: GET the configured page and extract candidates from it.
use crate::extract::{ExtractionRules, extract_candidates};
use crate::{Candidate, QuotesSource};
use async_trait::async_trait;
use quoter_common::{QuoterError, Result};
use quoter_http::{HttpClient, RequestOpts};
use std::time::Duration;
use url::Url;

#[derive(Clone)]
pub struct PageQuotesSource {
    http: HttpClient,
    url: String,
    rules: ExtractionRules,
    timeout: Duration,
}

impl PageQuotesSource {
    /// Validate the page location and selectors up front.
    pub fn new(url: &str, rules: ExtractionRules, timeout: Duration) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(QuoterError::Config("quotes page url is not set".into()));
        }
        let parsed =
            Url::parse(url).map_err(|e| QuoterError::Config(format!("invalid page url `{url}`: {e}")))?;
        rules.validate()?;

        let http = HttpClient::new(parsed.as_str())
            .map_err(|e| QuoterError::Config(e.to_string()))?
            .with_timeout(timeout);
        Ok(Self {
            http,
            url: parsed.to_string(),
            rules,
            timeout,
        })
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }
}

#[async_trait]
impl QuotesSource for PageQuotesSource {
    async fn fetch_all(&self) -> Result<Vec<Candidate>> {
        let html = self
            .http
            .get_text(
                &self.url,
                RequestOpts {
                    timeout: Some(self.timeout),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QuoterError::SourceUnavailable(e.to_string()))?;

        let candidates = extract_candidates(&html, &self.rules)?;
        tracing::debug!(
            target: "quoter.web",
            url = %self.url,
            html_len = html.len(),
            candidates = candidates.len(),
            "page.extracted"
        );
        Ok(candidates)
    }

    fn location(&self) -> &str {
        &self.url
    }
}
