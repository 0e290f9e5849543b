//! CSS-selector extraction of quote candidates from an HTML document.
use crate::Candidate;
use quoter_common::{QuoterError, Result};
use scraper::{ElementRef, Html, Selector};

/// Selector configuration for one quotes page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRules {
    pub quote_selector: String,
    pub source_selector: Option<String>,
    /// Attribute carrying the author on the source element; `None` reads the
    /// element's text instead.
    pub source_attr: Option<String>,
    /// When set, every matching block yields one candidate.
    pub block_selector: Option<String>,
}

impl ExtractionRules {
    pub fn new(quote_selector: impl Into<String>) -> Self {
        Self {
            quote_selector: quote_selector.into(),
            source_selector: None,
            source_attr: Some("data-source".into()),
            block_selector: None,
        }
    }

    pub fn with_source(mut self, selector: impl Into<String>, attr: Option<&str>) -> Self {
        self.source_selector = Some(selector.into());
        self.source_attr = attr.filter(|a| !a.trim().is_empty()).map(str::to_string);
        self
    }

    pub fn with_block(mut self, selector: impl Into<String>) -> Self {
        self.block_selector = Some(selector.into());
        self
    }

    /// Compile every selector once so bad configuration fails at startup.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Compiled> {
        if self.quote_selector.trim().is_empty() {
            return Err(QuoterError::Config("quote selector is empty".into()));
        }
        Ok(Compiled {
            quote: parse_selector(&self.quote_selector)?,
            source: optional_selector(self.source_selector.as_deref())?,
            block: optional_selector(self.block_selector.as_deref())?,
            source_attr: self.source_attr.clone(),
        })
    }
}

struct Compiled {
    quote: Selector,
    source: Option<Selector>,
    block: Option<Selector>,
    source_attr: Option<String>,
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| QuoterError::Config(format!("invalid selector `{raw}`: {e}")))
}

fn optional_selector(raw: Option<&str>) -> Result<Option<Selector>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_selector(s).map(Some),
        None => Ok(None),
    }
}

/// Extract every candidate the rules find in `html`.
///
/// ```
/// use quoter_web::{extract::extract_candidates, ExtractionRules};
///
/// let html = r#"<div class="q"><p>Stay&nbsp;hungry</p><a data-source="Jobs"></a></div>"#;
/// let rules = ExtractionRules::new("div.q p").with_source("div.q a", Some("data-source"));
/// let found = extract_candidates(html, &rules).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].quote.as_deref(), Some("Stay hungry"));
/// assert_eq!(found[0].source.as_deref(), Some("Jobs"));
/// ```
pub fn extract_candidates(html: &str, rules: &ExtractionRules) -> Result<Vec<Candidate>> {
    let compiled = rules.compile()?;
    let doc = Html::parse_document(html);

    let candidates = match &compiled.block {
        Some(block) => doc
            .select(block)
            .map(|el| candidate_within(el, &compiled))
            .filter(|c| c.quote.is_some() || c.source.is_some())
            .collect(),
        None => {
            let root = doc.root_element();
            let c = candidate_within(root, &compiled);
            if c.quote.is_some() || c.source.is_some() {
                vec![c]
            } else {
                Vec::new()
            }
        }
    };
    Ok(candidates)
}

fn candidate_within(scope: ElementRef<'_>, compiled: &Compiled) -> Candidate {
    let quote = scope
        .select(&compiled.quote)
        .next()
        .map(|el| normalize_text(el.text()))
        .filter(|q| !q.is_empty());

    let source = compiled.source.as_ref().and_then(|sel| {
        let el = scope.select(sel).next()?;
        let raw = match compiled.source_attr.as_deref() {
            Some(attr) => el.value().attr(attr)?.to_string(),
            None => normalize_text(el.text()),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Candidate { quote, source }
}

/// Join text nodes with single spaces, collapsing all whitespace (NBSP included).
fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
