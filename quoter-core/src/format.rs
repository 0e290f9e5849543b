//! Status formatting: candidate to display string, display string to a
//! length-limited one.
use quoter_web::Candidate;

pub const DEFAULT_STATUS_LENGTH: usize = 80;
pub const TRUNCATION_SUFFIX: &str = "...";

/// `"<quote>" — <source>`, or `"<quote>"` without a source.
///
/// Returns `None` when the candidate has no usable quote.
///
/// ```
/// use quoter_core::format::format_status_message;
/// use quoter_web::Candidate;
///
/// let c = Candidate::new("Less is more.", Some("Mies"));
/// assert_eq!(format_status_message(&c).as_deref(), Some("\"Less is more.\" — Mies"));
/// assert_eq!(format_status_message(&Candidate::default()), None);
/// ```
pub fn format_status_message(candidate: &Candidate) -> Option<String> {
    let quote = candidate.quote.as_deref().filter(|q| !q.is_empty())?;
    Some(match candidate.source.as_deref().filter(|s| !s.is_empty()) {
        Some(source) => format!("\"{quote}\" — {source}"),
        None => format!("\"{quote}\""),
    })
}

/// Number of characters the limit is checked against.
pub fn display_len(message: &str) -> usize {
    message.chars().count()
}

/// Clip `message` to at most `limit` characters.
///
/// A limit of 0 means [`DEFAULT_STATUS_LENGTH`]. Above the suffix length the
/// clipped text is right-trimmed and ends with [`TRUNCATION_SUFFIX`]; at or
/// below it the result is a plain prefix.
pub fn enforce_length(message: &str, limit: usize) -> (String, bool) {
    let limit = if limit == 0 { DEFAULT_STATUS_LENGTH } else { limit };
    if display_len(message) <= limit {
        return (message.to_string(), false);
    }

    let suffix_len = display_len(TRUNCATION_SUFFIX);
    if limit <= suffix_len {
        return (message.chars().take(limit).collect(), true);
    }

    let head: String = message.chars().take(limit - suffix_len).collect();
    (format!("{}{TRUNCATION_SUFFIX}", head.trim_end()), true)
}
