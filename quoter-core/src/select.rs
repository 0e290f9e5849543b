use crate::format::{display_len, format_status_message};
use quoter_web::Candidate;

/// Pick the earliest candidate whose message fits `limit`, else the earliest
/// usable one. `None` when no candidate has a quote.
///
/// ```
/// use quoter_core::select::select_for_length;
/// use quoter_web::Candidate;
///
/// let batch = vec![
///     Candidate::new("x".repeat(100), Some("Long")),
///     Candidate::new("короткая", Some("Автор")),
/// ];
/// let (entry, message) = select_for_length(&batch, 80).unwrap();
/// assert_eq!(entry.source.as_deref(), Some("Автор"));
/// assert_eq!(message, "\"короткая\" — Автор");
/// ```
pub fn select_for_length(candidates: &[Candidate], limit: usize) -> Option<(Candidate, String)> {
    let mut fallback = None;
    for candidate in candidates {
        let Some(message) = format_status_message(candidate) else {
            continue;
        };
        if display_len(&message) <= limit {
            return Some((candidate.clone(), message));
        }
        if fallback.is_none() {
            fallback = Some((candidate.clone(), message));
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_first_fitting_candidate() {
        let batch = vec![
            Candidate::new("x".repeat(100), Some("Long")),
            Candidate::new("короткая", Some("Автор")),
            Candidate::new("also short", None),
        ];
        let (entry, message) = select_for_length(&batch, 80).unwrap();
        assert_eq!(entry, batch[1]);
        assert!(display_len(&message) <= 80);
    }

    #[test]
    fn falls_back_to_first_usable_candidate() {
        let batch = vec![
            Candidate::new("a".repeat(120), None),
            Candidate::new("b".repeat(110), None),
        ];
        let (entry, message) = select_for_length(&batch, 20).unwrap();
        assert_eq!(entry, batch[0]);
        assert!(message.starts_with('"'));
    }

    #[test]
    fn skips_candidates_without_quote() {
        let batch = vec![
            Candidate {
                quote: None,
                source: Some("Nobody".into()),
            },
            Candidate::new("", Some("Empty")),
            Candidate::new("y".repeat(50), Some("Real")),
        ];
        let (entry, _) = select_for_length(&batch, 10).unwrap();
        assert_eq!(entry.source.as_deref(), Some("Real"));
    }

    #[test]
    fn nothing_usable_yields_none() {
        assert!(select_for_length(&[], 80).is_none());
        assert!(select_for_length(&[Candidate::default()], 80).is_none());
    }
}
