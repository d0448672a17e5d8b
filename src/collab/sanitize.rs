//! # Message sanitization contract.
//!
//! Sanitization is the first vetting pass over citizen text and the only one
//! that **fails closed**: if the sanitizer cannot produce a cleaned string,
//! the message is rejected — a sanitizer bug must not leak raw text into a
//! turn. (Moderation, by contrast, fails open; see
//! [`Moderate`](crate::collab::Moderate).)
//!
//! The trait is synchronous: sanitization is pure string work, with no I/O.

/// Result of a sanitization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    /// The message is acceptable; `0` holds the cleaned text to use in place
    /// of the raw input.
    Clean(String),
    /// The message is rejected outright.
    Rejected {
        /// Classifier category (e.g. `length`, `injection`).
        category: String,
        /// Human-readable reason handed back to the presentation layer.
        reason: String,
    },
}

/// Contract for the sanitization collaborator.
pub trait Sanitize: Send + Sync + 'static {
    /// Cleans `raw` or rejects it. Must not perform I/O.
    fn sanitize(&self, raw: &str) -> SanitizeOutcome;
}

/// Minimal reference sanitizer: bounds length, strips control characters,
/// collapses surrounding whitespace, and rejects empty results.
///
/// Real deployments plug in a full scrubber (URL/markup/injection stripping);
/// this implementation only guarantees the invariants the arbiter itself
/// relies on — bounded, non-empty, printable text.
pub struct LengthSanitizer {
    /// Maximum accepted length in characters.
    pub max_chars: usize,
}

impl Default for LengthSanitizer {
    fn default() -> Self {
        Self { max_chars: 1_000 }
    }
}

impl Sanitize for LengthSanitizer {
    fn sanitize(&self, raw: &str) -> SanitizeOutcome {
        if raw.chars().count() > self.max_chars {
            return SanitizeOutcome::Rejected {
                category: "length".to_string(),
                reason: format!("messages are limited to {} characters", self.max_chars),
            };
        }
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_control() || *c == '\n')
            .collect();
        let cleaned = cleaned.trim().to_string();
        if cleaned.is_empty() {
            return SanitizeOutcome::Rejected {
                category: "empty".to_string(),
                reason: "message is empty".to_string(),
            };
        }
        SanitizeOutcome::Clean(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_strips_controls() {
        let s = LengthSanitizer::default();
        match s.sanitize("  hello\u{0007} there  ") {
            SanitizeOutcome::Clean(text) => assert_eq!(text, "hello there"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_over_length() {
        let s = LengthSanitizer { max_chars: 4 };
        assert!(matches!(
            s.sanitize("hello"),
            SanitizeOutcome::Rejected { category, .. } if category == "length"
        ));
    }

    #[test]
    fn test_rejects_effectively_empty() {
        let s = LengthSanitizer::default();
        assert!(matches!(
            s.sanitize(" \u{0000} "),
            SanitizeOutcome::Rejected { category, .. } if category == "empty"
        ));
    }
}
