//! Error display classification.
//!
//! The pipeline itself propagates `anyhow` errors untouched. This module is
//! for the outermost layer, which has to decide between the invalid-JSON
//! message (with upstream parser detail), a raw message shown as-is, and a
//! generic fallback.

use anyhow::Error;

/// Prefix the armory client puts on errors when an upstream body fails to
/// parse as JSON.
pub const INVALID_JSON_PREFIX: &str = "Invalid JSON response:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream body was not JSON; carries the parser detail.
    InvalidJson { detail: String },
    /// Anything else with a printable message.
    Message(String),
    /// No usable message at all.
    Unexpected,
}

pub fn classify(error: &Error) -> ErrorKind {
    let message = error.to_string();
    if let Some(rest) = message.strip_prefix(INVALID_JSON_PREFIX) {
        return ErrorKind::InvalidJson {
            detail: rest.trim().to_string(),
        };
    }
    if message.trim().is_empty() {
        ErrorKind::Unexpected
    } else {
        ErrorKind::Message(message)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_invalid_json_errors_carry_detail() {
        let err = anyhow!("{} expected value at line 1 column 1", INVALID_JSON_PREFIX);
        assert_eq!(
            classify(&err),
            ErrorKind::InvalidJson {
                detail: "expected value at line 1 column 1".to_string()
            }
        );
    }

    #[test]
    fn test_plain_messages_pass_through() {
        let err = anyhow!("connection refused");
        assert_eq!(
            classify(&err),
            ErrorKind::Message("connection refused".to_string())
        );
    }

    #[test]
    fn test_blank_message_is_unexpected() {
        let err = anyhow!("   ");
        assert_eq!(classify(&err), ErrorKind::Unexpected);
    }
}
