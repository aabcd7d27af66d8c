//! Free-text fields
//!
//! Trimmed, length-checked in characters, control characters rejected
//! (newlines and tabs are allowed in long text).

use crate::error::{MarketError, MarketResult};

pub fn bounded(field: &str, raw: &str, min: usize, max: usize) -> MarketResult<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();

    if len < min {
        return Err(if min <= 1 {
            MarketError::bad_input(format!("{field} is required"))
        } else {
            MarketError::bad_input(format!("{field} must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(MarketError::bad_input(format!(
            "{field} must be at most {max} characters"
        )));
    }
    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(MarketError::bad_input(format!("{field} contains invalid characters")));
    }

    Ok(trimmed.to_string())
}

/// Like [`bounded`] but blank input becomes `None`
pub fn optional(field: &str, raw: Option<&str>, max: usize) -> MarketResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => bounded(field, value, 1, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_trims_and_counts_chars() {
        assert_eq!(bounded("Title", "  Vélo  ", 3, 10).unwrap(), "Vélo");
        assert!(bounded("Title", "ab", 3, 10).is_err());
        assert!(bounded("Title", &"é".repeat(11), 3, 10).is_err());
    }

    #[test]
    fn test_bounded_control_characters() {
        assert!(bounded("Body", "line one\nline two", 1, 100).is_ok());
        assert!(bounded("Body", "bell\u{0007}", 1, 100).is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional("Note", None, 10).unwrap(), None);
        assert_eq!(optional("Note", Some("   "), 10).unwrap(), None);
        assert_eq!(optional("Note", Some(" ok "), 10).unwrap(), Some("ok".to_string()));
        assert!(optional("Note", Some("way too long text"), 10).is_err());
    }
}
