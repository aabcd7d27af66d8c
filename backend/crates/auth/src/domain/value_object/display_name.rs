//! Optional display name shown next to listings, reviews and testimonials

use kernel::error::app_error::{AppError, AppResult};

pub const DISPLAY_NAME_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    /// Blank input means "no name"
    pub fn parse(raw: Option<String>) -> AppResult<Option<Self>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(AppError::bad_request(format!(
                "Name must be at most {DISPLAY_NAME_MAX_CHARS} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AppError::bad_request("Name contains invalid characters"));
        }
        Ok(Some(Self(trimmed.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_blank_is_none() {
        assert_eq!(DisplayName::parse(None).unwrap(), None);
        assert_eq!(DisplayName::parse(Some("   ".into())).unwrap(), None);
    }

    #[test]
    fn test_display_name_trims() {
        let name = DisplayName::parse(Some("  Camille ".into())).unwrap().unwrap();
        assert_eq!(name.as_str(), "Camille");
    }

    #[test]
    fn test_display_name_rejects_long_or_control() {
        assert!(DisplayName::parse(Some("x".repeat(81))).is_err());
        assert!(DisplayName::parse(Some("a\u{0000}b".into())).is_err());
    }
}
