//! Input bounds checks shared by the flows.
//!
//! Lengths are counted in characters after trimming surrounding whitespace.

use crate::error::FlowError;

/// A required text field of `min..=max` characters.
pub fn required_text(field: &str, value: &str, min: usize, max: usize) -> Result<(), FlowError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(FlowError::validation(field, "is required"));
    }
    check_len(field, len, min, max)
}

/// An optional text field of at most `max` characters. Blank counts as absent.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<(), FlowError> {
    match value {
        Some(v) => check_len(field, v.trim().chars().count(), 0, max),
        None => Ok(()),
    }
}

fn check_len(field: &str, len: usize, min: usize, max: usize) -> Result<(), FlowError> {
    if len < min {
        return Err(FlowError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(FlowError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(r: Result<(), FlowError>) -> String {
        match r {
            Err(FlowError::Validation { message, .. }) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn required_text_bounds() {
        assert!(required_text("q", "abc", 3, 5).is_ok());
        assert_eq!(message(required_text("q", "   ", 3, 5)), "is required");
        assert_eq!(
            message(required_text("q", "ab", 3, 5)),
            "must be at least 3 characters"
        );
        assert_eq!(
            message(required_text("q", "abcdef", 3, 5)),
            "must be at most 5 characters"
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // Five characters, fifteen bytes.
        assert!(required_text("q", "ぁぁぁぁぁ", 1, 5).is_ok());
    }

    #[test]
    fn optional_text_allows_absent_and_blank() {
        assert!(optional_text("s", None, 3).is_ok());
        assert!(optional_text("s", Some(""), 3).is_ok());
        assert!(optional_text("s", Some("abcd"), 3).is_err());
    }
}
