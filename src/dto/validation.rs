//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::room::ROOM_CODE_LENGTH;

/// Longest display name accepted, in characters.
pub const MAX_NAME_LENGTH: usize = 24;
/// Longest private note accepted, in characters.
pub const MAX_NOTE_LENGTH: usize = 500;
/// Accepted round lengths, in minutes.
pub const ROUND_MINUTES_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

/// Validates that a display name is present once trimmed and not overly long.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ann")   // Ok
/// validate_display_name("   ")   // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Please enter your name.".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Name must be at most {MAX_NAME_LENGTH} characters (got {length})").into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("name_format");
        err.message = Some("Name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is made of [`ROOM_CODE_LENGTH`] alphanumeric characters.
///
/// Case is ignored; codes are normalised to uppercase on lookup.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if code.len() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates an optional round length.
pub fn validate_round_minutes(minutes: u32) -> Result<(), ValidationError> {
    if !ROUND_MINUTES_RANGE.contains(&minutes) {
        let mut err = ValidationError::new("round_minutes_range");
        err.message = Some(
            format!(
                "Round length must be between {} and {} minutes (got {minutes})",
                ROUND_MINUTES_RANGE.start(),
                ROUND_MINUTES_RANGE.end()
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates the size of a private note.
pub fn validate_note_text(text: &str) -> Result<(), ValidationError> {
    let length = text.chars().count();
    if length > MAX_NOTE_LENGTH {
        let mut err = ValidationError::new("note_length");
        err.message = Some(
            format!("Notes must be at most {MAX_NOTE_LENGTH} characters (got {length})").into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Ann").is_ok());
        assert!(validate_display_name("  Zoë the Great ").is_ok());
    }

    #[test]
    fn test_validate_display_name_invalid() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
        assert!(validate_display_name("tab\tname").is_err());
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code(" abc123 ").is_ok());
        assert!(validate_room_code("ABC12").is_err()); // too short
        assert!(validate_room_code("ABC-12").is_err()); // punctuation
    }

    #[test]
    fn test_validate_round_minutes() {
        assert!(validate_round_minutes(1).is_ok());
        assert!(validate_round_minutes(30).is_ok());
        assert!(validate_round_minutes(0).is_err());
        assert!(validate_round_minutes(31).is_err());
    }

    #[test]
    fn test_validate_note_text() {
        assert!(validate_note_text("").is_ok());
        assert!(validate_note_text(&"n".repeat(MAX_NOTE_LENGTH)).is_ok());
        assert!(validate_note_text(&"n".repeat(MAX_NOTE_LENGTH + 1)).is_err());
    }
}
