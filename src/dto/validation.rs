//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a shareable game code.
pub const GAME_CODE_LENGTH: usize = 6;

/// Validates that a game code is exactly 6 uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_game_code("A1B2C3") // Ok
/// validate_game_code("a1b2c3") // Err - lowercase
/// validate_game_code("A1B2C")  // Err - too short
/// ```
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != GAME_CODE_LENGTH {
        let mut err = ValidationError::new("game_code_length");
        err.message = Some(
            format!(
                "Game code must be exactly {GAME_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("game_code_format");
        err.message =
            Some("Game code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_code_valid() {
        assert!(validate_game_code("A1B2C3").is_ok());
        assert!(validate_game_code("ZZZZZZ").is_ok());
        assert!(validate_game_code("000000").is_ok());
    }

    #[test]
    fn test_validate_game_code_invalid_length() {
        assert!(validate_game_code("A1B2C").is_err()); // too short
        assert!(validate_game_code("A1B2C3D").is_err()); // too long
        assert!(validate_game_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_game_code_invalid_format() {
        assert!(validate_game_code("a1b2c3").is_err()); // lowercase
        assert!(validate_game_code("A1B2C!").is_err()); // punctuation
        assert!(validate_game_code("A1 2C3").is_err()); // space
    }
}
