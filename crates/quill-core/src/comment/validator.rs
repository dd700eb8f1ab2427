//! Comment validation

use super::model::CommentAuthor;
use crate::error::{QuillError, Result};

/// Maximum comment length (default)
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Minimum comment length
pub const MIN_COMMENT_LENGTH: usize = 1;

/// Maximum guest display name length
pub const MAX_GUEST_NAME_LENGTH: usize = 120;

/// Validator for comments
#[derive(Debug, Clone)]
pub struct CommentValidator {
    max_length: usize,
    min_length: usize,
}

impl CommentValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self {
            max_length: MAX_COMMENT_LENGTH,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Create a new validator with custom max length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: MIN_COMMENT_LENGTH,
        }
    }

    /// Validate comment content, returning the trimmed text to store
    pub fn validate_content<'a>(&self, content: &'a str) -> Result<&'a str> {
        let trimmed = content.trim();
        let length = trimmed.chars().count();

        if length < self.min_length {
            return Err(QuillError::Validation(
                "Comment content cannot be empty".to_string(),
            ));
        }

        if length > self.max_length {
            return Err(QuillError::Validation(format!(
                "Comment content exceeds maximum length of {} characters",
                self.max_length
            )));
        }

        Ok(trimmed)
    }

    /// Validate the guest part of an author; registered authors are resolved elsewhere
    pub fn validate_author(&self, author: &CommentAuthor) -> Result<()> {
        if let CommentAuthor::Guest { name, email } = author {
            let name = name.trim();
            if name.is_empty() {
                return Err(QuillError::Validation(
                    "Guest comments require a name".to_string(),
                ));
            }
            if name.chars().count() > MAX_GUEST_NAME_LENGTH {
                return Err(QuillError::Validation(format!(
                    "Guest name exceeds maximum length of {} characters",
                    MAX_GUEST_NAME_LENGTH
                )));
            }
            if let Some(email) = email {
                if !email.trim().is_empty() && !email.contains('@') {
                    return Err(QuillError::Validation(format!(
                        "Invalid email address: '{}'",
                        email
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for CommentValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_empty() {
        let validator = CommentValidator::new();
        assert!(validator.validate_content("").is_err());
        assert!(validator.validate_content("   \n ").is_err());
    }

    #[test]
    fn test_validate_content_trims() {
        let validator = CommentValidator::new();
        assert_eq!(validator.validate_content("  Great read  ").unwrap(), "Great read");
    }

    #[test]
    fn test_validate_content_too_long() {
        let validator = CommentValidator::with_max_length(10);
        assert!(validator.validate_content("12345678901").is_err());
        assert!(validator.validate_content("  1234567890  ").is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        let validator = CommentValidator::with_max_length(3);
        assert!(validator.validate_content("äöü").is_ok());
    }

    #[test]
    fn test_validate_guest_author() {
        let validator = CommentValidator::new();
        assert!(validator.validate_author(&CommentAuthor::guest("Sam")).is_ok());
        assert!(validator.validate_author(&CommentAuthor::guest("  ")).is_err());
        assert!(validator
            .validate_author(&CommentAuthor::Guest {
                name: "Sam".to_string(),
                email: Some("not-an-email".to_string()),
            })
            .is_err());
        assert!(validator
            .validate_author(&CommentAuthor::registered("u1"))
            .is_ok());
    }
}
