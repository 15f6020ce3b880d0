//! Knowledge base name validation

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length for knowledge base names accepted by the managed service
pub const MAX_KB_NAME_LENGTH: usize = 100;

/// Alphanumeric groups optionally separated by single hyphens or underscores
static KB_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-zA-Z][_-]?)+$").unwrap());

/// Knowledge base validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeBaseValidationError {
    /// Name is empty
    EmptyName,
    /// Name exceeds maximum length
    NameTooLong { length: usize, max: usize },
    /// Name contains invalid characters
    InvalidNameFormat { name: String },
    /// Result limit outside the accepted range
    InvalidResultLimit { value: u32, min: u32, max: u32 },
}

impl fmt::Display for KnowledgeBaseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Knowledge base name cannot be empty"),
            Self::NameTooLong { length, max } => {
                write!(
                    f,
                    "Knowledge base name too long: {} characters (max {})",
                    length, max
                )
            }
            Self::InvalidNameFormat { name } => {
                write!(
                    f,
                    "Invalid knowledge base name '{}': must be alphanumeric with single hyphens or underscores",
                    name
                )
            }
            Self::InvalidResultLimit { value, min, max } => {
                write!(
                    f,
                    "Invalid result limit {}: must be between {} and {}",
                    value, min, max
                )
            }
        }
    }
}

impl std::error::Error for KnowledgeBaseValidationError {}

/// Validate a knowledge base name
pub fn validate_knowledge_base_name(name: &str) -> Result<(), KnowledgeBaseValidationError> {
    if name.is_empty() {
        return Err(KnowledgeBaseValidationError::EmptyName);
    }

    if name.len() > MAX_KB_NAME_LENGTH {
        return Err(KnowledgeBaseValidationError::NameTooLong {
            length: name.len(),
            max: MAX_KB_NAME_LENGTH,
        });
    }

    if !KB_NAME_PATTERN.is_match(name) {
        return Err(KnowledgeBaseValidationError::InvalidNameFormat {
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Validate how many retrieved passages a query may use
pub fn validate_result_limit(limit: u32) -> Result<(), KnowledgeBaseValidationError> {
    const MIN: u32 = 1;
    const MAX: u32 = 100;

    if !(MIN..=MAX).contains(&limit) {
        return Err(KnowledgeBaseValidationError::InvalidResultLimit {
            value: limit,
            min: MIN,
            max: MAX,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_knowledge_base_name("a").is_ok());
        assert!(validate_knowledge_base_name("schoolassistant").is_ok());
        assert!(validate_knowledge_base_name("school-assistant_v2").is_ok());
        assert!(validate_knowledge_base_name("KB123").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            validate_knowledge_base_name(""),
            Err(KnowledgeBaseValidationError::EmptyName)
        ));

        let long_name = "a".repeat(101);
        assert!(matches!(
            validate_knowledge_base_name(&long_name),
            Err(KnowledgeBaseValidationError::NameTooLong { .. })
        ));

        assert!(matches!(
            validate_knowledge_base_name("my kb"),
            Err(KnowledgeBaseValidationError::InvalidNameFormat { .. })
        ));

        assert!(matches!(
            validate_knowledge_base_name("-kb"),
            Err(KnowledgeBaseValidationError::InvalidNameFormat { .. })
        ));

        assert!(matches!(
            validate_knowledge_base_name("kb--docs"),
            Err(KnowledgeBaseValidationError::InvalidNameFormat { .. })
        ));
    }

    #[test]
    fn test_result_limit_validation() {
        assert!(validate_result_limit(1).is_ok());
        assert!(validate_result_limit(5).is_ok());
        assert!(validate_result_limit(100).is_ok());

        assert!(validate_result_limit(0).is_err());
        assert!(validate_result_limit(101).is_err());
    }
}
