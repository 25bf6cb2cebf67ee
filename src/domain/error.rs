use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Reject missing or blank required text fields.
pub fn ensure_present(value: Option<&str>, field: &'static str) -> Result<(), DomainError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

pub fn ensure_max_chars(value: &str, max: usize, field: &'static str) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_missing() {
        assert!(ensure_present(None, "name").is_err());
        assert!(ensure_present(Some("   "), "name").is_err());
        assert!(ensure_present(Some("A"), "name").is_ok());
    }

    #[test]
    fn max_chars_counts_characters_not_bytes() {
        let title = "é".repeat(100);
        assert!(ensure_max_chars(&title, 100, "title").is_ok());
        assert!(ensure_max_chars(&format!("{title}x"), 100, "title").is_err());
    }
}
