//! Request field validation.

use crate::error::AppError;

/// Non-empty after trimming.
pub fn required(field: &str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must be one of: {}",
            allowed.join(", ")
        )))
    }
}

/// Minimal email shape check, matching what the original backend enforced.
pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    let v = value.trim();
    if v.len() < 3 || !v.contains('@') || v.starts_with('@') || v.ends_with('@') {
        return Err(AppError::Validation(format!("{field} must be a valid email")));
    }
    Ok(())
}

/// Lowercased, trimmed email. `None` passes through for optional fields.
pub fn normalize_email(value: Option<&str>) -> Option<String> {
    value
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank() {
        assert!(required("name", Some("  ")).is_err());
        assert!(required("name", None).is_err());
        assert_eq!(required("name", Some(" Asha ")).unwrap(), "Asha");
    }

    #[test]
    fn length_counts_chars() {
        assert!(length("zip", "12", 3, 20).is_err());
        assert!(length("zip", "600042", 3, 20).is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(email("email", "a@b.in").is_ok());
        assert!(email("email", "nope").is_err());
        assert!(email("email", "@host").is_err());
    }

    #[test]
    fn normalize_email_lowercases() {
        assert_eq!(
            normalize_email(Some("  User@Example.COM ")).as_deref(),
            Some("user@example.com")
        );
        assert_eq!(normalize_email(Some("   ")), None);
    }
}
