//! Input validation helpers. All rules run before any store access; failures
//! surface as a 400 with the offending field listed.

use crate::error::{ApiError, ApiResult};

pub fn required_text(path: &'static str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(path, format!("{path} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field, mapping whitespace-only values to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn non_negative(path: &'static str, value: i64) -> ApiResult<i64> {
    if value < 0 {
        return Err(ApiError::invalid(path, format!("{path} must be zero or positive")));
    }
    Ok(value)
}

pub fn positive(path: &'static str, value: Option<i32>) -> ApiResult<Option<i32>> {
    if let Some(n) = value {
        if n <= 0 {
            return Err(ApiError::invalid(path, format!("{path} must be positive")));
        }
    }
    Ok(value)
}

pub fn email(value: Option<String>) -> ApiResult<Option<String>> {
    match optional_text(value) {
        Some(addr) if !addr.contains('@') => {
            Err(ApiError::invalid("email", "email must be a valid address"))
        }
        other => Ok(other),
    }
}

pub fn tag_name(value: &str) -> ApiResult<String> {
    let name = required_text("name", value)?;
    if name.chars().count() > 50 {
        return Err(ApiError::invalid("name", "name must be 50 characters or fewer"));
    }
    Ok(name)
}

/// `#RRGGBB` hex color.
pub fn hex_color(value: &str) -> ApiResult<String> {
    let color = value.trim();
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::invalid("color", "color must be a hex value like #FF5733"));
    }
    Ok(color.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("title", "  Deal  ").unwrap(), "Deal");
        assert!(required_text("title", "   ").is_err());
    }

    #[test]
    fn optional_text_drops_whitespace_only() {
        assert_eq!(optional_text(Some("  memo ".into())), Some("memo".into()));
        assert_eq!(optional_text(Some("   ".into())), None);
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn hex_color_accepts_only_full_hex() {
        assert!(hex_color("#FF5733").is_ok());
        assert!(hex_color("#ff5733").is_ok());
        assert!(hex_color("FF5733").is_err());
        assert!(hex_color("#FF573").is_err());
        assert!(hex_color("#GG5733").is_err());
    }

    #[test]
    fn tag_name_enforces_length() {
        assert!(tag_name(&"a".repeat(50)).is_ok());
        assert!(tag_name(&"a".repeat(51)).is_err());
    }
}
