use crate::utils::error::{Result, SyncError};
use std::time::Duration;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> SyncError {
    SyncError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// REST base URL: http(s), no query or fragment since paths are appended to it.
pub fn validate_api_base_url(field_name: &str, url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field_name,
            url_str,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field_name, url_str, "Query and fragment are not allowed"));
    }
    Ok(())
}

/// The status document path names a file, locally or inside the repository.
pub fn validate_document_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }
    if path.ends_with('/') || path.ends_with('\\') {
        return Err(invalid(field_name, path, "Path must name a file, not a directory"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }
    Ok(())
}

/// Timers built from whole seconds must not collapse to zero.
pub fn validate_non_zero_duration(field_name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(invalid(field_name, value.as_secs(), "Must be at least 1 second"));
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| SyncError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

/// Entity and objective names are spliced into console commands verbatim.
pub fn validate_command_token(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if let Some(bad) = value
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, ',' | '=' | '[' | ']' | '{' | '}' | '@'))
    {
        return Err(invalid(
            field_name,
            value,
            format!("Character '{}' is not allowed in a command argument", bad),
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_base_url() {
        assert!(validate_api_base_url("sink.github.api_url", "https://api.github.com").is_ok());
        assert!(validate_api_base_url("sink.github.api_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_api_base_url("sink.github.api_url", "").is_err());
        assert!(validate_api_base_url("sink.github.api_url", "invalid-url").is_err());
        assert!(validate_api_base_url("sink.github.api_url", "ftp://example.com").is_err());
        assert!(validate_api_base_url("sink.github.api_url", "https://ghe.local/api?x=1").is_err());
    }

    #[test]
    fn test_validate_document_path() {
        assert!(validate_document_path("sink.path", "public/open.json").is_ok());
        assert!(validate_document_path("sink.path", " ").is_err());
        assert!(validate_document_path("sink.path", "public/").is_err());
    }

    #[test]
    fn test_validate_non_zero_duration() {
        assert!(validate_non_zero_duration("schedule.interval_seconds", Duration::from_secs(5)).is_ok());
        assert!(validate_non_zero_duration("schedule.interval_seconds", Duration::ZERO).is_err());
    }

    #[test]
    fn test_validate_command_token() {
        assert!(validate_command_token("probe.entity", "Bananakundao").is_ok());
        assert!(validate_command_token("probe.entity", "").is_err());
        assert!(validate_command_token("probe.entity", "a b").is_err());
        assert!(validate_command_token("probe.objective", "mente}").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("server.port", 19132u32, 1, 65535).is_ok());
        assert!(validate_range("server.port", 114514u32, 1, 65535).is_err());
    }
}
