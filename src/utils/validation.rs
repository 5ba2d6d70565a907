use crate::utils::error::{Result, SizerError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SizerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(SizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
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
        return Err(SizerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// User-facing check for utilization percentages. The geometry model itself
/// accepts any value, so callers run this before handing input over.
pub fn validate_utilization(field_name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(SizerError::ValidationError {
            message: format!("{} must be between 0 and 100, got {}", field_name, value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("catalog.endpoint", "https://cloudbilling.googleapis.com").is_ok());
        assert!(validate_url("catalog.endpoint", "").is_err());
        assert!(validate_url("catalog.endpoint", "not a url").is_err());
        assert!(validate_url("catalog.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_utilization() {
        assert!(validate_utilization("utilization", 0.0).is_ok());
        assert!(validate_utilization("utilization", 100.0).is_ok());
        assert!(matches!(
            validate_utilization("utilization", 120.0),
            Err(SizerError::ValidationError { .. })
        ));
        assert!(validate_utilization("utilization", -1.0).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("spread", 20.0, 0.0, 100.0).is_ok());
        assert!(validate_range("spread", 101.0, 0.0, 100.0).is_err());
    }
}
