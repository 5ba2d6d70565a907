use thiserror::Error;

#[derive(Error, Debug)]
pub enum SizerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Cannot parse '{input}': {reason}")]
    ParseError { input: String, reason: String },

    #[error("Malformed tier table: {reason}")]
    MalformedTiers { reason: String },

    #[error("No price for sku {sku} in region {region}")]
    PriceUnavailable { sku: String, region: String },

    #[error("Sku {sku} matches both CPU and RAM rules: {description}")]
    AmbiguousSku { sku: String, description: String },

    #[error("Unknown machine family: {family}")]
    UnknownFamily { family: String },

    #[error("No cart line item at index {index}")]
    LineItemNotFound { index: usize },

    #[error("Shared state lock poisoned")]
    StatePoisoned,
}

pub type Result<T> = std::result::Result<T, SizerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
    Pricing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SizerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SizerError::ApiError(_) => ErrorCategory::Network,
            SizerError::ConfigError { .. }
            | SizerError::InvalidConfigValueError { .. }
            | SizerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SizerError::ValidationError { .. } | SizerError::ParseError { .. } => {
                ErrorCategory::Input
            }
            SizerError::MalformedTiers { .. }
            | SizerError::PriceUnavailable { .. }
            | SizerError::AmbiguousSku { .. }
            | SizerError::UnknownFamily { .. }
            | SizerError::LineItemNotFound { .. } => ErrorCategory::Pricing,
            SizerError::IoError(_)
            | SizerError::SerializationError(_)
            | SizerError::StatePoisoned => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SizerError::LineItemNotFound { .. } => ErrorSeverity::Low,
            SizerError::ApiError(_) | SizerError::PriceUnavailable { .. } => ErrorSeverity::Medium,
            SizerError::StatePoisoned | SizerError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SizerError::ApiError(_) => "Check network access and the catalog API key",
            SizerError::ConfigError { .. }
            | SizerError::InvalidConfigValueError { .. }
            | SizerError::MissingConfigError { .. } => "Review the TOML configuration file",
            SizerError::ValidationError { .. } => "Utilization values must be between 0 and 100",
            SizerError::ParseError { .. } => {
                "Custom identifiers look like CUSTOM-<cores>-<ramMB>[-EXTENDED][-PREEMPTIBLE]"
            }
            SizerError::MalformedTiers { .. } => "Tier thresholds must be strictly ascending",
            SizerError::PriceUnavailable { .. } => {
                "Pick a region the sku is sold in or refresh the billing catalog"
            }
            SizerError::AmbiguousSku { .. } => {
                "Check the family matching rules against the catalog"
            }
            SizerError::UnknownFamily { .. } => "Use a supported machine family such as N1 or N2",
            SizerError::LineItemNotFound { .. } => "List the cart to find a valid index",
            SizerError::IoError(_) | SizerError::SerializationError(_) => {
                "Check file permissions and file contents"
            }
            SizerError::StatePoisoned => "Restart the process",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the billing catalog: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Pricing => format!("Unable to price request: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_unavailable_is_pricing_error() {
        let err = SizerError::PriceUnavailable {
            sku: "ABCD-1234".to_string(),
            region: "mars-north1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Pricing);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("mars-north1"));
    }

    #[test]
    fn test_bad_input_fails_the_command() {
        let err = SizerError::ValidationError {
            message: "utilization must be within 0..=100".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
