//! Parsing of custom machine identifiers such as
//! `CP-COMPUTEENGINE-VMIMAGE-N2-CUSTOM-4-16384-EXTENDED`.

use crate::utils::error::{Result, SizerError};
use serde::Serialize;

const MARKER: &str = "CUSTOM";

/// Identifier prefixes whose RAM token is already in GB.
pub const DEFAULT_GB_PREFIXES: &[&str] = &["CP-ML-TRAINING"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CustomShape {
    pub cores: u32,
    pub ram_gb: f64,
    pub extended: bool,
    pub preemptible: bool,
}

pub fn parse_custom(identifier: &str) -> Result<CustomShape> {
    parse_custom_with(identifier, DEFAULT_GB_PREFIXES)
}

pub fn parse_custom_with<P: AsRef<str>>(
    identifier: &str,
    gb_prefixes: &[P],
) -> Result<CustomShape> {
    let upper = identifier.to_uppercase();
    let parse_error = |reason: &str| SizerError::ParseError {
        input: identifier.to_string(),
        reason: reason.to_string(),
    };

    let start = upper
        .find(MARKER)
        .ok_or_else(|| parse_error("missing CUSTOM marker"))?;
    let tail = &upper[start + MARKER.len()..];
    let tokens: Vec<&str> = tail.split('-').filter(|t| !t.is_empty()).collect();

    let numbers: Vec<f64> = tokens
        .iter()
        .filter_map(|token| token.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .collect();
    if numbers.len() < 2 {
        return Err(parse_error("expected <cores>-<ram> after CUSTOM"));
    }

    let cores = numbers[0];
    if cores.fract() != 0.0 || cores > u32::MAX as f64 {
        return Err(parse_error("core count must be a whole number"));
    }

    let ram_in_gb = gb_prefixes
        .iter()
        .any(|prefix| upper.starts_with(&prefix.as_ref().to_uppercase()));
    let ram_gb = if ram_in_gb {
        numbers[1]
    } else {
        numbers[1] / 1024.0
    };

    Ok(CustomShape {
        cores: cores as u32,
        ram_gb,
        extended: tokens.contains(&"EXTENDED"),
        preemptible: tokens.contains(&"PREEMPTIBLE"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_identifier() {
        let shape = parse_custom("CUSTOM-4-16384").unwrap();
        assert_eq!(shape.cores, 4);
        assert_eq!(shape.ram_gb, 16.0);
        assert!(!shape.extended);
        assert!(!shape.preemptible);
    }

    #[test]
    fn test_parse_flags_and_lowercase() {
        let identifier = "cp-computeengine-vmimage-n2-custom-8-66560-extended-preemptible";
        let shape = parse_custom(identifier).unwrap();
        assert_eq!(shape.cores, 8);
        assert_eq!(shape.ram_gb, 65.0);
        assert!(shape.extended);
        assert!(shape.preemptible);
    }

    #[test]
    fn test_parse_gb_denominated_family() {
        let shape = parse_custom("CP-ML-TRAINING-CUSTOM-16-64").unwrap();
        assert_eq!(shape.cores, 16);
        assert_eq!(shape.ram_gb, 64.0);

        let shape = parse_custom_with("CP-DB-CUSTOM-2-8", &["cp-db"]).unwrap();
        assert_eq!(shape.ram_gb, 8.0);
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert!(matches!(
            parse_custom("CUSTOM-4"),
            Err(SizerError::ParseError { .. })
        ));
        assert!(parse_custom("N1-STANDARD-4").is_err());
        assert!(parse_custom("CUSTOM-EXTENDED-PREEMPTIBLE").is_err());
        assert!(parse_custom("CUSTOM-2.5-4096").is_err());
    }
}
