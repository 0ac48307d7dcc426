// src/services/parser.rs
use crate::error::AnalysisError;

/// What the snapshot table shows when a metric is unavailable.
pub const MISSING_PLACEHOLDER: &str = "-";

/// Parses values like `"12.5%"` into `12.5`. Anything unparseable becomes NaN.
pub fn parse_percentage(raw: &str) -> f64 {
    raw.trim()
        .replace('%', "")
        .trim()
        .parse::<f64>()
        .unwrap_or(f64::NAN)
}

/// Parses a plain ratio such as EV/Sales. The placeholder and malformed text
/// are errors, since the record cannot be used without this value.
pub fn parse_ratio(field: &str, raw: &str) -> Result<f64, AnalysisError> {
    let value = raw.trim();
    if value.is_empty() || value == MISSING_PLACEHOLDER {
        return Err(AnalysisError::parse(field, raw));
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AnalysisError::parse(field, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percentage_valid() {
        assert_eq!(parse_percentage("12.5%"), 12.5);
        assert_eq!(parse_percentage("-3.2%"), -3.2);
        assert_eq!(parse_percentage(" 0.00% "), 0.0);
        assert_eq!(parse_percentage("140.12%"), 140.12);
    }

    #[test]
    fn test_parse_percentage_without_sign() {
        assert_eq!(parse_percentage("7"), 7.0);
    }

    #[test]
    fn test_parse_percentage_malformed_is_nan() {
        for raw in ["-", "N/A", "", "%", "abc%", "1.2.3%"] {
            assert!(parse_percentage(raw).is_nan(), "expected NaN for {:?}", raw);
        }
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("EV/Sales", "8.41").unwrap(), 8.41);
        assert_eq!(parse_ratio("EV/Sales", " 12 ").unwrap(), 12.0);
    }

    #[test]
    fn test_parse_ratio_rejects_missing() {
        let err = parse_ratio("EV/Sales", "-").unwrap_err();
        assert_eq!(err, AnalysisError::parse("EV/Sales", "-"));
        assert!(parse_ratio("EV/Sales", "").is_err());
        assert!(parse_ratio("EV/Sales", "n/a").is_err());
        assert!(parse_ratio("EV/Sales", "inf").is_err());
    }
}
