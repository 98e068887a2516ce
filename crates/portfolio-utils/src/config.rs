//! Environment configuration helpers

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Load `.env` from the working directory or its parents, if there is one
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded .env");
            Some(path)
        }
        Err(_) => None,
    }
}

/// Read a variable, treating blank values as unset
pub fn env_var(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a configuration value, naming the variable in the error
pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_unset() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" wrds ".to_string())), Some("wrds".to_string()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("WRDS_PORT", "9737"), Ok(9737));

        let err = parse_value::<u16>("WRDS_PORT", "high").unwrap_err();
        assert!(err.to_string().starts_with("invalid value for WRDS_PORT: 'high'"));
    }

    #[test]
    fn test_missing_variable() {
        assert_eq!(env_var("PORTFOLIO_RS_SURELY_UNSET_VARIABLE"), None);
    }
}
