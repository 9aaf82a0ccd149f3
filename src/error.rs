//! Error types and handling for the Rahu Kaal engine

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Main error type for the Rahu Kaal engine.
///
/// Every variant carries owned data only so the error can be cloned and handed to
/// every caller awaiting a shared in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RahuError {
    /// Sunset is not after sunrise for the requested date
    #[error("Invalid solar data for {date}: sunrise {sunrise} is not before sunset {sunset}")]
    InvalidSolarData {
        date: NaiveDate,
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },

    /// Solar time provider failures (transport, status, payload)
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// `extend` was called without a base forecast to extend from
    #[error("Cannot extend an empty forecast: there is no last date to continue from")]
    NonContiguousExtension,

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed payloads from providers or the store
    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl RahuError {
    /// Create a new invalid solar data error
    pub fn invalid_solar_data(date: NaiveDate, sunrise: DateTime<Utc>, sunset: DateTime<Utc>) -> Self {
        Self::InvalidSolarData {
            date,
            sunrise,
            sunset,
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RahuError::InvalidSolarData { date, .. } => {
                format!("No usable sunrise/sunset for {date} at this location.")
            }
            RahuError::Provider { .. } => {
                "Failed to load solar data. Please check your connection.".to_string()
            }
            RahuError::NonContiguousExtension => {
                "Nothing to extend yet. Load today's forecast first.".to_string()
            }
            RahuError::Validation { message } => format!("Invalid input: {message}"),
            RahuError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            RahuError::Parse { .. } => {
                "Received malformed data from the solar time service.".to_string()
            }
        }
    }
}

impl From<reqwest_middleware::Error> for RahuError {
    fn from(err: reqwest_middleware::Error) -> Self {
        RahuError::provider(format!("request failed: {err}"))
    }
}

impl From<reqwest::Error> for RahuError {
    fn from(err: reqwest::Error) -> Self {
        RahuError::provider(format!("request failed: {err}"))
    }
}

impl From<serde_json::Error> for RahuError {
    fn from(err: serde_json::Error) -> Self {
        RahuError::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let provider_err = RahuError::provider("status 503");
        assert!(matches!(provider_err, RahuError::Provider { .. }));

        let validation_err = RahuError::validation("latitude out of range");
        assert!(matches!(validation_err, RahuError::Validation { .. }));

        let config_err = RahuError::config("bad port");
        assert!(matches!(config_err, RahuError::Config { .. }));
    }

    #[test]
    fn test_user_messages() {
        let provider_err = RahuError::provider("test");
        assert!(provider_err.user_message().contains("check your connection"));

        let validation_err = RahuError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let now = Utc::now();
        let solar_err = RahuError::invalid_solar_data(date, now, now);
        assert!(solar_err.user_message().contains("2024-06-21"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: RahuError = json_err.into();
        assert!(matches!(err, RahuError::Parse { .. }));
    }
}
