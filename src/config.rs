//! Configuration management for the Rahu Kaal engine
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::RahuError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Offsets (minutes before start) an alert may use
pub const ALERT_OFFSETS: [u32; 6] = [0, 5, 10, 15, 30, 60];

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RahuConfig {
    /// Solar time provider settings
    pub provider: ProviderConfig,
    /// Reverse/forward geocoding settings
    pub geocoding: GeocodingConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Forecast sizing and alerts
    pub forecast: ForecastConfig,
    /// HTTP API settings
    pub server: ServerConfig,
}

/// Solar time provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the sunrise-sunset API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Compute sunrise/sunset locally instead of calling the API
    pub offline: bool,
}

/// Geocoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub enabled: bool,
    /// Base URL of the Nominatim instance
    pub base_url: String,
    /// Nominatim requires an identifying user agent
    pub user_agent: String,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist cache entries to disk; memory only when false
    pub enabled: bool,
    /// Cache directory location
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Forecast sizing and alert defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days fetched on first load
    pub initial_days: u32,
    /// Days appended by each "load more"
    pub batch_days: u32,
    /// Upper bound on forecast length
    pub max_days: u32,
    /// Default minutes before start for the warning alert
    pub alert_offset_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sunrise-sunset.org".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            offline: false,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: crate::http::USER_AGENT.to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            initial_days: 7,
            batch_days: 7,
            max_days: 28,
            alert_offset_minutes: 15,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("rahukaal").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".rahukaal-cache".to_string())
}

impl RahuConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // RAHUKAAL_CACHE__LOCATION overrides cache.location
        builder = builder.add_source(
            Environment::with_prefix("RAHUKAAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RahuConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rahukaal").join("config.toml"))
    }

    /// Apply default values to blank or zeroed fields
    pub fn apply_defaults(&mut self) {
        let defaults = RahuConfig::default();
        if self.provider.base_url.is_empty() {
            self.provider.base_url = defaults.provider.base_url;
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = defaults.provider.timeout_seconds;
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = defaults.geocoding.base_url;
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = defaults.geocoding.user_agent;
        }
        if self.cache.location.is_empty() {
            self.cache.location = defaults.cache.location;
        }
        if self.logging.level.is_empty() {
            self.logging.level = defaults.logging.level;
        }
        if self.logging.format.is_empty() {
            self.logging.format = defaults.logging.format;
        }
        if self.forecast.initial_days == 0 {
            self.forecast.initial_days = defaults.forecast.initial_days;
        }
        if self.forecast.batch_days == 0 {
            self.forecast.batch_days = defaults.forecast.batch_days;
        }
        if self.forecast.max_days == 0 {
            self.forecast.max_days = defaults.forecast.max_days;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 300 {
            return Err(
                RahuError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.provider.max_retries > 10 {
            return Err(RahuError::config("Provider max retries cannot exceed 10").into());
        }

        if self.forecast.max_days > 366 {
            return Err(RahuError::config("Forecast cannot exceed 366 days").into());
        }

        if self.forecast.initial_days > self.forecast.max_days {
            return Err(RahuError::config(format!(
                "Initial forecast days ({}) cannot exceed max days ({})",
                self.forecast.initial_days, self.forecast.max_days
            ))
            .into());
        }

        if !ALERT_OFFSETS.contains(&self.forecast.alert_offset_minutes) {
            return Err(RahuError::config(format!(
                "Alert offset must be one of {ALERT_OFFSETS:?} minutes"
            ))
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RahuError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RahuError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Provider", &self.provider.base_url),
            ("Geocoding", &self.geocoding.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RahuError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = RahuConfig::default();
        assert_eq!(config.provider.base_url, "https://api.sunrise-sunset.org");
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.forecast.initial_days, 7);
        assert_eq!(config.forecast.max_days, 28);
        assert_eq!(config.forecast.alert_offset_minutes, 15);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = RahuConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = RahuConfig::default();
        config.provider.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_alert_offset() {
        let mut config = RahuConfig::default();
        config.forecast.alert_offset_minutes = 7;
        assert!(config.validate().is_err());
        config.forecast.alert_offset_minutes = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = RahuConfig::default();
        config.forecast.batch_days = 0;
        config.provider.base_url = String::new();
        config.apply_defaults();
        assert_eq!(config.forecast.batch_days, 7);
        assert_eq!(config.provider.base_url, "https://api.sunrise-sunset.org");
    }

    #[test]
    fn test_load_from_file_with_partial_sections() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[provider]\noffline = true\n\n[forecast]\nmax_days = 14\n\n[server]\nport = 9090"
        )
        .unwrap();

        let config = RahuConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert!(config.provider.offline);
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.forecast.max_days, 14);
        assert_eq!(config.forecast.batch_days, 7);
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = RahuConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("rahukaal"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
