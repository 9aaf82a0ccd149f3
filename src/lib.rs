//! `rahukaal` - daily Rahu Kaal windows
//!
//! This library computes the inauspicious eighth of daylight for a location and date, assembles
//! cached multi-day forecasts from a sunrise/sunset provider, and prepares reminder alerts.

pub mod api;
pub mod cache;
pub mod calculator;
pub mod config;
pub mod context;
pub mod error;
pub mod forecast;
pub mod forecast_cache;
pub mod geocoding;
pub mod http;
pub mod logging;
pub mod models;
pub mod notification;
pub mod preferences;
pub mod session;
pub mod solar;
pub mod solar_cache;
pub mod web;

// Re-export core types for public API
pub use cache::{FallbackStore, KeyValueStore, MemoryKeyValueStore, SharedStore};
pub use calculator::WindowCalculator;
pub use config::RahuConfig;
pub use context::AppContext;
pub use error::RahuError;
pub use forecast::ForecastAssembler;
pub use forecast_cache::ForecastCache;
pub use models::{Coordinates, DayEntry, Forecast, InauspiciousWindow, SolarReading, WindowStatus};
pub use session::ForecastSession;
pub use solar::SolarTimeProvider;
pub use solar_cache::SolarCache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RahuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
