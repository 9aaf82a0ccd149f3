//! Sources of sunrise and sunset instants

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::Result;
use crate::config::RahuConfig;
use crate::models::SolarReading;

pub mod offline;
pub mod sunrise_sunset;

pub use offline::OfflineSolarProvider;
pub use sunrise_sunset::SunriseSunsetClient;

/// Supplies sunrise/sunset (UTC) for a location and calendar date
#[async_trait]
pub trait SolarTimeProvider: Send + Sync {
    async fn fetch(&self, latitude: f64, longitude: f64, date: NaiveDate) -> Result<SolarReading>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Provider selected by configuration
pub fn from_config(config: &RahuConfig) -> Result<Arc<dyn SolarTimeProvider>> {
    if config.provider.offline {
        Ok(Arc::new(OfflineSolarProvider))
    } else {
        Ok(Arc::new(SunriseSunsetClient::new(&config.provider)?))
    }
}
