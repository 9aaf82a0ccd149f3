//! Local sunrise/sunset computation, used when no network provider is wanted

use async_trait::async_trait;
use chrono::NaiveDate;
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::SolarTimeProvider;
use crate::models::SolarReading;
use crate::{RahuError, Result};

/// Computes readings with the `sunrise` crate instead of calling an API
pub struct OfflineSolarProvider;

impl OfflineSolarProvider {
    pub fn reading(latitude: f64, longitude: f64, date: NaiveDate) -> Result<SolarReading> {
        let coordinates = Coordinates::new(latitude, longitude).ok_or_else(|| {
            RahuError::validation(format!(
                "Invalid coordinates: lat={latitude}, lng={longitude}"
            ))
        })?;

        let solar_day = SolarDay::new(coordinates, date);
        let sunrise = solar_day.event_time(SolarEvent::Sunrise);
        let sunset = solar_day.event_time(SolarEvent::Sunset);

        match (sunrise, sunset) {
            (Some(sunrise), Some(sunset)) => Ok(SolarReading::new(sunrise, sunset)),
            // polar day or night
            _ => Err(RahuError::provider(format!(
                "no sunrise/sunset at ({latitude}, {longitude}) on {date}"
            ))),
        }
    }
}

#[async_trait]
impl SolarTimeProvider for OfflineSolarProvider {
    async fn fetch(&self, latitude: f64, longitude: f64, date: NaiveDate) -> Result<SolarReading> {
        Self::reading(latitude, longitude, date)
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_delhi_has_positive_daylight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let reading = OfflineSolarProvider::reading(28.6139, 77.209, date).unwrap();
        let hours = reading.daylight().num_minutes() as f64 / 60.0;
        assert!(hours > 10.0 && hours < 11.5, "daylight was {hours}h");
        assert_eq!(reading.sunrise.date_naive(), date);
    }

    #[test]
    fn test_invalid_coordinates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = OfflineSolarProvider::reading(123.0, 0.0, date).unwrap_err();
        assert!(matches!(err, RahuError::Validation { .. }));
    }
}
