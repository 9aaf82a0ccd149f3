//! Rahu Kaal window calculation
//!
//! Daylight between sunrise and sunset is split into eight equal segments. Each weekday owns
//! one of them; segment 0 starts at sunrise.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};

use crate::models::{DayEntry, InauspiciousWindow, SolarReading};
use crate::{RahuError, Result};

/// Segment index per weekday, Sunday first
pub const SEGMENT_TABLE: [u8; 7] = [7, 1, 6, 4, 5, 3, 2];

/// Number of equal daylight segments
pub const SEGMENT_COUNT: i32 = 8;

/// Stateless calculator mapping solar readings to inauspicious windows
pub struct WindowCalculator;

impl WindowCalculator {
    /// Segment owned by the weekday of `date`
    #[must_use]
    pub fn segment_index(date: NaiveDate) -> u8 {
        SEGMENT_TABLE[date.weekday().num_days_from_sunday() as usize]
    }

    /// Compute the window for `date` from its sunrise and sunset
    pub fn compute(
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
        date: NaiveDate,
    ) -> Result<InauspiciousWindow> {
        let daylight = sunset - sunrise;
        if daylight <= TimeDelta::zero() {
            return Err(RahuError::invalid_solar_data(date, sunrise, sunset));
        }

        let segment = daylight / SEGMENT_COUNT;
        let start = sunrise + segment * i32::from(Self::segment_index(date));

        Ok(InauspiciousWindow {
            start,
            end: start + segment,
            reference_date: date,
        })
    }

    /// Build the full day entry for a reading
    pub fn day_entry(reading: SolarReading, date: NaiveDate) -> Result<DayEntry> {
        let window = Self::compute(reading.sunrise, reading.sunset, date)?;
        Ok(DayEntry {
            date,
            sunrise: reading.sunrise,
            sunset: reading.sunset,
            window,
        })
    }
}
