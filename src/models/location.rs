//! Location model for geographic coordinates and cache bucketing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RahuError, Result};

/// Decimal places kept for cache identity (~110m)
pub const BUCKET_PRECISION: u32 = 3;

/// Location coordinates chosen by the user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[serde(alias = "lng")]
    pub longitude: f64,
    /// Display label (city, region, etc.), not part of cache identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Coordinates {
    /// Create new coordinates without a label
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            label: None,
        }
    }

    /// Create coordinates with a display label
    #[must_use]
    pub fn with_label<S: Into<String>>(latitude: f64, longitude: f64, label: S) -> Self {
        Self {
            latitude,
            longitude,
            label: Some(label.into()),
        }
    }

    /// Validate latitude/longitude ranges
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RahuError::validation(format!(
                "latitude {} must be between -90 and 90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(RahuError::validation(format!(
                "longitude {} must be between -180 and 180",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Cache identity of these coordinates
    #[must_use]
    pub fn bucket(&self) -> LocationBucket {
        LocationBucket::from_degrees(self.latitude, self.longitude)
    }

    /// Label if present, otherwise the formatted coordinates
    #[must_use]
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{:.4}, {:.4}", self.latitude, self.longitude))
    }
}

/// Coordinates rounded to [`BUCKET_PRECISION`] decimals, stored as thousandths of a degree.
///
/// Keeping integers avoids float equality problems and renders `-0.0004` as `0.000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationBucket {
    lat_milli: i32,
    lng_milli: i32,
}

impl LocationBucket {
    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        let scale = 10_f64.powi(BUCKET_PRECISION as i32);
        Self {
            lat_milli: (latitude * scale).round() as i32,
            lng_milli: (longitude * scale).round() as i32,
        }
    }

    /// Rounded latitude in degrees
    #[must_use]
    pub fn latitude(&self) -> f64 {
        f64::from(self.lat_milli) / 1000.0
    }

    /// Rounded longitude in degrees
    #[must_use]
    pub fn longitude(&self) -> f64 {
        f64::from(self.lng_milli) / 1000.0
    }
}

fn fmt_milli(value: i32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
}

/// Renders as `{lat}_{lng}` with three decimals each, the form used inside cache keys
impl fmt::Display for LocationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_milli(self.lat_milli, f)?;
        f.write_str("_")?;
        fmt_milli(self.lng_milli, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_rounds_to_three_decimals() {
        let coords = Coordinates::new(28.613_9, 77.209_0);
        assert_eq!(coords.bucket().to_string(), "28.614_77.209");
    }

    #[test]
    fn test_bucket_ignores_label() {
        let a = Coordinates::with_label(12.971_62, 77.594_56, "Bengaluru");
        let b = Coordinates::new(12.971_64, 77.594_61);
        assert_eq!(a.bucket(), b.bucket());
    }

    #[test]
    fn test_bucket_negative_values() {
        let bucket = LocationBucket::from_degrees(-33.868_82, -0.000_4);
        assert_eq!(bucket.to_string(), "-33.869_0.000");
        assert_eq!(bucket.latitude(), -33.869);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Coordinates::new(51.5, -0.12).validate().is_ok());
        assert!(Coordinates::new(91.0, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, 181.0).validate().is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_deserialize_short_field_names() {
        let coords: Coordinates =
            serde_json::from_str(r#"{"lat": 28.6139, "lng": 77.209, "label": "New Delhi"}"#)
                .unwrap();
        assert_eq!(coords.latitude, 28.6139);
        assert_eq!(coords.display_name(), "New Delhi");
    }
}
