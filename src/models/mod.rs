//! Data models for the Rahu Kaal engine
//!
//! - Location: coordinates and the rounded cache bucket
//! - Day: solar readings, windows and computed day entries
//! - Forecast: ordered, contiguous runs of day entries

pub mod day;
pub mod forecast;
pub mod location;

pub use day::{DayEntry, InauspiciousWindow, SolarReading, WindowStatus};
pub use forecast::Forecast;
pub use location::{Coordinates, LocationBucket};
