//! Per-day solar readings and their computed Rahu Kaal windows

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Sunrise and sunset for one location bucket and one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarReading {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SolarReading {
    #[must_use]
    pub fn new(sunrise: DateTime<Utc>, sunset: DateTime<Utc>) -> Self {
        Self { sunrise, sunset }
    }

    /// Time between sunrise and sunset, negative for inverted readings
    #[must_use]
    pub fn daylight(&self) -> TimeDelta {
        self.sunset - self.sunrise
    }
}

/// The inauspicious window for one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InauspiciousWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Calendar date the window was computed for
    pub reference_date: NaiveDate,
}

impl InauspiciousWindow {
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Position of `now` relative to the window. Both bounds are inclusive.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> WindowStatus {
        if now < self.start {
            WindowStatus::Upcoming
        } else if now <= self.end {
            WindowStatus::Active
        } else {
            WindowStatus::Passed
        }
    }

    /// Short countdown such as "Starts in 2h 5m" or "Ends in 12m"
    #[must_use]
    pub fn describe_remaining(&self, now: DateTime<Utc>) -> String {
        match self.status_at(now) {
            WindowStatus::Upcoming => {
                let diff = self.start - now;
                let hours = diff.num_hours();
                let minutes = diff.num_minutes() % 60;
                if hours > 0 {
                    format!("Starts in {hours}h {minutes}m")
                } else {
                    format!("Starts in {minutes}m")
                }
            }
            WindowStatus::Active => format!("Ends in {}m", (self.end - now).num_minutes()),
            WindowStatus::Passed => "Completed for today".to_string(),
        }
    }
}

/// Where an instant falls relative to a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowStatus {
    Upcoming,
    Active,
    Passed,
}

/// One computed day of the forecast. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub window: InauspiciousWindow,
}

impl DayEntry {
    #[must_use]
    pub fn reading(&self) -> SolarReading {
        SolarReading::new(self.sunrise, self.sunset)
    }
}
