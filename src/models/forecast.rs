//! Multi-day forecast of Rahu Kaal windows

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::DayEntry;
use crate::{RahuError, Result};

/// Ordered run of [`DayEntry`] values.
///
/// Dates are strictly increasing with no gaps and no duplicates. Serialized as a plain JSON
/// list; deserializing a list that breaks the ordering fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DayEntry>", into = "Vec<DayEntry>")]
pub struct Forecast {
    entries: Vec<DayEntry>,
}

impl Forecast {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forecast from entries that must already be contiguous and ascending
    pub fn from_entries(entries: Vec<DayEntry>) -> Result<Self> {
        for pair in entries.windows(2) {
            let expected = pair[0].date.checked_add_days(Days::new(1));
            if expected != Some(pair[1].date) {
                return Err(RahuError::validation(format!(
                    "forecast dates must be contiguous: {} is followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { entries })
    }

    #[must_use]
    pub fn entries(&self) -> &[DayEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&DayEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DayEntry> {
        self.entries.last()
    }

    /// The date an extension of this forecast would start at
    #[must_use]
    pub fn next_date(&self) -> Option<NaiveDate> {
        self.last()
            .and_then(|entry| entry.date.checked_add_days(Days::new(1)))
    }

    /// Entry for a given date, if covered
    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DayEntry> {
        let first = self.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.entries.get(offset)
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    /// Append a batch that starts the day after this forecast ends
    pub fn append(&mut self, batch: Forecast) -> Result<()> {
        if let (Some(next), Some(first)) = (self.next_date(), batch.first()) {
            if first.date != next {
                return Err(RahuError::validation(format!(
                    "batch starting {} does not continue forecast ending {}",
                    first.date,
                    next.pred_opt().unwrap_or(next)
                )));
            }
        }
        self.entries.extend(batch.entries);
        Ok(())
    }

    /// Drop entries dated before `date`
    #[must_use]
    pub fn starting_from(mut self, date: NaiveDate) -> Self {
        self.entries.retain(|entry| entry.date >= date);
        self
    }

    /// Keep at most `max_days` entries from the front
    pub fn truncate(&mut self, max_days: usize) {
        self.entries.truncate(max_days);
    }
}

impl TryFrom<Vec<DayEntry>> for Forecast {
    type Error = RahuError;

    fn try_from(entries: Vec<DayEntry>) -> Result<Self> {
        Self::from_entries(entries)
    }
}

impl From<Forecast> for Vec<DayEntry> {
    fn from(forecast: Forecast) -> Self {
        forecast.entries
    }
}

impl<'a> IntoIterator for &'a Forecast {
    type Item = &'a DayEntry;
    type IntoIter = std::slice::Iter<'a, DayEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
