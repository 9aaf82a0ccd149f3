//! Forecast assembly
//!
//! Turns coordinates and a date range into a [`Forecast`]: each date is served from the
//! [`SolarCache`] when possible, otherwise fetched from the provider, stored, and run through the
//! [`WindowCalculator`]. Dates in one batch are fetched concurrently.

use chrono::{Days, NaiveDate, TimeDelta};
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::calculator::WindowCalculator;
use crate::models::{Coordinates, DayEntry, Forecast, SolarReading};
use crate::solar::SolarTimeProvider;
use crate::solar_cache::SolarCache;
use crate::{RahuError, Result};

/// Default upper bound on forecast length
pub const MAX_FORECAST_DAYS: usize = 28;

type InFlight = Shared<BoxFuture<'static, Result<SolarReading>>>;

pub struct ForecastAssembler {
    provider: Arc<dyn SolarTimeProvider>,
    solar_cache: SolarCache,
    max_days: usize,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl ForecastAssembler {
    #[must_use]
    pub fn new(provider: Arc<dyn SolarTimeProvider>, solar_cache: SolarCache) -> Self {
        Self {
            provider,
            solar_cache,
            max_days: MAX_FORECAST_DAYS,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_max_days(mut self, max_days: usize) -> Self {
        self.max_days = max_days;
        self
    }

    #[must_use]
    pub fn max_days(&self) -> usize {
        self.max_days
    }

    /// Reading for one date, from cache or provider.
    ///
    /// Concurrent callers asking for the same bucket and date share a single provider call.
    pub async fn reading(&self, coords: &Coordinates, date: NaiveDate) -> Result<SolarReading> {
        let bucket = coords.bucket();
        if let Some(reading) = self.solar_cache.get(&bucket, date).await {
            return Ok(reading);
        }

        let key = SolarCache::key(&bucket, date);
        let fetch = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(key.clone())
                .or_insert_with(|| {
                    let provider = Arc::clone(&self.provider);
                    let cache = self.solar_cache.clone();
                    let (latitude, longitude) = (coords.latitude, coords.longitude);
                    async move {
                        debug!("Fetching {bucket} on {date} from {}", provider.name());
                        let reading = provider.fetch(latitude, longitude, date).await?;
                        // never cache readings the calculator would reject
                        if reading.daylight() <= TimeDelta::zero() {
                            return Err(RahuError::invalid_solar_data(
                                date,
                                reading.sunrise,
                                reading.sunset,
                            ));
                        }
                        cache.put(&bucket, date, &reading).await;
                        Ok(reading)
                    }
                    .boxed()
                    .shared()
                })
                .clone()
        };

        let result = fetch.clone().await;
        self.release(&key, &fetch);
        result
    }

    /// Drop the in-flight entry for `key` unless a newer fetch has replaced it
    fn release(&self, key: &str, fetch: &InFlight) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|current| current.ptr_eq(fetch)) {
            in_flight.remove(key);
        }
    }

    /// Compute the entry for a single date
    pub async fn build_day(&self, coords: &Coordinates, date: NaiveDate) -> Result<DayEntry> {
        let reading = self.reading(coords, date).await?;
        WindowCalculator::day_entry(reading, date)
    }

    /// Forecast of `day_count` consecutive days starting at `start`.
    ///
    /// Fails only when `start` itself cannot be computed. A later failure cuts the result at the
    /// last day before it, so the forecast never contains gaps.
    #[instrument(skip(self, coords), fields(bucket = %coords.bucket()))]
    pub async fn build_range(
        &self,
        coords: &Coordinates,
        start: NaiveDate,
        day_count: usize,
    ) -> Result<Forecast> {
        coords.validate()?;
        let day_count = day_count.min(self.max_days);

        let dates: Vec<NaiveDate> = (0..day_count as u64)
            .map_while(|offset| start.checked_add_days(Days::new(offset)))
            .collect();

        let results = join_all(dates.iter().map(|date| self.build_day(coords, *date))).await;

        let mut entries = Vec::with_capacity(results.len());
        for (date, result) in dates.iter().zip(results) {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) if entries.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Stopping forecast at {date}: {e}");
                    break;
                }
            }
        }

        info!(
            "Assembled {} of {day_count} days starting {start}",
            entries.len()
        );
        Forecast::from_entries(entries)
    }

    /// Append `day_count` days after the last entry of `existing`, up to the length cap
    #[instrument(skip(self, coords, existing), fields(bucket = %coords.bucket(), existing = existing.len()))]
    pub async fn extend(
        &self,
        coords: &Coordinates,
        existing: &Forecast,
        day_count: usize,
    ) -> Result<Forecast> {
        let next = existing
            .next_date()
            .ok_or(RahuError::NonContiguousExtension)?;

        let day_count = day_count.min(self.max_days.saturating_sub(existing.len()));
        if day_count == 0 {
            debug!("Forecast already at {} days, nothing to extend", existing.len());
            return Ok(existing.clone());
        }

        let batch = self.build_range(coords, next, day_count).await?;
        let mut extended = existing.clone();
        extended.append(batch)?;
        Ok(extended)
    }
}
