//! Persisted forecasts per location bucket, served instantly on reload

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::cache::{self, SharedStore};
use crate::models::{Forecast, LocationBucket};

#[derive(Clone)]
pub struct ForecastCache {
    store: SharedStore,
}

impl ForecastCache {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// `forecast_{lat}_{lng}`
    #[must_use]
    pub fn key(bucket: &LocationBucket) -> String {
        format!("forecast_{bucket}")
    }

    /// Stored forecast with days before the local calendar day removed
    pub async fn load(&self, bucket: &LocationBucket) -> Forecast {
        self.load_as_of(bucket, Local::now().date_naive()).await
    }

    /// Stored forecast with days before `today` removed. Absent or unreadable entries load empty.
    pub async fn load_as_of(&self, bucket: &LocationBucket, today: NaiveDate) -> Forecast {
        let stored: Forecast = cache::get_json(self.store.as_ref(), &Self::key(bucket))
            .await
            .unwrap_or_default();
        let total = stored.len();
        let fresh = stored.starting_from(today);
        debug!(
            "Loaded cached forecast for {bucket}: {} of {total} days still current",
            fresh.len()
        );
        fresh
    }

    /// Persist the full forecast, replacing any previous one for the bucket
    pub async fn save(&self, bucket: &LocationBucket, forecast: &Forecast) {
        cache::put_json(self.store.as_ref(), &Self::key(bucket), forecast).await;
    }

    pub async fn clear(&self, bucket: &LocationBucket) {
        if let Err(e) = self.store.remove(&Self::key(bucket)).await {
            tracing::warn!("Failed to clear cached forecast for {bucket}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKeyValueStore;
    use crate::calculator::WindowCalculator;
    use crate::models::SolarReading;
    use chrono::{Days, TimeZone, Utc};
    use std::sync::Arc;

    fn forecast_from(start: NaiveDate, days: u64) -> Forecast {
        let entries = (0..days)
            .map(|offset| {
                let date = start.checked_add_days(Days::new(offset)).unwrap();
                let sunrise = Utc.from_utc_datetime(&date.and_hms_opt(1, 30, 0).unwrap());
                let sunset = Utc.from_utc_datetime(&date.and_hms_opt(12, 30, 0).unwrap());
                WindowCalculator::day_entry(SolarReading::new(sunrise, sunset), date).unwrap()
            })
            .collect();
        Forecast::from_entries(entries).unwrap()
    }

    fn cache() -> ForecastCache {
        ForecastCache::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn test_key_format() {
        let bucket = LocationBucket::from_degrees(-33.8688, 151.2093);
        assert_eq!(ForecastCache::key(&bucket), "forecast_-33.869_151.209");
    }

    #[tokio::test]
    async fn test_missing_forecast_loads_empty() {
        let bucket = LocationBucket::from_degrees(1.0, 2.0);
        assert!(cache().load(&bucket).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_days_are_filtered() {
        let cache = cache();
        let bucket = LocationBucket::from_degrees(28.6139, 77.209);
        let yesterday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        cache.save(&bucket, &forecast_from(yesterday, 2)).await;

        let loaded = cache.load_as_of(&bucket, today).await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.first().map(|e| e.date), Some(today));
        assert!(loaded.covers(today));
    }

    #[tokio::test]
    async fn test_fully_stale_forecast_does_not_cover_today() {
        let cache = cache();
        let bucket = LocationBucket::from_degrees(28.6139, 77.209);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        cache.save(&bucket, &forecast_from(start, 7)).await;

        let today = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        let loaded = cache.load_as_of(&bucket, today).await;
        assert!(loaded.is_empty());
        assert!(!loaded.covers(today));
    }

    #[tokio::test]
    async fn test_save_replaces_with_extended_range() {
        let cache = cache();
        let bucket = LocationBucket::from_degrees(28.6139, 77.209);
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        cache.save(&bucket, &forecast_from(start, 7)).await;
        cache.save(&bucket, &forecast_from(start, 14)).await;

        let loaded = cache.load_as_of(&bucket, start).await;
        assert_eq!(loaded, forecast_from(start, 14));

        cache.clear(&bucket).await;
        assert!(cache.load_as_of(&bucket, start).await.is_empty());
    }
}
