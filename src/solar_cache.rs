//! Memo of provider readings per location bucket and calendar date

use chrono::NaiveDate;
use tracing::debug;

use crate::cache::{self, SharedStore};
use crate::models::{LocationBucket, SolarReading};

#[derive(Clone)]
pub struct SolarCache {
    store: SharedStore,
}

impl SolarCache {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// `solar_{lat}_{lng}_{YYYY-MM-DD}`
    #[must_use]
    pub fn key(bucket: &LocationBucket, date: NaiveDate) -> String {
        format!("solar_{bucket}_{}", date.format("%Y-%m-%d"))
    }

    pub async fn get(&self, bucket: &LocationBucket, date: NaiveDate) -> Option<SolarReading> {
        let reading = cache::get_json(self.store.as_ref(), &Self::key(bucket, date)).await;
        if reading.is_some() {
            debug!("Solar cache hit for {bucket} on {date}");
        }
        reading
    }

    /// Store a reading. Writes for the same key are idempotent and never fail the caller.
    pub async fn put(&self, bucket: &LocationBucket, date: NaiveDate, reading: &SolarReading) {
        cache::put_json(self.store.as_ref(), &Self::key(bucket, date), reading).await;
    }
}
