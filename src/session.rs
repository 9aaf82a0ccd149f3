//! The active location and its forecast.
//!
//! A session serves a cached forecast immediately when it still covers today, otherwise fetches
//! today first and the rest of the initial batch after it. Changing location bumps a generation
//! counter; results from loads started under an older generation are dropped.

use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::forecast::ForecastAssembler;
use crate::forecast_cache::ForecastCache;
use crate::models::{Coordinates, DayEntry, Forecast};
use crate::notification::AlertRequest;
use crate::{RahuError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// How a load cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Today was served from the persisted forecast
    FromCache,
    /// Today was fetched (the rest of the batch may have been cut short)
    Fetched,
    /// The location changed while loading; nothing was applied
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub initial_days: usize,
    pub batch_days: usize,
    pub max_days: usize,
}

impl From<&ForecastConfig> for SessionSettings {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            initial_days: config.initial_days as usize,
            batch_days: config.batch_days as usize,
            max_days: config.max_days as usize,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        (&ForecastConfig::default()).into()
    }
}

/// Point-in-time copy of the session for rendering
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub coords: Coordinates,
    pub today: Option<DayEntry>,
    pub forecast: Forecast,
    pub status: LoadStatus,
    #[serde(skip)]
    pub last_error: Option<RahuError>,
}

impl SessionSnapshot {
    fn new(coords: Coordinates) -> Self {
        Self {
            coords,
            today: None,
            forecast: Forecast::new(),
            status: LoadStatus::Idle,
            last_error: None,
        }
    }
}

pub struct ForecastSession {
    assembler: Arc<ForecastAssembler>,
    forecast_cache: ForecastCache,
    settings: SessionSettings,
    generation: AtomicU64,
    loading_more: AtomicBool,
    state: RwLock<SessionSnapshot>,
}

impl ForecastSession {
    #[must_use]
    pub fn new(
        assembler: Arc<ForecastAssembler>,
        forecast_cache: ForecastCache,
        settings: SessionSettings,
        coords: Coordinates,
    ) -> Self {
        Self {
            assembler,
            forecast_cache,
            settings,
            generation: AtomicU64::new(0),
            loading_more: AtomicBool::new(false),
            state: RwLock::new(SessionSnapshot::new(coords)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().clone()
    }

    #[must_use]
    pub fn coords(&self) -> Coordinates {
        self.state.read().coords.clone()
    }

    /// Switch location. Loads still running for the previous location are discarded.
    pub fn set_location(&self, coords: Coordinates) -> Result<()> {
        coords.validate()?;
        let mut state = self.state.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("Location changed to {}", coords.display_name());
        *state = SessionSnapshot::new(coords);
        Ok(())
    }

    /// Whether "load more" can add days
    #[must_use]
    pub fn has_more(&self) -> bool {
        let state = self.state.read();
        !state.forecast.is_empty() && state.forecast.len() < self.settings.max_days
    }

    /// Alert data for today's window, if today is loaded
    #[must_use]
    pub fn alert_request(&self, offset_minutes: u32) -> Option<AlertRequest> {
        self.state
            .read()
            .today
            .as_ref()
            .map(|entry| AlertRequest::for_day(entry, offset_minutes))
    }

    pub async fn load(&self) -> Result<LoadOutcome> {
        self.load_as_of(Local::now().date_naive()).await
    }

    /// Run one load cycle for `today`.
    ///
    /// Returns an error only when today's entry could not be obtained; previously loaded data is
    /// kept in that case.
    pub async fn load_as_of(&self, today: NaiveDate) -> Result<LoadOutcome> {
        let (generation, coords) = {
            let state = self.state.read();
            (self.generation.load(Ordering::SeqCst), state.coords.clone())
        };
        let bucket = coords.bucket();

        let cached = self.forecast_cache.load_as_of(&bucket, today).await;
        if let Some(entry) = cached.get(today).cloned() {
            debug!("Serving {} cached days for {bucket}", cached.len());
            let applied = self.apply(generation, |state| {
                state.today = Some(entry);
                state.forecast = cached.clone();
                state.status = LoadStatus::Success;
                state.last_error = None;
            });
            if !applied {
                return Ok(LoadOutcome::Superseded);
            }

            if let Some(forecast) = self.top_up(&coords, &cached).await {
                if !self.apply(generation, |state| state.forecast = forecast.clone()) {
                    return Ok(LoadOutcome::Superseded);
                }
                self.forecast_cache.save(&bucket, &forecast).await;
            }
            return Ok(LoadOutcome::FromCache);
        }

        if !self.apply(generation, |state| state.status = LoadStatus::Loading) {
            return Ok(LoadOutcome::Superseded);
        }

        let entry = match self.assembler.build_day(&coords, today).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to load today's window for {bucket}: {e}");
                let applied = self.apply(generation, |state| {
                    state.status = if state.today.is_some() {
                        LoadStatus::Success
                    } else {
                        LoadStatus::Error
                    };
                    state.last_error = Some(e.clone());
                });
                return if applied {
                    Err(e)
                } else {
                    Ok(LoadOutcome::Superseded)
                };
            }
        };

        let applied = self.apply(generation, |state| {
            state.today = Some(entry);
            state.status = LoadStatus::Success;
            state.last_error = None;
        });
        if !applied {
            return Ok(LoadOutcome::Superseded);
        }

        match self
            .assembler
            .build_range(&coords, today, self.settings.initial_days)
            .await
        {
            Ok(forecast) => {
                if !self.apply(generation, |state| state.forecast = forecast.clone()) {
                    return Ok(LoadOutcome::Superseded);
                }
                self.forecast_cache.save(&bucket, &forecast).await;
            }
            Err(e) => warn!("Forecast batch for {bucket} failed after today loaded: {e}"),
        }

        Ok(LoadOutcome::Fetched)
    }

    /// Append the next batch of days. Returns `false` when nothing was added.
    ///
    /// A failed batch keeps the loaded forecast and is recorded in `last_error`.
    pub async fn load_more(&self) -> bool {
        if self.loading_more.swap(true, Ordering::SeqCst) {
            debug!("Load more already in progress");
            return false;
        }
        let added = self.load_more_inner().await;
        self.loading_more.store(false, Ordering::SeqCst);
        added
    }

    async fn load_more_inner(&self) -> bool {
        let (generation, coords, forecast) = {
            let state = self.state.read();
            (
                self.generation.load(Ordering::SeqCst),
                state.coords.clone(),
                state.forecast.clone(),
            )
        };
        if forecast.is_empty() || forecast.len() >= self.settings.max_days {
            return false;
        }

        let extended = match self
            .assembler
            .extend(&coords, &forecast, self.settings.batch_days)
            .await
        {
            Ok(extended) => extended,
            Err(e) => {
                warn!("Failed to load more days after {}: {e}", forecast.len());
                self.apply(generation, |state| state.last_error = Some(e));
                return false;
            }
        };
        if extended.len() == forecast.len() {
            return false;
        }
        if !self.apply(generation, |state| state.forecast = extended.clone()) {
            return false;
        }
        self.forecast_cache.save(&coords.bucket(), &extended).await;
        info!("Forecast extended to {} days", extended.len());
        true
    }

    /// Days needed to grow a cached forecast back to the initial batch size.
    /// `None` when nothing is missing or the fetch failed.
    async fn top_up(&self, coords: &Coordinates, cached: &Forecast) -> Option<Forecast> {
        let missing = self.settings.initial_days.saturating_sub(cached.len());
        if missing == 0 {
            return None;
        }
        match self.assembler.extend(coords, cached, missing).await {
            Ok(extended) => Some(extended),
            Err(e) => {
                warn!("Could not refresh days beyond the cached forecast: {e}");
                None
            }
        }
    }

    /// Apply `update` if no location change happened since `generation` was read
    fn apply(&self, generation: u64, update: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding results of a superseded load");
            return false;
        }
        update(&mut state);
        true
    }
}
