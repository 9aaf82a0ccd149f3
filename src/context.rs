//! Wiring of configured components shared by the CLI and the HTTP API

use std::sync::Arc;
use tracing::info;

use crate::Result;
use crate::cache::{FallbackStore, SharedStore};
use crate::config::RahuConfig;
use crate::forecast::ForecastAssembler;
use crate::forecast_cache::ForecastCache;
use crate::geocoding::NominatimClient;
use crate::models::Coordinates;
use crate::preferences::Preferences;
use crate::session::{ForecastSession, SessionSettings};
use crate::solar::{self, SolarTimeProvider};
use crate::solar_cache::SolarCache;

#[derive(Clone)]
pub struct AppContext {
    pub config: RahuConfig,
    pub store: SharedStore,
    pub assembler: Arc<ForecastAssembler>,
    pub forecast_cache: ForecastCache,
    pub geocoder: Arc<NominatimClient>,
    pub preferences: Preferences,
}

impl AppContext {
    /// Open the store and build every component from `config`
    pub fn from_config(config: RahuConfig) -> Result<Self> {
        let store = if config.cache.enabled {
            FallbackStore::open(&config.cache.location)
        } else {
            FallbackStore::in_memory()
        };
        if store.is_persistent() {
            info!("Cache stored at {}", config.cache.location);
        } else {
            info!("Cache kept in memory for this run");
        }
        let store: SharedStore = Arc::new(store);
        let provider = solar::from_config(&config)?;
        Self::with_parts(config, store, provider)
    }

    /// Build around an explicit store and provider
    pub fn with_parts(
        config: RahuConfig,
        store: SharedStore,
        provider: Arc<dyn SolarTimeProvider>,
    ) -> Result<Self> {
        info!("Using solar provider {}", provider.name());
        let assembler = ForecastAssembler::new(provider, SolarCache::new(Arc::clone(&store)))
            .with_max_days(config.forecast.max_days as usize);
        let geocoder = NominatimClient::new(&config.geocoding, Arc::clone(&store))?;
        let preferences = Preferences::new(
            Arc::clone(&store),
            config.forecast.alert_offset_minutes,
        );

        Ok(Self {
            forecast_cache: ForecastCache::new(Arc::clone(&store)),
            assembler: Arc::new(assembler),
            geocoder: Arc::new(geocoder),
            preferences,
            store,
            config,
        })
    }

    /// New session at `coords`, sized by the forecast settings
    #[must_use]
    pub fn session(&self, coords: Coordinates) -> ForecastSession {
        ForecastSession::new(
            Arc::clone(&self.assembler),
            self.forecast_cache.clone(),
            SessionSettings::from(&self.config.forecast),
            coords,
        )
    }

    /// Fill in a missing label by reverse geocoding
    pub async fn labelled(&self, mut coords: Coordinates) -> Coordinates {
        if coords.label.is_none() {
            coords.label = Some(
                self.geocoder
                    .resolve_label(coords.latitude, coords.longitude)
                    .await,
            );
        }
        coords
    }
}
