//! Remembered user choices: last location and alert offset

use tracing::info;

use crate::cache::{self, SharedStore};
use crate::config::ALERT_OFFSETS;
use crate::models::Coordinates;
use crate::{RahuError, Result};

const COORDS_KEY: &str = "user_coords";
const ALERT_OFFSET_KEY: &str = "alert_offset";

/// Location used until the user picks one
#[must_use]
pub fn default_location() -> Coordinates {
    Coordinates::with_label(28.6139, 77.2090, "New Delhi (Default)")
}

#[derive(Clone)]
pub struct Preferences {
    store: SharedStore,
    default_offset: u32,
}

impl Preferences {
    #[must_use]
    pub fn new(store: SharedStore, default_offset: u32) -> Self {
        Self {
            store,
            default_offset,
        }
    }

    /// Whether the user has ever chosen a location
    pub async fn has_location(&self) -> bool {
        cache::get_json::<Coordinates>(self.store.as_ref(), COORDS_KEY)
            .await
            .is_some()
    }

    /// Last saved location, or [`default_location`]. Saved values that fail validation are ignored.
    pub async fn location(&self) -> Coordinates {
        cache::get_json::<Coordinates>(self.store.as_ref(), COORDS_KEY)
            .await
            .filter(|coords| coords.validate().is_ok())
            .unwrap_or_else(default_location)
    }

    pub async fn set_location(&self, coords: &Coordinates) -> Result<()> {
        coords.validate()?;
        cache::put_json(self.store.as_ref(), COORDS_KEY, coords).await;
        info!("Saved location {}", coords.display_name());
        Ok(())
    }

    pub async fn alert_offset(&self) -> u32 {
        cache::get_json::<u32>(self.store.as_ref(), ALERT_OFFSET_KEY)
            .await
            .filter(|offset| ALERT_OFFSETS.contains(offset))
            .unwrap_or(self.default_offset)
    }

    pub async fn set_alert_offset(&self, minutes: u32) -> Result<()> {
        if !ALERT_OFFSETS.contains(&minutes) {
            return Err(RahuError::validation(format!(
                "alert offset {minutes} must be one of {ALERT_OFFSETS:?} minutes"
            )));
        }
        cache::put_json(self.store.as_ref(), ALERT_OFFSET_KEY, &minutes).await;
        Ok(())
    }
}
