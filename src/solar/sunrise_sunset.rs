//! Client for the sunrise-sunset.org JSON API

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::SolarTimeProvider;
use crate::config::ProviderConfig;
use crate::models::SolarReading;
use crate::{RahuError, Result, http};

pub struct SunriseSunsetClient {
    client: ClientWithMiddleware,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResults {
    sunrise: String,
    sunset: String,
}

impl SunriseSunsetClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = http::build_client(
            http::USER_AGENT,
            Duration::from_secs(config.timeout_seconds.into()),
            config.max_retries,
        )?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, latitude: f64, longitude: f64, date: NaiveDate) -> String {
        format!(
            "{}/json?lat={latitude}&lng={longitude}&date={}&formatted=0",
            self.base_url,
            date.format("%Y-%m-%d")
        )
    }

    /// Decode a response body into a reading
    pub fn parse_response(body: &str) -> Result<SolarReading> {
        let response: ApiResponse = serde_json::from_str(body)?;
        if response.status != "OK" {
            return Err(RahuError::provider(format!(
                "sunrise-sunset.org returned status {}",
                response.status
            )));
        }
        let results: ApiResults = serde_json::from_value(response.results)?;
        Ok(SolarReading::new(
            parse_instant(&results.sunrise)?,
            parse_instant(&results.sunset)?,
        ))
    }
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RahuError::parse(format!("invalid instant '{value}': {e}")))
}

#[async_trait]
impl SolarTimeProvider for SunriseSunsetClient {
    #[instrument(skip(self))]
    async fn fetch(&self, latitude: f64, longitude: f64, date: NaiveDate) -> Result<SolarReading> {
        let url = self.url(latitude, longitude, date);
        debug!("Calling the API: {url}");
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RahuError::provider(format!(
                "sunrise-sunset.org responded with {status}"
            )));
        }
        let body = response.text().await?;

        let elapsed = start_time.elapsed();
        if elapsed.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", elapsed.as_secs_f64());
        }

        Self::parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "sunrise-sunset.org"
    }
}
