//! JSON endpoints under `/api`

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::RahuError;
use crate::context::AppContext;
use crate::geocoding::PlaceMatch;
use crate::models::{Coordinates, DayEntry, WindowStatus};

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/today", get(get_today))
        .route("/forecast", get(get_forecast))
        .route("/search", get(search_places))
        .route("/label", get(get_label))
        .with_state(ctx)
}

/// [`RahuError`] rendered as a JSON error response
pub struct ApiError(RahuError);

impl From<RahuError> for ApiError {
    fn from(e: RahuError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RahuError::Validation { .. } | RahuError::NonContiguousExtension => {
                StatusCode::BAD_REQUEST
            }
            RahuError::InvalidSolarData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RahuError::Provider { .. } | RahuError::Parse { .. } => StatusCode::BAD_GATEWAY,
            RahuError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Rejected request: {}", self.0);
        }
        let body = json!({
            "error": self.0.user_message(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    lat: f64,
    lng: f64,
    label: Option<String>,
    days: Option<usize>,
}

impl LocationQuery {
    fn coordinates(&self) -> Result<Coordinates, RahuError> {
        let coords = Coordinates {
            latitude: self.lat,
            longitude: self.lng,
            label: self.label.clone(),
        };
        coords.validate()?;
        Ok(coords)
    }
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub location: Coordinates,
    pub entry: DayEntry,
    pub status: WindowStatus,
    pub remaining: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub location: Coordinates,
    pub days: Vec<DayEntry>,
}

async fn get_today(
    State(ctx): State<AppContext>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<TodayResponse>, ApiError> {
    let coords = ctx.labelled(query.coordinates()?).await;
    let session = ctx.session(coords);
    session.load().await?;

    let snapshot = session.snapshot();
    let entry = snapshot
        .today
        .ok_or_else(|| RahuError::provider("today's window is not available"))?;
    let now = Utc::now();
    Ok(Json(TodayResponse {
        location: snapshot.coords,
        status: entry.window.status_at(now),
        remaining: entry.window.describe_remaining(now),
        entry,
    }))
}

async fn get_forecast(
    State(ctx): State<AppContext>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let coords = ctx.labelled(query.coordinates()?).await;
    let days = query
        .days
        .unwrap_or(ctx.config.forecast.initial_days as usize)
        .clamp(1, ctx.assembler.max_days());

    let session = ctx.session(coords);
    session.load().await?;
    while session.snapshot().forecast.len() < days && session.has_more() {
        if !session.load_more().await {
            break;
        }
    }

    let snapshot = session.snapshot();
    let mut forecast = snapshot.forecast;
    forecast.truncate(days);
    Ok(Json(ForecastResponse {
        location: snapshot.coords,
        days: forecast.into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

async fn search_places(
    State(ctx): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<PlaceMatch>> {
    Json(ctx.geocoder.search_by_name(&query.q).await)
}

#[derive(Debug, Deserialize)]
pub struct LabelQuery {
    lat: f64,
    lng: f64,
}

async fn get_label(
    State(ctx): State<AppContext>,
    Query(query): Query<LabelQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Coordinates::new(query.lat, query.lng).validate()?;
    let label = ctx.geocoder.resolve_label(query.lat, query.lng).await;
    Ok(Json(json!({ "label": label })))
}
