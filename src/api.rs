use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::db::{DbError, Observation};
use crate::fetch_error::FetchError;
use crate::fetcher::{CurrentWeather, ForecastSlot};
use crate::services::WeatherService;

#[derive(Clone)]
pub struct AppState {
    pub weather_service: WeatherService,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct CurrentResponse {
    pub success: bool,
    pub data: CurrentWeather,
}

#[derive(Serialize)]
pub struct ForecastResponse {
    pub success: bool,
    pub city: String,
    pub data: Vec<ForecastSlot>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<Observation>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct CitiesResponse {
    pub success: bool,
    pub data: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub days: Option<i64>,
}

/// Errors surfaced to clients as the `{success:false, message}` envelope.
/// Status codes are decided here and nowhere else.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::CityNotFound(message) => ApiError::NotFound(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

pub fn create_router(state: AppState) -> Router {
    let weather_routes = Router::new()
        .route("/current/{city}", get(get_current))
        .route("/forecast/{city}", get(get_forecast))
        .route("/history/{city}", get(get_history))
        .route("/cities", get(get_cities))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api/weather", weather_routes)
}

#[instrument]
async fn health() -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state), fields(city = %city))]
async fn get_current(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<CurrentResponse>, ApiError> {
    debug!("Fetching current weather for {}", city);

    let data = state.weather_service.current(&city).await.map_err(|e| {
        warn!("Current weather request for {} failed: {}", city, e);
        ApiError::from(e)
    })?;

    info!(
        "Retrieved current weather for {}: {} at {:.1} C",
        data.city, data.condition, data.temperature
    );

    Ok(Json(CurrentResponse {
        success: true,
        data,
    }))
}

#[instrument(skip(state), fields(city = %city))]
async fn get_forecast(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<ForecastResponse>, ApiError> {
    debug!("Fetching forecast for {}", city);

    let (resolved_city, data) = state.weather_service.forecast(&city).await.map_err(|e| {
        warn!("Forecast request for {} failed: {}", city, e);
        ApiError::from(e)
    })?;

    info!(
        "Retrieved {} forecast slots for {}",
        data.len(),
        resolved_city
    );

    Ok(Json(ForecastResponse {
        success: true,
        city: resolved_city,
        data,
    }))
}

#[instrument(skip(state), fields(city = %city))]
async fn get_history(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let days = params.days.unwrap_or(7);
    debug!("Fetching {} days of history for {}", days, city);

    let data = state
        .weather_service
        .history(&city, days)
        .await
        .map_err(|e| {
            error!("Failed to fetch history for {}: {}", city, e);
            ApiError::from(e)
        })?;

    info!("Retrieved {} stored observations for {}", data.len(), city);

    let count = data.len();
    Ok(Json(HistoryResponse {
        success: true,
        data,
        count,
    }))
}

#[instrument(skip(state))]
async fn get_cities(State(state): State<AppState>) -> Result<Json<CitiesResponse>, ApiError> {
    debug!("Fetching latest observation per city");

    let data = state.weather_service.latest_per_city().await.map_err(|e| {
        error!("Failed to fetch latest observations per city: {}", e);
        ApiError::from(e)
    })?;

    info!("Retrieved latest observations for {} cities", data.len());

    Ok(Json(CitiesResponse {
        success: true,
        data,
    }))
}
