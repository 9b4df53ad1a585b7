use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One persisted weather reading. `date_time` is assigned by the database at
/// insert; rows are never updated or deleted. Every data column except the
/// city is nullable in the schema, so they decode as options.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Observation {
    pub id: i32,
    pub city: String,
    pub temperature: Option<f64>,
    pub humidity: Option<i32>,
    pub wind_speed: Option<f64>,
    pub pressure: Option<i32>,
    pub weather_condition: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub date_time: DateTime<Utc>,
}
