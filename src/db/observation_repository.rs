use sqlx::MySqlPool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, Observation};
use crate::fetcher::CurrentWeather;

#[derive(Clone)]
pub struct ObservationRepository {
    pool: MySqlPool,
}

impl ObservationRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert one observation. `date_time` and `country` are omitted: the
    /// timestamp is the column default and the country is never persisted.
    #[instrument(skip(self, weather), fields(city = %weather.city))]
    pub async fn insert_observation(&self, weather: &CurrentWeather) -> Result<(), DbError> {
        debug!("Inserting observation for {}", weather.city);

        sqlx::query(
            r#"
            INSERT INTO weather
            (city, temperature, humidity, wind_speed, pressure,
             weather_condition, description, icon)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&weather.city)
        .bind(weather.temperature)
        .bind(weather.humidity)
        .bind(weather.wind_speed)
        .bind(weather.pressure)
        .bind(&weather.condition)
        .bind(&weather.description)
        .bind(&weather.icon)
        .execute(&self.pool)
        .await?;

        info!("Stored observation for {}", weather.city);
        Ok(())
    }

    /// Rows for a city within the trailing `days` window, newest first,
    /// capped at 100.
    #[instrument(skip(self))]
    pub async fn find_history(&self, city: &str, days: i64) -> Result<Vec<Observation>, DbError> {
        debug!("Querying {} days of history for {}", days, city);

        let observations = sqlx::query_as::<_, Observation>(
            r#"
            SELECT id, city, temperature, humidity, wind_speed, pressure,
                   weather_condition, description, icon, date_time
            FROM weather
            WHERE city = ?
              AND date_time >= DATE_SUB(NOW(), INTERVAL ? DAY)
            ORDER BY date_time DESC
            LIMIT 100
            "#,
        )
        .bind(city)
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} observations for {}", observations.len(), city);
        Ok(observations)
    }

    /// The most recent row for every distinct city, ordered by city name.
    #[instrument(skip(self))]
    pub async fn find_latest_per_city(&self) -> Result<Vec<Observation>, DbError> {
        debug!("Querying latest observation per city");

        let observations = sqlx::query_as::<_, Observation>(
            r#"
            SELECT w1.id, w1.city, w1.temperature, w1.humidity, w1.wind_speed,
                   w1.pressure, w1.weather_condition, w1.description, w1.icon,
                   w1.date_time
            FROM weather w1
            INNER JOIN (
                SELECT city, MAX(date_time) AS max_date
                FROM weather
                GROUP BY city
            ) w2 ON w1.city = w2.city AND w1.date_time = w2.max_date
            ORDER BY w1.city ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} cities with observations", observations.len());
        Ok(observations)
    }
}
