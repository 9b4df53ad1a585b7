use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;

/// A freshly fetched reading for a city. `country` comes back from the
/// provider but is not persisted with the observation row.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    pub city: String,
    pub temperature: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    pub pressure: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub country: String,
}

/// One future-time prediction entry. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSlot {
    pub datetime: String,
    pub temperature: f64,
    pub humidity: i32,
    pub condition: String,
    pub description: String,
    pub icon: String,
}

// Provider response shapes (OpenWeatherMap)

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i32,
    pressure: i32,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    wind: OwWind,
    weather: Vec<OwCondition>,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwCondition>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwForecastCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

/// Forecast responses are capped at the provider's five-day window of
/// 3-hour slots.
const MAX_FORECAST_SLOTS: usize = 40;

#[derive(Clone)]
pub struct WeatherFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherFetcher {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch_current(&self, city: &str) -> Result<CurrentWeather, FetchError> {
        let body = self.get("weather", city).await?;
        self.map_current(&body)
    }

    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch_forecast(
        &self,
        city: &str,
    ) -> Result<(String, Vec<ForecastSlot>), FetchError> {
        let body = self.get("forecast", city).await?;
        self.map_forecast(&body)
    }

    /// Issue the provider request and return the raw success body. A non-2xx
    /// response becomes `CityNotFound`, carrying the provider's message
    /// field when present.
    async fn get(&self, endpoint: &str, city: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Sending provider request to {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("Provider responded with status {}", status);
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OwErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "City not found".to_string());
            warn!("Provider returned {} for {}: {}", status, city, message);
            return Err(FetchError::CityNotFound(message));
        }

        Ok(body)
    }

    fn map_current(&self, body: &str) -> Result<CurrentWeather, FetchError> {
        let parsed: OwCurrentResponse = serde_json::from_str(body)?;
        let condition = parsed
            .weather
            .into_iter()
            .next()
            .ok_or(FetchError::Shape("weather[0]"))?;

        Ok(CurrentWeather {
            city: parsed.name,
            temperature: parsed.main.temp,
            humidity: parsed.main.humidity,
            wind_speed: parsed.wind.speed,
            pressure: parsed.main.pressure,
            condition: condition.main,
            description: condition.description,
            icon: condition.icon,
            country: parsed.sys.country,
        })
    }

    fn map_forecast(&self, body: &str) -> Result<(String, Vec<ForecastSlot>), FetchError> {
        let parsed: OwForecastResponse = serde_json::from_str(body)?;

        let mut slots = Vec::new();
        for entry in parsed.list.into_iter().take(MAX_FORECAST_SLOTS) {
            let condition = entry
                .weather
                .into_iter()
                .next()
                .ok_or(FetchError::Shape("weather[0]"))?;

            slots.push(ForecastSlot {
                datetime: entry.dt_txt,
                temperature: entry.main.temp,
                humidity: entry.main.humidity,
                condition: condition.main,
                description: condition.description,
                icon: condition.icon,
            });
        }

        debug!("Mapped {} forecast slots", slots.len());
        Ok((parsed.city.name, slots))
    }
}
