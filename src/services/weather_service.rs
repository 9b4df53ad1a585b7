use tracing::{error, instrument};

use crate::db::{DbError, Observation, ObservationRepository};
use crate::fetch_error::FetchError;
use crate::fetcher::{CurrentWeather, ForecastSlot, WeatherFetcher};

#[derive(Clone)]
pub struct WeatherService {
    fetcher: WeatherFetcher,
    observation_repo: ObservationRepository,
}

impl WeatherService {
    pub fn new(fetcher: WeatherFetcher, observation_repo: ObservationRepository) -> Self {
        Self {
            fetcher,
            observation_repo,
        }
    }

    /// Fetch current conditions and record them. The write is fire-and-forget:
    /// a persistence failure is logged and the fetched reading is still
    /// returned to the caller.
    #[instrument(skip(self))]
    pub async fn current(&self, city: &str) -> Result<CurrentWeather, FetchError> {
        let weather = self.fetcher.fetch_current(city).await?;

        if let Err(e) = self.observation_repo.insert_observation(&weather).await {
            error!("Failed to store observation for {}: {}", weather.city, e);
        }

        Ok(weather)
    }

    /// Five-day forecast in 3-hour slots, with the provider's resolved city
    /// display name.
    pub async fn forecast(&self, city: &str) -> Result<(String, Vec<ForecastSlot>), FetchError> {
        self.fetcher.fetch_forecast(city).await
    }

    pub async fn history(&self, city: &str, days: i64) -> Result<Vec<Observation>, DbError> {
        self.observation_repo.find_history(city, days).await
    }

    pub async fn latest_per_city(&self) -> Result<Vec<Observation>, DbError> {
        self.observation_repo.find_latest_per_city().await
    }
}
