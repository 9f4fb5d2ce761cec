use crate::{
    Config,
    error::WeatherError,
    model::{CitySearchResult, Coordinate, Units, WeatherSnapshot},
};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::warn;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// The network boundary: one weather fetch, one city search.
///
/// Calls are independent; a new call never cancels an earlier one. Cancellation of
/// superseded calls is layered on top by [`crate::session::WeatherSession`].
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_weather(
        &self,
        coordinate: Coordinate,
        units: Units,
    ) -> Result<WeatherSnapshot, WeatherError>;

    /// At most five results, in provider relevance order.
    async fn search_city(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError>;
}

/// Reverse geocoding, used only to label a coordinate.
#[async_trait]
pub trait PlaceNamer: Send + Sync + Debug {
    async fn place_name(&self, coordinate: Coordinate) -> Option<String>;
}

/// Construct the OpenWeather client from config.
///
/// A missing key is not an error here: the provider answers 401 and the call
/// surfaces [`WeatherError::InvalidCredentials`].
pub fn client_from_config(config: &Config) -> OpenWeatherClient {
    let api_key = config.resolved_api_key().unwrap_or_else(|| {
        warn!("No OpenWeather API key configured; requests will be rejected");
        String::new()
    });

    match config.api_base_url.as_deref() {
        Some(base) => OpenWeatherClient::with_base_url(api_key, base),
        None => OpenWeatherClient::new(api_key),
    }
}
