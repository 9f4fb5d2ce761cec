use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::WeatherError,
    model::{
        CitySearchResult, Condition, Coordinate, CurrentConditions, DayPoint, HourPoint,
        TemperatureRange, Units, WeatherSnapshot,
    },
};

use super::{PlaceNamer, WeatherClient};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const ONE_CALL_PATH: &str = "/data/3.0/onecall";
const DIRECT_GEOCODING_PATH: &str = "/geo/1.0/direct";
const REVERSE_GEOCODING_PATH: &str = "/geo/1.0/reverse";

/// Upstream cap on city search results.
pub const SEARCH_LIMIT: usize = 5;

/// Client for the OpenWeather one-call and geocoding endpoints.
#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }

    /// Replace the underlying HTTP client (proxy settings, timeouts, test setups).
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, WeatherError> {
        let base = self.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| WeatherError::InvalidRequest(format!("invalid endpoint URL: {e}")))
    }

    /// Build the one-call request for `coordinate`. Minute-level data is excluded.
    pub fn weather_request(
        &self,
        coordinate: Coordinate,
        units: Units,
    ) -> Result<Request, WeatherError> {
        let url = self.endpoint(ONE_CALL_PATH)?;
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        self.http
            .get(url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("exclude", "minutely"),
                ("units", units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .build()
            .map_err(|e| WeatherError::InvalidRequest(e.to_string()))
    }

    /// Build the direct-geocoding request. The query is form-url-encoded by reqwest.
    pub fn search_request(&self, query: &str) -> Result<Request, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::InvalidRequest("empty search query".to_string()));
        }

        let url = self.endpoint(DIRECT_GEOCODING_PATH)?;
        let limit = SEARCH_LIMIT.to_string();

        self.http
            .get(url)
            .query(&[("q", query), ("limit", limit.as_str()), ("appid", self.api_key.as_str())])
            .build()
            .map_err(|e| WeatherError::InvalidRequest(e.to_string()))
    }

    fn reverse_request(&self, coordinate: Coordinate) -> Result<Request, WeatherError> {
        let url = self.endpoint(REVERSE_GEOCODING_PATH)?;
        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        self.http
            .get(url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("limit", "1"),
                ("appid", self.api_key.as_str()),
            ])
            .build()
            .map_err(|e| WeatherError::InvalidRequest(e.to_string()))
    }

    /// Send `request` and return the body. 401 is classified before the body is read.
    async fn execute(&self, request: Request, what: &'static str) -> Result<String, WeatherError> {
        debug!(endpoint = what, path = request.url().path(), "sending OpenWeather request");

        let response = self.http.execute(request).await.map_err(|e| {
            debug!(endpoint = what, error = %e, "OpenWeather request failed in transport");
            WeatherError::TransportFailure(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(endpoint = what, "OpenWeather rejected the API key (401)");
            return Err(WeatherError::InvalidCredentials);
        }
        if let Err(e) = response.error_for_status_ref() {
            debug!(endpoint = what, %status, "OpenWeather returned a failure status");
            return Err(WeatherError::TransportFailure(e));
        }

        let body = response.text().await.map_err(WeatherError::TransportFailure)?;
        if body.trim().is_empty() {
            return Err(WeatherError::EmptyResponse);
        }

        debug!(endpoint = what, %status, bytes = body.len(), "OpenWeather response received");
        Ok(body)
    }
}

/// Strict decode: any missing or mistyped required field fails the whole body.
pub(crate) fn decode<T: DeserializeOwned>(body: String, what: &'static str) -> Result<T, WeatherError> {
    match serde_json::from_str(&body) {
        Ok(parsed) => Ok(parsed),
        Err(source) => {
            warn!(
                endpoint = what,
                error = %source,
                body = %truncate_body(&body),
                "Failed to decode OpenWeather response"
            );
            Err(WeatherError::DecodeFailure { raw_body: body, source })
        }
    }
}

pub(crate) fn decode_snapshot(body: String) -> Result<WeatherSnapshot, WeatherError> {
    decode::<OwOneCall>(body, "onecall").map(WeatherSnapshot::from)
}

pub(crate) fn decode_cities(body: String) -> Result<Vec<CitySearchResult>, WeatherError> {
    let cities: Vec<OwCity> = decode(body, "geocoding")?;
    Ok(cities.into_iter().take(SEARCH_LIMIT).map(CitySearchResult::from).collect())
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    temp: f64,
    humidity: u8,
    wind_speed: f64,
    pressure: u32,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwHourly {
    dt: i64,
    temp: f64,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwDaily {
    dt: i64,
    temp: OwDailyTemp,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwOneCall {
    current: OwCurrent,
    hourly: Vec<OwHourly>,
    daily: Vec<OwDaily>,
    timezone_offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    lat: f64,
    lon: f64,
    country: String,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
}

fn conditions(weather: Vec<OwWeather>) -> Vec<Condition> {
    weather
        .into_iter()
        .map(|w| Condition { description: w.description, icon_code: w.icon })
        .collect()
}

impl From<OwOneCall> for WeatherSnapshot {
    fn from(raw: OwOneCall) -> Self {
        let current = CurrentConditions {
            temperature: raw.current.temp,
            humidity: raw.current.humidity,
            wind_speed: raw.current.wind_speed,
            pressure: raw.current.pressure,
            conditions: conditions(raw.current.weather),
        };

        let hourly = raw
            .hourly
            .into_iter()
            .map(|h| HourPoint { timestamp: h.dt, temperature: h.temp, conditions: conditions(h.weather) })
            .collect();

        let daily = raw
            .daily
            .into_iter()
            .map(|d| DayPoint {
                timestamp: d.dt,
                temperature_range: TemperatureRange { min: d.temp.min, max: d.temp.max },
                conditions: conditions(d.weather),
            })
            .collect();

        WeatherSnapshot { current, hourly, daily, timezone_offset: raw.timezone_offset }
    }
}

impl From<OwCity> for CitySearchResult {
    fn from(raw: OwCity) -> Self {
        CitySearchResult {
            name: raw.name,
            latitude: raw.lat,
            longitude: raw.lon,
            country_code: raw.country,
            region: raw.state.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_weather(
        &self,
        coordinate: Coordinate,
        units: Units,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let request = self.weather_request(coordinate, units)?;
        let body = self.execute(request, "onecall").await?;
        decode_snapshot(body)
    }

    async fn search_city(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        let request = self.search_request(query)?;
        let body = self.execute(request, "geocoding").await?;
        decode_cities(body)
    }
}

#[async_trait]
impl PlaceNamer for OpenWeatherClient {
    async fn place_name(&self, coordinate: Coordinate) -> Option<String> {
        let result = async {
            let request = self.reverse_request(coordinate)?;
            let body = self.execute(request, "reverse-geocoding").await?;
            decode::<Vec<OwPlace>>(body, "reverse-geocoding")
        }
        .await;

        match result {
            Ok(places) => places.into_iter().next().map(|p| p.name),
            Err(e) => {
                debug!(%coordinate, error = %e, "Reverse geocoding failed");
                None
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
