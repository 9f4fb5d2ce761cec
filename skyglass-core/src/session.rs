//! Latest-value state for "current weather" and "current search results".
//!
//! Each kind of request owns one cancellation scope: starting a new request cancels
//! the one in flight, and only the newest request may publish. Subscribers read
//! state through `watch` receivers, so the UI side never shares a lock with the
//! network side.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{LocationError, WeatherError},
    location::LocationProvider,
    model::{CitySearchResult, Coordinate, Units, WeatherSnapshot},
    provider::WeatherClient,
};

/// Result of a session request.
#[derive(Debug)]
pub enum Completion<T> {
    Done(T),
    /// A newer request of the same kind started first; nothing was published.
    Superseded,
}

impl<T> Completion<T> {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Completion::Superseded)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Completion::Done(value) => Some(value),
            Completion::Superseded => None,
        }
    }
}

pub type WeatherCompletion = Completion<Result<Arc<WeatherSnapshot>, WeatherError>>;
pub type SearchCompletion = Completion<Result<Vec<CitySearchResult>, WeatherError>>;

#[derive(Debug, Default)]
struct ScopeState {
    generation: u64,
    token: Option<CancellationToken>,
}

#[derive(Debug)]
struct Ticket {
    generation: u64,
    token: CancellationToken,
}

/// One cancellation scope per logical "latest request".
#[derive(Debug, Default)]
struct LatestScope {
    state: Mutex<ScopeState>,
}

impl LatestScope {
    fn begin(&self) -> Ticket {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = state.token.take() {
            previous.cancel();
        }
        state.generation += 1;

        let token = CancellationToken::new();
        state.token = Some(token.clone());
        Ticket { generation: state.generation, token }
    }

    /// Run `publish` under the scope lock if `ticket` is still the newest request.
    fn finish(&self, ticket: &Ticket, publish: impl FnOnce()) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != ticket.generation {
            return false;
        }
        state.token = None;
        publish();
        true
    }
}

#[derive(Debug)]
pub struct WeatherSession {
    client: Arc<dyn WeatherClient>,
    units: Units,
    search_debounce: Duration,
    weather: watch::Sender<Option<Arc<WeatherSnapshot>>>,
    results: watch::Sender<Vec<CitySearchResult>>,
    weather_scope: LatestScope,
    search_scope: LatestScope,
}

impl WeatherSession {
    pub fn new(client: Arc<dyn WeatherClient>, units: Units) -> Self {
        let (weather, _) = watch::channel(None);
        let (results, _) = watch::channel(Vec::new());

        Self {
            client,
            units,
            search_debounce: Duration::ZERO,
            weather,
            results,
            weather_scope: LatestScope::default(),
            search_scope: LatestScope::default(),
        }
    }

    /// Wait this long before issuing a search; a newer search during the wait cancels
    /// the older one without a network call.
    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    pub fn subscribe_weather(&self) -> watch::Receiver<Option<Arc<WeatherSnapshot>>> {
        self.weather.subscribe()
    }

    pub fn subscribe_results(&self) -> watch::Receiver<Vec<CitySearchResult>> {
        self.results.subscribe()
    }

    pub fn current_weather(&self) -> Option<Arc<WeatherSnapshot>> {
        self.weather.borrow().clone()
    }

    pub fn current_results(&self) -> Vec<CitySearchResult> {
        self.results.borrow().clone()
    }

    /// Fetch weather for `coordinate` and publish it as the current weather.
    ///
    /// Failures are returned and leave the current weather untouched.
    pub async fn load_weather(&self, coordinate: Coordinate) -> WeatherCompletion {
        let ticket = self.weather_scope.begin();
        debug!(%coordinate, generation = ticket.generation, "Loading weather");

        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => {
                info!(%coordinate, generation = ticket.generation, "Weather request superseded");
                return Completion::Superseded;
            }
            result = self.client.fetch_weather(coordinate, self.units) => result,
        };

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let published = self.weather_scope.finish(&ticket, || {
                    self.weather.send_replace(Some(snapshot.clone()));
                });
                if published { Completion::Done(Ok(snapshot)) } else { Completion::Superseded }
            }
            Err(e) => {
                if self.weather_scope.finish(&ticket, || {}) {
                    Completion::Done(Err(e))
                } else {
                    Completion::Superseded
                }
            }
        }
    }

    pub async fn select_city(&self, city: &CitySearchResult) -> WeatherCompletion {
        debug!(city = %city.label(), "City selected");
        self.load_weather(city.coordinate()).await
    }

    /// Resolve "here" with `location`, then load its weather.
    pub async fn load_for_location(
        &self,
        location: &LocationProvider,
    ) -> Result<WeatherCompletion, LocationError> {
        let coordinate = location.request_location().await.into_result()?;
        Ok(self.load_weather(coordinate).await)
    }

    /// Search cities and publish the results.
    ///
    /// A blank query cancels any search in flight and clears the results without a
    /// network call.
    pub async fn search(&self, query: &str) -> SearchCompletion {
        let ticket = self.search_scope.begin();
        let query = query.trim();

        if query.is_empty() {
            self.search_scope.finish(&ticket, || {
                self.results.send_replace(Vec::new());
            });
            return Completion::Done(Ok(Vec::new()));
        }

        let debounce = self.search_debounce;
        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => {
                info!(query, generation = ticket.generation, "Search superseded");
                return Completion::Superseded;
            }
            result = async {
                if !debounce.is_zero() {
                    tokio::time::sleep(debounce).await;
                }
                self.client.search_city(query).await
            } => result,
        };

        match result {
            Ok(cities) => {
                let published = self.search_scope.finish(&ticket, || {
                    self.results.send_replace(cities.clone());
                });
                if published { Completion::Done(Ok(cities)) } else { Completion::Superseded }
            }
            Err(e) => {
                if self.search_scope.finish(&ticket, || {}) {
                    Completion::Done(Err(e))
                } else {
                    Completion::Superseded
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        location::{AuthorizationStatus, FixRequest, LocationBackend, LocationPolicy},
        model::{Condition, CurrentConditions},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers after `latitude` milliseconds with a snapshot whose temperature equals
    /// the latitude. Negative latitudes fail with `InvalidCredentials`.
    #[derive(Debug, Default)]
    struct FakeClient {
        fetches: AtomicUsize,
        searches: AtomicUsize,
    }

    fn snapshot(temperature: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            current: CurrentConditions {
                temperature,
                humidity: 50,
                wind_speed: 1.0,
                pressure: 1013,
                conditions: vec![Condition { description: "clear sky".into(), icon_code: "01d".into() }],
            },
            hourly: Vec::new(),
            daily: Vec::new(),
            timezone_offset: None,
        }
    }

    #[async_trait]
    impl WeatherClient for FakeClient {
        async fn fetch_weather(
            &self,
            coordinate: Coordinate,
            _units: Units,
        ) -> Result<WeatherSnapshot, WeatherError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if coordinate.latitude < 0.0 {
                return Err(WeatherError::InvalidCredentials);
            }
            tokio::time::sleep(Duration::from_millis(coordinate.latitude as u64)).await;
            Ok(snapshot(coordinate.latitude))
        }

        async fn search_city(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![CitySearchResult {
                name: query.to_string(),
                latitude: 10.0,
                longitude: 20.0,
                country_code: "XX".into(),
                region: None,
            }])
        }
    }

    fn session() -> (WeatherSession, Arc<FakeClient>) {
        let client = Arc::new(FakeClient::default());
        (WeatherSession::new(client.clone(), Units::Metric), client)
    }

    fn temperature(session: &WeatherSession) -> Option<f64> {
        session.current_weather().map(|s| s.current.temperature)
    }

    #[tokio::test]
    async fn newer_weather_request_supersedes_older_one() {
        let (session, _) = session();

        // The second request starts after the first and finishes first.
        let (first, second) = tokio::join!(
            session.load_weather(Coordinate::new(60.0, 0.0)),
            session.load_weather(Coordinate::new(5.0, 0.0)),
        );

        assert!(first.is_superseded());
        assert_eq!(second.done().unwrap().unwrap().current.temperature, 5.0);
        assert_eq!(temperature(&session), Some(5.0));
    }

    #[tokio::test]
    async fn sequential_requests_leave_the_last_one_current() {
        let (session, _) = session();

        session.load_weather(Coordinate::new(5.0, 0.0)).await;
        session.load_weather(Coordinate::new(7.0, 0.0)).await;

        assert_eq!(temperature(&session), Some(7.0));
    }

    #[tokio::test]
    async fn failure_keeps_previous_weather() {
        let (session, _) = session();
        session.load_weather(Coordinate::new(5.0, 0.0)).await;

        let failed = session.load_weather(Coordinate::new(-1.0, 0.0)).await;

        assert!(matches!(failed.done(), Some(Err(WeatherError::InvalidCredentials))));
        assert_eq!(temperature(&session), Some(5.0));
    }

    #[tokio::test]
    async fn subscribers_see_published_weather() {
        let (session, _) = session();
        let mut rx = session.subscribe_weather();

        session.load_weather(Coordinate::new(3.0, 0.0)).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.current.temperature), Some(3.0));
    }

    #[tokio::test]
    async fn selecting_a_city_loads_its_coordinate() {
        let (session, _) = session();
        let cities = session.search("Paris").await.done().unwrap().unwrap();

        session.select_city(&cities[0]).await;

        assert_eq!(temperature(&session), Some(10.0));
    }

    #[tokio::test]
    async fn blank_query_clears_results_without_network() {
        let (session, client) = session();
        session.search("London").await;
        assert_eq!(session.current_results().len(), 1);

        let cleared = session.search("   ").await;

        assert!(cleared.done().unwrap().unwrap().is_empty());
        assert!(session.current_results().is_empty());
        assert_eq!(client.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn debounced_search_skips_superseded_keystrokes() {
        let client = Arc::new(FakeClient::default());
        let session = WeatherSession::new(client.clone(), Units::Metric)
            .with_search_debounce(Duration::from_millis(20));

        let (first, second) = tokio::join!(session.search("Lo"), session.search("London"));

        assert!(first.is_superseded());
        assert_eq!(second.done().unwrap().unwrap()[0].name, "London");
        assert_eq!(client.searches.load(Ordering::SeqCst), 1);
        assert_eq!(session.current_results()[0].name, "London");
    }

    #[derive(Debug)]
    struct DeniedBackend;

    #[async_trait]
    impl LocationBackend for DeniedBackend {
        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::Denied
        }

        async fn request_authorization(&self) -> AuthorizationStatus {
            AuthorizationStatus::Denied
        }

        async fn request_fix(&self, _request: FixRequest) -> anyhow::Result<Option<Coordinate>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn location_pipeline_follows_policy() {
        let (session, client) = session();

        let fallback =
            LocationProvider::new(Arc::new(DeniedBackend), LocationPolicy::Fallback, Coordinate::new(4.0, 0.0));
        session.load_for_location(&fallback).await.unwrap();
        assert_eq!(temperature(&session), Some(4.0));

        let strict =
            LocationProvider::new(Arc::new(DeniedBackend), LocationPolicy::Strict, Coordinate::new(4.0, 0.0));
        let err = session.load_for_location(&strict).await.unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }
}
