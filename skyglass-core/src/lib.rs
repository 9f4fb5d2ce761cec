//! Core library for the `skyglass` weather client.
//!
//! This crate defines:
//! - The weather snapshot and city search models
//! - The OpenWeather client and its closed error taxonomy
//! - One-shot location resolution with a strict or fallback policy
//! - A session holding the latest weather and search results, cancelling superseded requests
//! - Display formatting for snapshots and errors
//!
//! It is used by `skyglass-cli`, but any front end can drive the same pipeline.

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod presentation;
pub mod provider;
pub mod session;

pub use config::Config;
pub use error::{LocationError, WeatherError};
pub use location::{LocationOutcome, LocationPolicy, LocationProvider};
pub use model::{CitySearchResult, Coordinate, Units, WeatherSnapshot};
pub use presentation::{Language, Presenter};
pub use provider::{OpenWeatherClient, PlaceNamer, WeatherClient, client_from_config};
pub use session::{Completion, WeatherSession};
