use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use tracing::debug;

use skyglass_core::{
    CitySearchResult, Completion, Config, Coordinate, Language, LocationPolicy, LocationProvider,
    OpenWeatherClient, PlaceNamer, Presenter, Units, WeatherError, WeatherSession,
    WeatherSnapshot, client_from_config,
};

use crate::{location::ArgsLocation, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyglass", version, about = "Current, hourly and daily weather from OpenWeather")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and display preferences.
    Configure {
        /// "metric", "imperial" or "standard".
        #[arg(long)]
        units: Option<String>,

        /// "strict" or "fallback".
        #[arg(long)]
        policy: Option<String>,

        /// "en" or "tr".
        #[arg(long)]
        language: Option<String>,

        /// Keep the stored API key instead of prompting for a new one.
        #[arg(long)]
        keep_key: bool,
    },

    /// Show weather for a coordinate, or for the current location when none is given.
    Show {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search cities by name, then show weather for the chosen one.
    Search {
        query: String,

        /// 1-based index of the result to use instead of choosing interactively.
        #[arg(long)]
        pick: Option<usize>,

        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the location of the config file.
    ConfigPath,
}

/// Everything a command needs, built once from config.
struct App {
    config: Config,
    client: Arc<OpenWeatherClient>,
    session: WeatherSession,
    presenter: Presenter,
}

impl App {
    fn from_config(config: Config) -> Self {
        let client = Arc::new(client_from_config(&config));
        let session = WeatherSession::new(client.clone(), config.units)
            .with_search_debounce(config.search_debounce());
        let presenter = Presenter::new(config.language, config.units);

        Self { config, client, session, presenter }
    }

    fn weather_failure(&self, error: WeatherError) -> anyhow::Error {
        debug!(error = ?error, "Weather request failed");
        let message = self.presenter.weather_error(&error);

        match error {
            WeatherError::InvalidCredentials => anyhow!(
                "{message}\nHint: run `skyglass configure` and enter your OpenWeather API key."
            ),
            _ => anyhow!(message),
        }
    }

    fn finish<T>(&self, completion: Completion<Result<T, WeatherError>>) -> anyhow::Result<T> {
        match completion {
            Completion::Done(result) => result.map_err(|e| self.weather_failure(e)),
            Completion::Superseded => bail!("The request was replaced by a newer one."),
        }
    }

    fn print_weather(&self, title: &str, snapshot: &WeatherSnapshot, json: bool) -> anyhow::Result<()> {
        if json {
            let out = serde_json::to_string_pretty(snapshot)
                .context("Failed to serialize weather snapshot")?;
            println!("{out}");
        } else {
            print!("{}", render::weather_report(title, snapshot, &self.presenter));
        }
        Ok(())
    }

    async fn show(&self, coordinate: Option<Coordinate>, json: bool) -> anyhow::Result<()> {
        let location = LocationProvider::new(
            Arc::new(ArgsLocation::new(coordinate)),
            self.config.location.policy,
            self.config.location.default_coordinate(),
        );

        let coordinate = location.request_location().await.into_result().map_err(|e| {
            let message = self.presenter.location_error(&e);
            anyhow!("{message}\nHint: pass --lat and --lon, or set location.policy = \"fallback\".")
        })?;

        let (completion, place) =
            tokio::join!(self.session.load_weather(coordinate), self.client.place_name(coordinate));
        let snapshot = self.finish(completion)?;

        let title = place.unwrap_or_else(|| coordinate.to_string());
        self.print_weather(&title, &snapshot, json)
    }

    async fn search(&self, query: &str, pick: Option<usize>, json: bool) -> anyhow::Result<()> {
        let cities = self.finish(self.session.search(query).await)?;
        if cities.is_empty() {
            bail!("No cities found for '{}'.", query.trim());
        }

        let city = match pick {
            Some(n) => choose_by_index(&cities, n)?,
            None => choose_interactively(&cities)?,
        };

        let snapshot = self.finish(self.session.select_city(&city).await)?;
        self.print_weather(&city.label(), &snapshot, json)
    }
}

fn choose_by_index(cities: &[CitySearchResult], n: usize) -> anyhow::Result<CitySearchResult> {
    n.checked_sub(1).and_then(|i| cities.get(i)).cloned().ok_or_else(|| {
        anyhow!(
            "--pick {n} is out of range; the search returned:\n{}",
            render::city_list(cities)
        )
    })
}

fn choose_interactively(cities: &[CitySearchResult]) -> anyhow::Result<CitySearchResult> {
    let labels: Vec<String> = cities.iter().map(CitySearchResult::label).collect();
    let choice = Select::new("Choose a city:", labels)
        .raw_prompt()
        .context("City selection was cancelled")?;

    cities
        .get(choice.index)
        .cloned()
        .ok_or_else(|| anyhow!("Selected city is no longer available"))
}

fn configure(
    units: Option<String>,
    policy: Option<String>,
    language: Option<String>,
    keep_key: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    if !keep_key {
        let api_key = Password::new("OpenWeather API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?;
        config.set_api_key(api_key);
    }
    if let Some(units) = units {
        config.units = Units::try_from(units.as_str())?;
    }
    if let Some(policy) = policy {
        config.location.policy = LocationPolicy::try_from(policy.as_str())?;
    }
    if let Some(language) = language {
        config.language = Language::try_from(language.as_str())?;
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { units, policy, language, keep_key } => {
                configure(units, policy, language, keep_key)
            }
            Command::Show { lat, lon, json } => {
                let app = App::from_config(Config::load()?);
                let coordinate = lat.zip(lon).map(|(lat, lon)| Coordinate::new(lat, lon));
                app.show(coordinate, json).await
            }
            Command::Search { query, pick, json } => {
                let app = App::from_config(Config::load()?);
                app.search(&query, pick, json).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}
