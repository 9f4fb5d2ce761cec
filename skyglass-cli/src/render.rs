use std::fmt::Write;

use skyglass_core::{CitySearchResult, Language, Presenter, WeatherSnapshot};

struct Headings {
    humidity: &'static str,
    wind: &'static str,
    pressure: &'static str,
    hourly: &'static str,
    daily: &'static str,
}

fn headings(language: Language) -> Headings {
    match language {
        Language::English => Headings {
            humidity: "Humidity",
            wind: "Wind",
            pressure: "Pressure",
            hourly: "Hourly",
            daily: "Daily",
        },
        Language::Turkish => Headings {
            humidity: "Nem",
            wind: "Rüzgar",
            pressure: "Basınç",
            hourly: "Saatlik",
            daily: "Günlük",
        },
    }
}

/// Full text report: current conditions, then hourly and daily rows.
pub fn weather_report(title: &str, snapshot: &WeatherSnapshot, presenter: &Presenter) -> String {
    let h = headings(presenter.language());
    let current = presenter.current(snapshot);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "  {}  {}  {}", current.temperature, current.symbol, current.description);
    let _ = writeln!(
        out,
        "  {} {}   {} {}   {} {}",
        h.humidity, current.humidity, h.wind, current.wind, h.pressure, current.pressure
    );

    let hourly = presenter.hourly(snapshot);
    if !hourly.is_empty() {
        let _ = writeln!(out, "\n{}", h.hourly);
        for row in hourly {
            let _ = writeln!(out, "  {}  {}  {:>4}", row.time, row.symbol, row.temperature);
        }
    }

    let daily = presenter.daily(snapshot);
    if !daily.is_empty() {
        let _ = writeln!(out, "\n{}", h.daily);
        for row in daily {
            let _ = writeln!(out, "  {:<10}  {}  {:>4} / {:>4}", row.day, row.symbol, row.min, row.max);
        }
    }

    out
}

pub fn city_list(cities: &[CitySearchResult]) -> String {
    cities
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:>2}. {}\n", i + 1, c.label()))
        .collect()
}
