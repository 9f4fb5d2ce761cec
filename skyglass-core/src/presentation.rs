//! Display strings for a [`WeatherSnapshot`]: rounded temperatures, local hour and
//! day labels, icon symbols, condition labels, and user-facing error messages.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{LocationError, WeatherError},
    model::{Condition, Units, WeatherSnapshot},
};

pub const HOURLY_ROWS: usize = 24;
pub const DAILY_ROWS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "tr")]
    Turkish,
}

impl TryFrom<&str> for Language {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "tr" | "turkish" => Ok(Language::Turkish),
            _ => Err(anyhow::anyhow!("Unknown language '{value}'. Supported: en, tr.")),
        }
    }
}

/// Visual category of a provider icon code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKind {
    Clear,
    FewClouds,
    ScatteredClouds,
    BrokenClouds,
    ShowerRain,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
    Unknown,
}

/// Every icon code the provider documents.
pub const PROVIDER_ICON_CODES: [&str; 18] = [
    "01d", "01n", "02d", "02n", "03d", "03n", "04d", "04n", "09d", "09n", "10d", "10n",
    "11d", "11n", "13d", "13n", "50d", "50n",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Icon {
    pub kind: IconKind,
    pub night: bool,
}

impl Icon {
    pub const UNKNOWN: Icon = Icon { kind: IconKind::Unknown, night: false };

    /// Parse a code such as `"10n"`. Anything unrecognized is [`Icon::UNKNOWN`].
    pub fn parse(code: &str) -> Icon {
        let code = code.trim();
        let (group, part) = match (code.get(..2), code.get(2..)) {
            (Some(group), Some(part)) => (group, part),
            _ => return Icon::UNKNOWN,
        };

        let night = match part {
            "d" => false,
            "n" => true,
            _ => return Icon::UNKNOWN,
        };

        let kind = match group {
            "01" => IconKind::Clear,
            "02" => IconKind::FewClouds,
            "03" => IconKind::ScatteredClouds,
            "04" => IconKind::BrokenClouds,
            "09" => IconKind::ShowerRain,
            "10" => IconKind::Rain,
            "11" => IconKind::Thunderstorm,
            "13" => IconKind::Snow,
            "50" => IconKind::Mist,
            _ => return Icon::UNKNOWN,
        };

        Icon { kind, night }
    }

    pub fn symbol(&self) -> &'static str {
        match (self.kind, self.night) {
            (IconKind::Clear, false) => "☀️",
            (IconKind::Clear, true) => "🌙",
            (IconKind::FewClouds, false) => "🌤️",
            (IconKind::FewClouds, true) => "☁️",
            (IconKind::ScatteredClouds, _) => "⛅️",
            (IconKind::BrokenClouds, _) => "☁️",
            (IconKind::ShowerRain, _) => "🌧️",
            (IconKind::Rain, false) => "🌦️",
            (IconKind::Rain, true) => "🌧️",
            (IconKind::Thunderstorm, _) => "⛈️",
            (IconKind::Snow, _) => "❄️",
            (IconKind::Mist, _) => "🌫️",
            (IconKind::Unknown, _) => "🌡️",
        }
    }
}

impl IconKind {
    pub fn label(&self, language: Language) -> &'static str {
        match language {
            Language::English => match self {
                IconKind::Clear => "Clear sky",
                IconKind::FewClouds => "Few clouds",
                IconKind::ScatteredClouds => "Scattered clouds",
                IconKind::BrokenClouds => "Broken clouds",
                IconKind::ShowerRain => "Shower rain",
                IconKind::Rain => "Rain",
                IconKind::Thunderstorm => "Thunderstorm",
                IconKind::Snow => "Snow",
                IconKind::Mist => "Mist",
                IconKind::Unknown => "Unknown",
            },
            Language::Turkish => match self {
                IconKind::Clear => "Açık",
                IconKind::FewClouds => "Az bulutlu",
                IconKind::ScatteredClouds => "Parçalı bulutlu",
                IconKind::BrokenClouds => "Çok bulutlu",
                IconKind::ShowerRain => "Sağanak yağmur",
                IconKind::Rain => "Yağmurlu",
                IconKind::Thunderstorm => "Gök gürültülü fırtına",
                IconKind::Snow => "Karlı",
                IconKind::Mist => "Sisli",
                IconKind::Unknown => "Bilinmiyor",
            },
        }
    }
}

/// Only the first (most significant) condition is displayed.
pub fn first_condition(conditions: &[Condition]) -> Option<&Condition> {
    conditions.first()
}

pub fn condition_icon(conditions: &[Condition]) -> Icon {
    first_condition(conditions).map(|c| Icon::parse(&c.icon_code)).unwrap_or(Icon::UNKNOWN)
}

/// `23.6` → `"24°"`. Never renders `"-0°"`.
pub fn temperature_label(value: f64) -> String {
    let rounded = value.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.0}°")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn local_time(timestamp: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|t| t.with_timezone(&offset))
}

const TURKISH_WEEKDAYS: [&str; 7] =
    ["Pazartesi", "Salı", "Çarşamba", "Perşembe", "Cuma", "Cumartesi", "Pazar"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentView {
    pub temperature: String,
    pub symbol: &'static str,
    pub description: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourRow {
    pub time: String,
    pub symbol: &'static str,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRow {
    pub day: String,
    pub symbol: &'static str,
    pub min: String,
    pub max: String,
}

/// Turns snapshots and errors into display strings for one language and unit system.
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    language: Language,
    units: Units,
}

impl Presenter {
    pub fn new(language: Language, units: Units) -> Self {
        Self { language, units }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn description(&self, conditions: &[Condition]) -> String {
        let Some(condition) = first_condition(conditions) else {
            return IconKind::Unknown.label(self.language).to_string();
        };

        match self.language {
            Language::English => capitalize(&condition.description),
            Language::Turkish => match Icon::parse(&condition.icon_code).kind {
                IconKind::Unknown => capitalize(&condition.description),
                kind => kind.label(self.language).to_string(),
            },
        }
    }

    /// Provider wind speed is m/s for metric and standard, mph for imperial.
    pub fn wind_label(&self, speed: f64) -> String {
        match self.units {
            Units::Metric | Units::Standard => format!("{:.0} km/h", speed * 3.6),
            Units::Imperial => format!("{speed:.0} mph"),
        }
    }

    pub fn humidity_label(&self, humidity: u8) -> String {
        match self.language {
            Language::English => format!("{humidity}%"),
            Language::Turkish => format!("%{humidity}"),
        }
    }

    pub fn pressure_label(&self, pressure: u32) -> String {
        format!("{pressure} hPa")
    }

    pub fn hour_label(&self, timestamp: i64, offset: FixedOffset) -> String {
        local_time(timestamp, offset)
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string())
    }

    pub fn day_label(&self, timestamp: i64, offset: FixedOffset) -> String {
        let Some(t) = local_time(timestamp, offset) else {
            return "--".to_string();
        };

        match self.language {
            Language::English => t.format("%A").to_string(),
            Language::Turkish => {
                TURKISH_WEEKDAYS[t.weekday().num_days_from_monday() as usize].to_string()
            }
        }
    }

    /// The snapshot's own UTC offset, or UTC when the provider omitted it.
    pub fn offset(snapshot: &WeatherSnapshot) -> FixedOffset {
        snapshot
            .timezone_offset
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn current(&self, snapshot: &WeatherSnapshot) -> CurrentView {
        let current = &snapshot.current;
        CurrentView {
            temperature: temperature_label(current.temperature),
            symbol: condition_icon(&current.conditions).symbol(),
            description: self.description(&current.conditions),
            humidity: self.humidity_label(current.humidity),
            wind: self.wind_label(current.wind_speed),
            pressure: self.pressure_label(current.pressure),
        }
    }

    pub fn hourly(&self, snapshot: &WeatherSnapshot) -> Vec<HourRow> {
        let offset = Self::offset(snapshot);
        snapshot
            .hourly
            .iter()
            .take(HOURLY_ROWS)
            .map(|h| HourRow {
                time: self.hour_label(h.timestamp, offset),
                symbol: condition_icon(&h.conditions).symbol(),
                temperature: temperature_label(h.temperature),
            })
            .collect()
    }

    pub fn daily(&self, snapshot: &WeatherSnapshot) -> Vec<DayRow> {
        let offset = Self::offset(snapshot);
        snapshot
            .daily
            .iter()
            .take(DAILY_ROWS)
            .map(|d| DayRow {
                day: self.day_label(d.timestamp, offset),
                symbol: condition_icon(&d.conditions).symbol(),
                min: temperature_label(d.temperature_range.min),
                max: temperature_label(d.temperature_range.max),
            })
            .collect()
    }

    /// Never includes raw bodies or decoder output.
    pub fn weather_error(&self, error: &WeatherError) -> &'static str {
        match (self.language, error) {
            (Language::English, WeatherError::InvalidRequest(_)) => {
                "The request could not be created."
            }
            (Language::English, WeatherError::TransportFailure(_) | WeatherError::EmptyResponse) => {
                "Could not reach the weather service. Check your connection and try again."
            }
            (Language::English, WeatherError::InvalidCredentials) => {
                "The weather service rejected the API key. Check your configuration."
            }
            (Language::English, WeatherError::DecodeFailure { .. }) => {
                "Weather data is unavailable right now."
            }
            (Language::Turkish, WeatherError::InvalidRequest(_)) => "İstek oluşturulamadı.",
            (Language::Turkish, WeatherError::TransportFailure(_) | WeatherError::EmptyResponse) => {
                "Hava durumu servisine ulaşılamadı. Bağlantınızı kontrol edip tekrar deneyin."
            }
            (Language::Turkish, WeatherError::InvalidCredentials) => {
                "API anahtarı geçersiz. Yapılandırmayı kontrol edin."
            }
            (Language::Turkish, WeatherError::DecodeFailure { .. }) => {
                "Hava durumu verisi şu anda kullanılamıyor."
            }
        }
    }

    pub fn location_error(&self, error: &LocationError) -> &'static str {
        match (self.language, error) {
            (Language::English, LocationError::PermissionDenied) => {
                "Location permission denied. Enable location access in settings."
            }
            (Language::English, LocationError::PermissionRestricted) => {
                "Location access is restricted on this device."
            }
            (Language::English, LocationError::PermissionUndetermined) => {
                "Location permission has not been decided yet."
            }
            (Language::English, LocationError::Unknown(_)) => {
                "Your location could not be determined."
            }
            (Language::Turkish, LocationError::PermissionDenied) => {
                "Konum izni reddedildi. Ayarlardan konum iznini etkinleştirin."
            }
            (Language::Turkish, LocationError::PermissionRestricted) => "Konum erişimi kısıtlandı.",
            (Language::Turkish, LocationError::PermissionUndetermined) => "Konum izni belirlenmedi.",
            (Language::Turkish, LocationError::Unknown(_)) => "Bilinmeyen bir hata oluştu.",
        }
    }
}
