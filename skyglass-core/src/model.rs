use serde::{Deserialize, Serialize};

/// WGS84 position in degrees. No range validation; the provider enforces its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial, standard."
            )),
        }
    }
}

/// One provider weather condition. `icon_code` is an opaque key such as `"01d"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub description: String,
    pub icon_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    /// Percent, 0-100.
    pub humidity: u8,
    /// As sent by the provider for the requested unit system (m/s for metric).
    pub wind_speed: f64,
    /// hPa.
    pub pressure: u32,
    /// Most significant first. May be empty.
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourPoint {
    /// Unix seconds, UTC.
    pub timestamp: i64,
    pub temperature: f64,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPoint {
    /// Unix seconds, UTC, start of day in the provider's reference.
    pub timestamp: i64,
    pub temperature_range: TemperatureRange,
    pub conditions: Vec<Condition>,
}

/// A fully decoded weather response for one coordinate.
///
/// Only produced by a successful decode of a complete provider body; there is no
/// partially populated snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub hourly: Vec<HourPoint>,
    pub daily: Vec<DayPoint>,
    /// Seconds east of UTC for the location, when the provider reports it.
    pub timezone_offset: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
    pub region: Option<String>,
}

impl CitySearchResult {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// `"name, region, country"`, region omitted when absent.
    pub fn label(&self) -> String {
        match &self.region {
            Some(region) => format!("{}, {}, {}", self.name, region, self.country_code),
            None => format!("{}, {}", self.name, self.country_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(region: Option<&str>) -> CitySearchResult {
        CitySearchResult {
            name: "Springfield".into(),
            latitude: 39.8,
            longitude: -89.6,
            country_code: "US".into(),
            region: region.map(str::to_string),
        }
    }

    #[test]
    fn label_includes_region_when_present() {
        assert_eq!(city(Some("Illinois")).label(), "Springfield, Illinois, US");
    }

    #[test]
    fn label_omits_absent_region() {
        assert_eq!(city(None).label(), "Springfield, US");
    }

    #[test]
    fn units_parse_is_case_insensitive() {
        assert_eq!(Units::try_from("Imperial").unwrap(), Units::Imperial);
        let err = Units::try_from("kelvin").unwrap_err();
        assert!(err.to_string().contains("Unknown unit system"));
    }
}
