use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `lat,lon` form accepted by the backend's `location` parameter.
    pub fn as_query(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Which upstream provider's air-quality values a snapshot reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AqiProvenance {
    GeneralProvider,
    StationProvider,
    #[default]
    Unknown,
}

/// A resolved place. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub monitoring_station_id: Option<i64>,
    #[serde(default)]
    pub aqi_provenance: AqiProvenance,
}

impl Location {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            country: None,
            coordinates: None,
            monitoring_station_id: None,
            aqi_provenance: AqiProvenance::Unknown,
        }
    }

    /// The fetch that reproduces this location: by name when no coordinates
    /// are known, otherwise by coordinates plus station.
    pub fn fetch_request(&self) -> FetchRequest {
        match self.coordinates {
            None => FetchRequest::Query(self.name.clone()),
            Some(coordinates) => FetchRequest::Coordinates {
                coordinates,
                display_name: Some(self.name.clone()),
                station_id: self.monitoring_station_id,
            },
        }
    }

    /// "Region, Country" with empty parts skipped.
    pub fn subtitle(&self) -> String {
        join_non_empty([self.region.as_deref(), self.country.as_deref()])
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalized output of the resolver; input of the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    Query(String),
    Coordinates {
        coordinates: Coordinates,
        display_name: Option<String>,
        station_id: Option<i64>,
    },
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchRequest::Query(text) => write!(f, "query '{text}'"),
            FetchRequest::Coordinates { coordinates, station_id: Some(id), .. } => {
                write!(f, "coordinates ({coordinates}) station {id}")
            }
            FetchRequest::Coordinates { coordinates, .. } => {
                write!(f, "coordinates ({coordinates})")
            }
        }
    }
}

/// Place identity as reported by the backend alongside current conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedPlace {
    pub name: String,
    pub region: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub feels_like_c: f64,
    pub feels_like_f: f64,
    pub humidity_pct: u8,
    pub wind_kph: f64,
    pub wind_mph: f64,
    pub wind_degree: u16,
    pub wind_dir: String,
    pub pressure_mb: f64,
    pub pressure_in: f64,
    pub uv: f64,
    pub precip_mm: f64,
    pub condition: String,
    pub icon: String,
}

/// Pollutant concentrations in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub o3: Option<f64>,
}

impl Pollutants {
    /// Values present in `other` replace ours; absent ones keep ours.
    pub fn overlay(self, other: &Pollutants) -> Pollutants {
        Pollutants {
            pm2_5: other.pm2_5.or(self.pm2_5),
            pm10: other.pm10.or(self.pm10),
            co: other.co.or(self.co),
            no2: other.no2.or(self.no2),
            so2: other.so2.or(self.so2),
            o3: other.o3.or(self.o3),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Pollutants::default()
    }
}

/// Current-conditions payload of the general-purpose provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReport {
    pub place: ReportedPlace,
    pub conditions: CurrentConditions,
    pub pollutants: Pollutants,
    /// Precomputed index, when the backend supplies one.
    pub aqi: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySummary {
    pub time: String,
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub precipitation_chance: u8,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min_c: f64,
    pub max_c: f64,
    pub min_f: f64,
    pub max_f: f64,
    pub condition: String,
    pub icon: String,
    pub precipitation_chance: u8,
    pub sunrise: String,
    pub sunset: String,
    pub moon_phase: String,
    /// 24 entries guaranteed for day 0 only.
    pub hours: Vec<HourlySummary>,
}

/// Reading of a single AQI monitoring station.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationReading {
    pub aqi: Option<u16>,
    pub pollutants: Pollutants,
}

/// Outcome of the station overlay for one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StationOverlay {
    #[default]
    NotRequested,
    Applied,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: CurrentConditions,
    pub pollutants: Pollutants,
    pub air_quality_index: Option<u16>,
    pub forecast_days: Vec<ForecastDay>,
    pub station_overlay: StationOverlay,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMatch {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMatch {
    pub station_id: i64,
    pub name: String,
    pub coordinates: Coordinates,
    /// Current index; absent when the station reports "-".
    pub aqi: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub place_id: String,
    pub main_text: String,
    pub secondary_text: String,
}

/// Result of the places provider's detail lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub name: String,
    pub coordinates: Coordinates,
}

/// One selectable row of the merged search suggestions.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCandidate {
    City(CityMatch),
    Station(StationMatch),
    Place(PlaceMatch),
}

impl SearchCandidate {
    pub fn label(&self) -> &str {
        match self {
            SearchCandidate::City(city) => &city.name,
            SearchCandidate::Station(station) => &station.name,
            SearchCandidate::Place(place) => &place.main_text,
        }
    }

    pub fn description(&self) -> String {
        match self {
            SearchCandidate::City(city) => {
                join_non_empty([Some(city.region.as_str()), Some(city.country.as_str())])
            }
            SearchCandidate::Station(station) => match station.aqi {
                Some(aqi) => format!("Monitoring Station · AQI {aqi}"),
                None => "Monitoring Station".to_string(),
            },
            SearchCandidate::Place(place) => place.secondary_text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearchEntry {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
}

impl RecentSearchEntry {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), region: region.into(), country: country.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitPreference {
    #[default]
    Metric,
    Imperial,
}

impl UnitPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "metric",
            UnitPreference::Imperial => "imperial",
        }
    }

    pub fn format_temperature(&self, celsius: f64, fahrenheit: f64) -> String {
        match self {
            UnitPreference::Metric => format!("{}°C", celsius.round()),
            UnitPreference::Imperial => format!("{}°F", fahrenheit.round()),
        }
    }

    pub fn format_wind(&self, kph: f64, mph: f64) -> String {
        match self {
            UnitPreference::Metric => format!("{kph} km/h"),
            UnitPreference::Imperial => format!("{mph} mph"),
        }
    }

    pub fn format_pressure(&self, mb: f64, inches: f64) -> String {
        match self {
            UnitPreference::Metric => format!("{mb} mb"),
            UnitPreference::Imperial => format!("{inches} inHg"),
        }
    }
}

impl FromStr for UnitPreference {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitPreference::Metric),
            "imperial" => Ok(UnitPreference::Imperial),
            _ => Err(anyhow::anyhow!("Unknown units '{value}'. Supported: metric, imperial.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Unknown theme '{value}'. Supported: light, dark.")),
        }
    }
}

/// Expands a 16-wind compass abbreviation (`NNE`) to its full name.
pub fn compass_point_name(abbreviation: &str) -> Option<&'static str> {
    let name = match abbreviation {
        "N" => "North",
        "NNE" => "North-Northeast",
        "NE" => "Northeast",
        "ENE" => "East-Northeast",
        "E" => "East",
        "ESE" => "East-Southeast",
        "SE" => "Southeast",
        "SSE" => "South-Southeast",
        "S" => "South",
        "SSW" => "South-Southwest",
        "SW" => "Southwest",
        "WSW" => "West-Southwest",
        "W" => "West",
        "WNW" => "West-Northwest",
        "NW" => "Northwest",
        "NNW" => "North-Northwest",
        _ => return None,
    };
    Some(name)
}
