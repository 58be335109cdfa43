use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    aqi::MAX_INDEX,
    error::WeatherError,
    model::{
        CityMatch, Coordinates, CurrentConditions, CurrentReport, ForecastDay, HourlySummary,
        Pollutants, ReportedPlace, StationMatch, StationReading,
    },
};

use super::{LocationQuery, WeatherBackend, truncate_body};

pub const MIN_FORECAST_DAYS: u8 = 7;
pub const MAX_FORECAST_DAYS: u8 = 16;

/// Connection settings for the weather/AQI backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Forecast horizon, clamped to 7..=16.
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

const fn default_timeout() -> u64 {
    10
}

const fn default_forecast_days() -> u8 {
    MIN_FORECAST_DAYS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn effective_forecast_days(&self) -> u8 {
        self.forecast_days.clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS)
    }
}

/// HTTP client for the weather/AQI backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| WeatherError::network("Failed to build backend HTTP client", e))?;

        Ok(Self { base_url: config.base_url.trim_end_matches('/').to_string(), http })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "backend request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| WeatherError::network(format!("Failed to send {what} request"), e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::network(format!("Failed to read {what} response"), e))?;

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::NotFound(describe(query)));
        }
        if !status.is_success() {
            return Err(WeatherError::network(
                format!("{what} request failed with status {status}"),
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::invalid_response(what, e))
    }
}

fn describe(query: &[(&str, String)]) -> String {
    query.iter().map(|(_, value)| value.as_str()).collect::<Vec<_>>().join(",")
}

#[async_trait]
impl WeatherBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn current_conditions(
        &self,
        query: &LocationQuery,
    ) -> Result<CurrentReport, WeatherError> {
        let parsed: WireCurrentResponse = match query {
            LocationQuery::Name(name) => {
                self.get_json("/weather/current", &[("location", name.clone())], "current weather")
                    .await?
            }
            LocationQuery::Coordinates(coordinates) => {
                self.get_json(
                    "/weather/by-coordinates",
                    &[("lat", coordinates.lat.to_string()), ("lon", coordinates.lon.to_string())],
                    "current weather",
                )
                .await?
            }
        };

        Ok(parsed.into_report())
    }

    #[instrument(skip(self))]
    async fn forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let parsed: WireForecastResponse = self
            .get_json(
                "/weather/forecast",
                &[("location", query.as_param()), ("days", days.to_string())],
                "forecast",
            )
            .await?;

        Ok(parsed.forecast.forecastday.into_iter().map(WireForecastDay::into_day).collect())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<CityMatch>, WeatherError> {
        let parsed: WireSearchPayload = self
            .get_json("/weather/search", &[("query", query.to_string())], "location search")
            .await?;

        let cities = match parsed {
            WireSearchPayload::List(cities) | WireSearchPayload::Wrapped { value: cities } => {
                cities
            }
        };

        Ok(cities.into_iter().map(WireCity::into_match).collect())
    }

    #[instrument(skip(self))]
    async fn station_search(&self, keyword: &str) -> Result<Vec<StationMatch>, WeatherError> {
        let parsed: WireStationSearch = self
            .get_json("/aqi/search", &[("keyword", keyword.to_string())], "station search")
            .await?;

        Ok(parsed.data.into_iter().filter_map(WireStationHit::into_match).collect())
    }

    #[instrument(skip(self))]
    async fn station_reading(&self, station_id: i64) -> Result<StationReading, WeatherError> {
        let parsed: WireStationReading = self
            .get_json(&format!("/aqi/station/{station_id}"), &[], "station reading")
            .await?;

        Ok(StationReading {
            aqi: parsed.aqi.and_then(|aqi| aqi.index()),
            pollutants: parsed.pollutants.into_pollutants(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireCondition {
    #[serde(default)]
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAirQuality {
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    co: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    o3: Option<f64>,
    aqi: Option<WireAqi>,
}

#[derive(Debug, Deserialize)]
struct WireCurrent {
    temp_c: f64,
    #[serde(default)]
    temp_f: f64,
    #[serde(default)]
    feelslike_c: f64,
    #[serde(default)]
    feelslike_f: f64,
    #[serde(default)]
    humidity: u8,
    #[serde(default)]
    wind_kph: f64,
    #[serde(default)]
    wind_mph: f64,
    #[serde(default)]
    wind_degree: u16,
    #[serde(default)]
    wind_dir: String,
    #[serde(default)]
    pressure_mb: f64,
    #[serde(default)]
    pressure_in: f64,
    #[serde(default)]
    uv: f64,
    #[serde(default)]
    precip_mm: f64,
    condition: WireCondition,
    air_quality: Option<WireAirQuality>,
}

#[derive(Debug, Deserialize)]
struct WireCurrentResponse {
    location: WireLocation,
    current: WireCurrent,
}

impl WireCurrentResponse {
    fn into_report(self) -> CurrentReport {
        let WireCurrentResponse { location, current } = self;
        let air = current.air_quality.unwrap_or_default();

        let coordinates = match (location.lat, location.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        CurrentReport {
            place: ReportedPlace {
                name: location.name,
                region: location.region,
                country: location.country,
                coordinates,
            },
            conditions: CurrentConditions {
                temperature_c: current.temp_c,
                temperature_f: current.temp_f,
                feels_like_c: current.feelslike_c,
                feels_like_f: current.feelslike_f,
                humidity_pct: current.humidity,
                wind_kph: current.wind_kph,
                wind_mph: current.wind_mph,
                wind_degree: current.wind_degree,
                wind_dir: current.wind_dir,
                pressure_mb: current.pressure_mb,
                pressure_in: current.pressure_in,
                uv: current.uv,
                precip_mm: current.precip_mm,
                condition: current.condition.text,
                icon: normalize_icon(&current.condition.icon),
            },
            pollutants: Pollutants {
                pm2_5: air.pm2_5,
                pm10: air.pm10,
                co: air.co,
                no2: air.no2,
                so2: air.so2,
                o3: air.o3,
            },
            aqi: air.aqi.and_then(|aqi| aqi.index()),
        }
    }
}

/// Protocol-relative icon URLs (`//cdn...`) become https.
fn normalize_icon(icon: &str) -> String {
    if icon.starts_with("//") { format!("https:{icon}") } else { icon.to_string() }
}

#[derive(Debug, Default, Deserialize)]
struct WireAstro {
    #[serde(default)]
    sunrise: String,
    #[serde(default)]
    sunset: String,
    #[serde(default)]
    moon_phase: String,
}

#[derive(Debug, Deserialize)]
struct WireDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    #[serde(default)]
    maxtemp_f: f64,
    #[serde(default)]
    mintemp_f: f64,
    #[serde(default)]
    daily_chance_of_rain: u8,
    condition: WireCondition,
}

#[derive(Debug, Deserialize)]
struct WireHour {
    time: String,
    temp_c: f64,
    #[serde(default)]
    temp_f: f64,
    #[serde(default)]
    chance_of_rain: u8,
    condition: WireCondition,
}

#[derive(Debug, Deserialize)]
struct WireForecastDay {
    date: NaiveDate,
    day: WireDay,
    #[serde(default)]
    astro: WireAstro,
    #[serde(default)]
    hour: Vec<WireHour>,
}

impl WireForecastDay {
    fn into_day(self) -> ForecastDay {
        ForecastDay {
            date: self.date,
            min_c: self.day.mintemp_c,
            max_c: self.day.maxtemp_c,
            min_f: self.day.mintemp_f,
            max_f: self.day.maxtemp_f,
            condition: self.day.condition.text,
            icon: normalize_icon(&self.day.condition.icon),
            precipitation_chance: self.day.daily_chance_of_rain,
            sunrise: self.astro.sunrise,
            sunset: self.astro.sunset,
            moon_phase: self.astro.moon_phase,
            hours: self
                .hour
                .into_iter()
                .map(|hour| HourlySummary {
                    time: hour.time,
                    temperature_c: hour.temp_c,
                    temperature_f: hour.temp_f,
                    precipitation_chance: hour.chance_of_rain,
                    condition: hour.condition.text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireForecast {
    #[serde(default)]
    forecastday: Vec<WireForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WireForecastResponse {
    forecast: WireForecast,
}

#[derive(Debug, Deserialize)]
struct WireCity {
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl WireCity {
    fn into_match(self) -> CityMatch {
        let coordinates = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };
        CityMatch { name: self.name, region: self.region, country: self.country, coordinates }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSearchPayload {
    List(Vec<WireCity>),
    Wrapped { value: Vec<WireCity> },
}

/// Stations report their index as a number, a numeric string or "-".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAqi {
    Number(f64),
    Text(String),
}

impl WireAqi {
    fn index(&self) -> Option<u16> {
        match self {
            WireAqi::Number(n) if n.is_finite() && *n >= 0.0 => {
                Some((n.round() as u16).min(MAX_INDEX))
            }
            WireAqi::Number(_) => None,
            WireAqi::Text(text) => text.trim().parse::<u16>().ok().map(|n| n.min(MAX_INDEX)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStation {
    name: String,
    #[serde(default)]
    geo: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct WireStationHit {
    uid: i64,
    aqi: Option<WireAqi>,
    station: WireStation,
}

impl WireStationHit {
    /// Stations without a usable position cannot be resolved and are skipped.
    fn into_match(self) -> Option<StationMatch> {
        let [lat, lon] = self.station.geo[..] else {
            debug!(uid = self.uid, "skipping station without coordinates");
            return None;
        };

        Some(StationMatch {
            station_id: self.uid,
            name: self.station.name,
            coordinates: Coordinates::new(lat, lon),
            aqi: self.aqi.and_then(|aqi| aqi.index()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireStationSearch {
    #[serde(default)]
    data: Vec<WireStationHit>,
}

#[derive(Debug, Default, Deserialize)]
struct WireStationPollutants {
    pm25: Option<f64>,
    pm10: Option<f64>,
    o3: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    co: Option<f64>,
}

impl WireStationPollutants {
    fn into_pollutants(self) -> Pollutants {
        Pollutants {
            pm2_5: self.pm25,
            pm10: self.pm10,
            co: self.co,
            no2: self.no2,
            so2: self.so2,
            o3: self.o3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStationReading {
    aqi: Option<WireAqi>,
    #[serde(default)]
    pollutants: WireStationPollutants,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.effective_forecast_days(), 7);
    }

    #[test]
    fn forecast_days_are_clamped() {
        let short = BackendConfig { forecast_days: 3, ..Default::default() };
        let long = BackendConfig { forecast_days: 30, ..Default::default() };
        assert_eq!(short.effective_forecast_days(), 7);
        assert_eq!(long.effective_forecast_days(), 16);
    }

    #[test]
    fn station_aqi_accepts_numbers_and_strings() {
        assert_eq!(WireAqi::Number(87.4).index(), Some(87));
        assert_eq!(WireAqi::Text("153".into()).index(), Some(153));
        assert_eq!(WireAqi::Text("-".into()).index(), None);
        assert_eq!(WireAqi::Number(-1.0).index(), None);
    }

    #[test]
    fn station_aqi_above_scale_is_clamped() {
        assert_eq!(WireAqi::Number(742.0).index(), Some(500));
        assert_eq!(WireAqi::Text("999".into()).index(), Some(500));
    }

    #[test]
    fn station_without_geo_is_skipped() {
        let hit: WireStationHit = serde_json::from_value(serde_json::json!({
            "uid": 12,
            "aqi": "40",
            "station": { "name": "Nowhere", "geo": [] }
        }))
        .unwrap();
        assert!(hit.into_match().is_none());
    }

    #[test]
    fn current_response_maps_air_quality() {
        let parsed: WireCurrentResponse = serde_json::from_value(serde_json::json!({
            "location": { "name": "Delhi", "region": "Delhi", "country": "India", "lat": 28.6, "lon": 77.2 },
            "current": {
                "temp_c": 31.0,
                "condition": { "text": "Haze", "icon": "//cdn.example.com/haze.png" },
                "air_quality": { "pm2_5": 88.1, "pm10": 120.0 }
            }
        }))
        .unwrap();

        let report = parsed.into_report();
        assert_eq!(report.place.coordinates, Some(Coordinates::new(28.6, 77.2)));
        assert_eq!(report.pollutants.pm2_5, Some(88.1));
        assert_eq!(report.aqi, None);
        assert_eq!(report.conditions.icon, "https://cdn.example.com/haze.png");
    }

    #[test]
    fn search_payload_accepts_wrapped_form() {
        let wrapped: WireSearchPayload = serde_json::from_value(serde_json::json!({
            "value": [{ "name": "Leeds", "region": "West Yorkshire", "country": "UK" }]
        }))
        .unwrap();
        assert!(matches!(wrapped, WireSearchPayload::Wrapped { value } if value.len() == 1));
    }
}
