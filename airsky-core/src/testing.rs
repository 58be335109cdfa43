//! In-process fakes of the external interfaces, shared by unit tests.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::{
    error::WeatherError,
    model::{
        CityMatch, Coordinates, CurrentConditions, CurrentReport, ForecastDay, HourlySummary,
        PlaceDetails, PlaceMatch, Pollutants, ReportedPlace, StationMatch, StationReading,
    },
    provider::{Geolocator, LocationQuery, PlacesProvider, WeatherBackend},
};

pub fn sample_conditions() -> CurrentConditions {
    CurrentConditions {
        temperature_c: 18.0,
        temperature_f: 64.4,
        feels_like_c: 17.0,
        feels_like_f: 62.6,
        humidity_pct: 60,
        wind_kph: 12.0,
        wind_mph: 7.5,
        wind_degree: 225,
        wind_dir: "SW".into(),
        pressure_mb: 1012.0,
        pressure_in: 29.88,
        uv: 4.0,
        precip_mm: 0.0,
        condition: "Partly cloudy".into(),
        icon: "https://cdn.example.com/116.png".into(),
    }
}

pub fn sample_report(name: &str) -> CurrentReport {
    CurrentReport {
        place: ReportedPlace {
            name: name.to_string(),
            region: "Region".into(),
            country: "Country".into(),
            coordinates: Some(Coordinates::new(10.0, 20.0)),
        },
        conditions: sample_conditions(),
        pollutants: Pollutants {
            pm2_5: Some(10.0),
            pm10: Some(20.0),
            o3: Some(30.0),
            ..Default::default()
        },
        aqi: Some(42),
    }
}

pub fn sample_forecast(days: u8) -> Vec<ForecastDay> {
    let start = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");
    (0..days)
        .map(|offset| ForecastDay {
            date: start + chrono::Days::new(u64::from(offset)),
            min_c: 9.0,
            max_c: 19.0,
            min_f: 48.2,
            max_f: 66.2,
            condition: "Sunny".into(),
            icon: String::new(),
            precipitation_chance: 10,
            sunrise: "07:12 AM".into(),
            sunset: "06:20 PM".into(),
            moon_phase: "Waxing Crescent".into(),
            hours: if offset == 0 {
                (0..24)
                    .map(|hour| HourlySummary {
                        time: format!("2026-10-18 {hour:02}:00"),
                        temperature_c: 12.0,
                        temperature_f: 53.6,
                        precipitation_chance: 0,
                        condition: "Clear".into(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect()
}

/// Name the fake backend reports for coordinate queries.
pub const REPORTED_PLACE: &str = "Reported Place";

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub fail_current: Option<WeatherError>,
    pub fail_forecast: Option<WeatherError>,
    /// `None` answers every station with an unavailable error.
    pub station: Option<StationReading>,
    pub cities: Vec<CityMatch>,
    pub stations: Vec<StationMatch>,
    pub fail_search: bool,
    /// Per-location artificial latency, keyed by the `location` parameter.
    pub delays: HashMap<String, Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn pause_for(&self, query: &LocationQuery) {
        if let Some(delay) = self.delays.get(&query.as_param()) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl WeatherBackend for FakeBackend {
    async fn current_conditions(
        &self,
        query: &LocationQuery,
    ) -> Result<CurrentReport, WeatherError> {
        self.calls.lock().push(format!("current:{}", query.as_param()));
        self.pause_for(query).await;
        if let Some(err) = &self.fail_current {
            return Err(err.clone());
        }
        Ok(match query {
            LocationQuery::Name(name) => sample_report(name),
            LocationQuery::Coordinates(_) => sample_report(REPORTED_PLACE),
        })
    }

    async fn forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        self.calls.lock().push(format!("forecast:{}:{days}", query.as_param()));
        self.pause_for(query).await;
        match &self.fail_forecast {
            Some(err) => Err(err.clone()),
            None => Ok(sample_forecast(days)),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<CityMatch>, WeatherError> {
        self.calls.lock().push(format!("search:{query}"));
        if self.fail_search {
            return Err(WeatherError::network("search", "connection reset"));
        }
        Ok(self.cities.clone())
    }

    async fn station_search(&self, keyword: &str) -> Result<Vec<StationMatch>, WeatherError> {
        self.calls.lock().push(format!("stations:{keyword}"));
        if self.fail_search {
            return Err(WeatherError::network("station search", "connection reset"));
        }
        Ok(self.stations.clone())
    }

    async fn station_reading(&self, station_id: i64) -> Result<StationReading, WeatherError> {
        self.calls.lock().push(format!("station:{station_id}"));
        self.station.ok_or_else(|| WeatherError::StationUnavailable {
            station_id,
            reason: "HTTP 503".into(),
        })
    }
}

#[derive(Debug, Default)]
pub struct FakePlaces {
    pub predictions: Vec<PlaceMatch>,
    pub details: HashMap<String, PlaceDetails>,
    pub reverse_name: Option<String>,
    pub reverse_delay: Option<Duration>,
}

#[async_trait]
impl PlacesProvider for FakePlaces {
    async fn predict(&self, _text: &str) -> Result<Vec<PlaceMatch>, WeatherError> {
        Ok(self.predictions.clone())
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails, WeatherError> {
        self.details
            .get(place_id)
            .cloned()
            .ok_or_else(|| WeatherError::NotFound(place_id.to_string()))
    }

    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, WeatherError> {
        if let Some(delay) = self.reverse_delay {
            tokio::time::sleep(delay).await;
        }
        self.reverse_name.clone().ok_or_else(|| WeatherError::NotFound(coordinates.as_query()))
    }
}

#[derive(Debug)]
pub struct FakeGeolocator(pub Result<Coordinates, WeatherError>);

#[async_trait]
impl Geolocator for FakeGeolocator {
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        self.0.clone()
    }
}

pub fn city(name: &str) -> CityMatch {
    CityMatch {
        name: name.to_string(),
        region: "Region".into(),
        country: "Country".into(),
        coordinates: None,
    }
}

pub fn station(id: i64, name: &str) -> StationMatch {
    StationMatch {
        station_id: id,
        name: name.to_string(),
        coordinates: Coordinates::new(1.0 + id as f64, 2.0),
        aqi: Some(55),
    }
}

pub fn place(id: &str, name: &str) -> PlaceMatch {
    PlaceMatch {
        place_id: id.to_string(),
        main_text: name.to_string(),
        secondary_text: "Somewhere, Earth".into(),
    }
}
