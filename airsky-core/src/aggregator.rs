//! Weather/AQI aggregation: concurrent fetches, station overlay, snapshot assembly.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    aqi,
    error::WeatherError,
    model::{
        AqiProvenance, Coordinates, CurrentReport, FetchRequest, ForecastDay, Location,
        StationOverlay, StationReading, WeatherSnapshot,
    },
    provider::{LocationQuery, WeatherBackend},
};

const HOURS_PER_DAY: usize = 24;

/// Result of the optional third request of a coordinate aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum StationOutcome {
    NotRequested,
    Reading(StationReading),
    Unavailable(WeatherError),
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    backend: Arc<dyn WeatherBackend>,
    forecast_days: u8,
    request_timeout: Duration,
}

impl Aggregator {
    pub fn new(backend: Arc<dyn WeatherBackend>, forecast_days: u8, request_timeout: Duration) -> Self {
        Self { backend, forecast_days, request_timeout }
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<WeatherSnapshot, WeatherError> {
        match request {
            FetchRequest::Query(text) => self.fetch_for_location_query(text).await,
            FetchRequest::Coordinates { coordinates, display_name, station_id } => {
                self.fetch_for_coordinates(*coordinates, display_name.as_deref(), *station_id)
                    .await
            }
        }
    }

    /// Current conditions and forecast for a free-text place name.
    pub async fn fetch_for_location_query(
        &self,
        text: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let query = LocationQuery::Name(text.to_string());

        let (current, forecast) = tokio::join!(
            self.bounded("current conditions", self.backend.current_conditions(&query)),
            self.bounded("forecast", self.backend.forecast(&query, self.forecast_days)),
        );
        let current = current?;
        let forecast = forecast?;

        let location = Location {
            name: current.place.name.clone(),
            region: Some(current.place.region.clone()),
            country: Some(current.place.country.clone()),
            coordinates: current.place.coordinates,
            monitoring_station_id: None,
            aqi_provenance: AqiProvenance::GeneralProvider,
        };

        info!(location = %location.name, "weather fetched by name");
        Ok(assemble(location, current, forecast, StationOutcome::NotRequested))
    }

    /// Current conditions and forecast for a position, overlaid with the
    /// station's reading when `station_id` is given.
    ///
    /// A failed station request never fails the aggregation: the snapshot keeps
    /// the general provider's values and is still tagged as station-sourced.
    pub async fn fetch_for_coordinates(
        &self,
        coordinates: Coordinates,
        display_name: Option<&str>,
        station_id: Option<i64>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let query = LocationQuery::Coordinates(coordinates);

        let station = async {
            let Some(id) = station_id else {
                return StationOutcome::NotRequested;
            };
            match self.bounded("station reading", self.backend.station_reading(id)).await {
                Ok(reading) => StationOutcome::Reading(reading),
                Err(err) => {
                    warn!(station_id = id, error = %err, "station overlay unavailable; keeping general provider values");
                    StationOutcome::Unavailable(err)
                }
            }
        };

        let (current, forecast, station) = tokio::join!(
            self.bounded("current conditions", self.backend.current_conditions(&query)),
            self.bounded("forecast", self.backend.forecast(&query, self.forecast_days)),
            station,
        );
        let current = current?;
        let forecast = forecast?;

        let location = Location {
            name: match display_name {
                Some(name) => name.to_string(),
                None if current.place.name.is_empty() => coordinates.to_string(),
                None => current.place.name.clone(),
            },
            region: Some(current.place.region.clone()),
            country: Some(current.place.country.clone()),
            coordinates: Some(coordinates),
            monitoring_station_id: station_id,
            aqi_provenance: if station_id.is_some() {
                AqiProvenance::StationProvider
            } else {
                AqiProvenance::GeneralProvider
            },
        };

        info!(location = %location.name, %coordinates, ?station_id, "weather fetched by coordinates");
        Ok(assemble(location, current, forecast, station))
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, WeatherError>>,
    ) -> Result<T, WeatherError> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(WeatherError::timeout(what, self.request_timeout)),
        }
    }
}

/// Builds the general-provider snapshot, then applies the station outcome.
fn assemble(
    location: Location,
    current: CurrentReport,
    forecast: Vec<ForecastDay>,
    station: StationOutcome,
) -> WeatherSnapshot {
    if forecast.first().is_some_and(|day| day.hours.len() < HOURS_PER_DAY) {
        debug!("forecast day 0 has fewer than {HOURS_PER_DAY} hourly entries");
    }

    // The classifier only fills in when the backend has no ready-made index.
    let air_quality_index = current.aqi.or_else(|| {
        let derived = current.pollutants.pm2_5.is_some() || current.pollutants.pm10.is_some();
        derived.then(|| aqi::combined_index(&current.pollutants))
    });

    let snapshot = WeatherSnapshot {
        location,
        current: current.conditions,
        pollutants: current.pollutants,
        air_quality_index,
        forecast_days: forecast,
        station_overlay: StationOverlay::NotRequested,
        fetched_at: Utc::now(),
    };

    match station {
        StationOutcome::NotRequested => snapshot,
        StationOutcome::Reading(reading) => merge_station_reading(snapshot, &reading),
        StationOutcome::Unavailable(_) => {
            WeatherSnapshot { station_overlay: StationOverlay::Unavailable, ..snapshot }
        }
    }
}

/// Station values win: its index replaces the snapshot's, and each pollutant
/// it reports replaces the general provider's. Pollutants it omits are kept.
pub fn merge_station_reading(snapshot: WeatherSnapshot, reading: &StationReading) -> WeatherSnapshot {
    WeatherSnapshot {
        air_quality_index: reading.aqi.or(snapshot.air_quality_index),
        pollutants: snapshot.pollutants.overlay(&reading.pollutants),
        station_overlay: StationOverlay::Applied,
        location: Location { aqi_provenance: AqiProvenance::StationProvider, ..snapshot.location },
        ..snapshot
    }
}
