use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::WeatherError,
    model::{
        CityMatch, Coordinates, CurrentReport, ForecastDay, PlaceDetails, PlaceMatch,
        StationMatch, StationReading,
    },
};

pub mod backend;
pub mod geolocation;
pub mod places;

pub use backend::{BackendConfig, HttpBackend};
pub use geolocation::FixedPosition;
pub use places::{GooglePlaces, PlacesConfig};

/// What the backend's weather endpoints are asked about.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Name(String),
    Coordinates(Coordinates),
}

impl LocationQuery {
    /// Value of the backend's `location` parameter.
    pub fn as_param(&self) -> String {
        match self {
            LocationQuery::Name(name) => name.clone(),
            LocationQuery::Coordinates(coordinates) => coordinates.as_query(),
        }
    }
}

/// Weather and air-quality backend.
#[async_trait]
pub trait WeatherBackend: Send + Sync + Debug {
    async fn current_conditions(&self, query: &LocationQuery)
    -> Result<CurrentReport, WeatherError>;

    async fn forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<Vec<ForecastDay>, WeatherError>;

    async fn search(&self, query: &str) -> Result<Vec<CityMatch>, WeatherError>;

    async fn station_search(&self, keyword: &str) -> Result<Vec<StationMatch>, WeatherError>;

    async fn station_reading(&self, station_id: i64) -> Result<StationReading, WeatherError>;
}

/// Third-party place autocomplete.
#[async_trait]
pub trait PlacesProvider: Send + Sync + Debug {
    async fn predict(&self, text: &str) -> Result<Vec<PlaceMatch>, WeatherError>;

    async fn details(&self, place_id: &str) -> Result<PlaceDetails, WeatherError>;

    /// Best-effort display name for a position.
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, WeatherError>;
}

/// Device/OS position capability.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    /// Fails with `PermissionDenied` or `PositionUnavailable`.
    async fn current_position(&self) -> Result<Coordinates, WeatherError>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_query_param_is_comma_joined() {
        let query = LocationQuery::Coordinates(Coordinates::new(51.5, -0.12));
        assert_eq!(query.as_param(), "51.5,-0.12");
        assert_eq!(LocationQuery::Name("Leeds".into()).as_param(), "Leeds");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);

        assert_eq!(truncate_body("short"), "short");
    }
}
