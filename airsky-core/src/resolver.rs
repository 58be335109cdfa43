//! Location resolution: turns a user action into a [`FetchRequest`].

use std::{sync::Arc, time::Duration};

use tokio::time::error::Elapsed;
use tracing::{debug, warn};

use crate::{
    error::WeatherError,
    model::{
        CityMatch, Coordinates, FetchRequest, PlaceMatch, RecentSearchEntry, SearchCandidate,
        StationMatch,
    },
    provider::{PlacesProvider, WeatherBackend},
    store::LocationStore,
};

/// Shorter queries never reach upstream.
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_PLACE_SUGGESTIONS: usize = 5;
pub const MAX_STATION_SUGGESTIONS: usize = 8;

const STATION_REGION: &str = "AQI Station";

/// Merged candidates, in display order: places, cities, stations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    places: Vec<PlaceMatch>,
    cities: Vec<CityMatch>,
    stations: Vec<StationMatch>,
}

impl Suggestions {
    /// Applies the per-group caps; cities are uncapped.
    pub fn new(
        mut places: Vec<PlaceMatch>,
        cities: Vec<CityMatch>,
        mut stations: Vec<StationMatch>,
    ) -> Self {
        places.truncate(MAX_PLACE_SUGGESTIONS);
        stations.truncate(MAX_STATION_SUGGESTIONS);
        Self { places, cities, stations }
    }

    pub fn places(&self) -> &[PlaceMatch] {
        &self.places
    }

    pub fn cities(&self) -> &[CityMatch] {
        &self.cities
    }

    pub fn stations(&self) -> &[StationMatch] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.places.len() + self.cities.len() + self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate at a position of the single linear index.
    pub fn get(&self, index: usize) -> Option<SearchCandidate> {
        let mut index = index;
        if let Some(place) = self.places.get(index) {
            return Some(SearchCandidate::Place(place.clone()));
        }
        index -= self.places.len();
        if let Some(city) = self.cities.get(index) {
            return Some(SearchCandidate::City(city.clone()));
        }
        index -= self.cities.len();
        self.stations.get(index).cloned().map(SearchCandidate::Station)
    }

    pub fn candidates(&self) -> Vec<SearchCandidate> {
        (0..self.len()).filter_map(|index| self.get(index)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    backend: Arc<dyn WeatherBackend>,
    places: Option<Arc<dyn PlacesProvider>>,
    store: Arc<LocationStore>,
    lookup_timeout: Duration,
}

impl Resolver {
    pub fn new(
        backend: Arc<dyn WeatherBackend>,
        places: Option<Arc<dyn PlacesProvider>>,
        store: Arc<LocationStore>,
        lookup_timeout: Duration,
    ) -> Self {
        Self { backend, places, store, lookup_timeout }
    }

    /// Free text goes to the backend unchanged.
    pub fn resolve_from_query(&self, text: &str) -> FetchRequest {
        self.remember(RecentSearchEntry::new(text, "", ""));
        FetchRequest::Query(text.to_string())
    }

    pub fn resolve_from_city(&self, city: &CityMatch) -> FetchRequest {
        self.remember(RecentSearchEntry::new(&city.name, &city.region, &city.country));
        FetchRequest::Query(city.name.clone())
    }

    /// Marks the request with the station id so its reading gets overlaid.
    pub fn resolve_from_station(&self, station: &StationMatch) -> FetchRequest {
        self.remember(RecentSearchEntry::new(&station.name, STATION_REGION, ""));
        FetchRequest::Coordinates {
            coordinates: station.coordinates,
            display_name: Some(station.name.clone()),
            station_id: Some(station.station_id),
        }
    }

    /// Needs a detail lookup; when that fails the candidate is dropped and
    /// nothing is resolved.
    pub async fn resolve_from_place(&self, place: &PlaceMatch) -> Option<FetchRequest> {
        let Some(places) = &self.places else {
            debug!(place_id = %place.place_id, "no places provider configured; dropping candidate");
            return None;
        };

        let details =
            match tokio::time::timeout(self.lookup_timeout, places.details(&place.place_id)).await
            {
                Ok(Ok(details)) => details,
                Ok(Err(err)) => {
                    warn!(place_id = %place.place_id, error = %err, "place detail lookup failed; dropping candidate");
                    return None;
                }
                Err(_) => {
                    warn!(place_id = %place.place_id, "place detail lookup timed out; dropping candidate");
                    return None;
                }
            };

        self.remember(RecentSearchEntry::new(&details.name, &place.secondary_text, ""));
        Some(FetchRequest::Coordinates {
            coordinates: details.coordinates,
            display_name: Some(details.name),
            station_id: None,
        })
    }

    /// Coordinates pass straight through. A reverse-geocoded name decorates
    /// the request when available within the lookup timeout.
    pub async fn resolve_from_geolocation(&self, coordinates: Coordinates) -> FetchRequest {
        let display_name = match &self.places {
            None => None,
            Some(places) => {
                match tokio::time::timeout(self.lookup_timeout, places.reverse_geocode(coordinates))
                    .await
                {
                    Ok(Ok(name)) => Some(name),
                    Ok(Err(err)) => {
                        debug!(%coordinates, error = %err, "reverse geocoding failed");
                        None
                    }
                    Err(_) => {
                        debug!(%coordinates, "reverse geocoding timed out");
                        None
                    }
                }
            }
        };

        FetchRequest::Coordinates { coordinates, display_name, station_id: None }
    }

    /// `None` only for a place whose detail lookup failed.
    pub async fn resolve(&self, candidate: &SearchCandidate) -> Option<FetchRequest> {
        match candidate {
            SearchCandidate::City(city) => Some(self.resolve_from_city(city)),
            SearchCandidate::Station(station) => Some(self.resolve_from_station(station)),
            SearchCandidate::Place(place) => self.resolve_from_place(place).await,
        }
    }

    /// Queries every source concurrently. A failing source contributes an
    /// empty group.
    pub async fn suggest(&self, text: &str) -> Suggestions {
        let text = text.trim();
        if text.chars().count() < MIN_QUERY_LEN {
            return Suggestions::default();
        }

        let places = async {
            match &self.places {
                Some(places) => {
                    absorb("place", tokio::time::timeout(self.lookup_timeout, places.predict(text)).await)
                }
                None => Vec::new(),
            }
        };

        let (cities, stations, places) = tokio::join!(
            tokio::time::timeout(self.lookup_timeout, self.backend.search(text)),
            tokio::time::timeout(self.lookup_timeout, self.backend.station_search(text)),
            places,
        );

        let cities = absorb("city", cities);
        let stations = absorb("station", stations);

        Suggestions::new(places, cities, stations)
    }

    fn remember(&self, entry: RecentSearchEntry) {
        if let Err(err) = self.store.record_search(entry) {
            warn!(error = %err, "failed to record recent search");
        }
    }
}

fn absorb<T: Default>(source: &str, result: Result<Result<T, WeatherError>, Elapsed>) -> T {
    match result {
        Ok(Ok(found)) => found,
        Ok(Err(err)) => {
            warn!(source, error = %err, "suggestions unavailable");
            T::default()
        }
        Err(_) => {
            warn!(source, "suggestions timed out");
            T::default()
        }
    }
}
