//! Core library for the `airsky` CLI.
//!
//! This crate defines:
//! - AQI classification from particulate concentrations
//! - Persistence of recent searches, last location and preferences
//! - Location resolution (free text, cities, stations, places, geolocation)
//! - Aggregation of current weather, forecast and station air quality
//! - A [`WeatherSession`] handle tying the above together
//!
//! It is used by `airsky-cli`, but can also be reused by other front-ends.

pub mod aggregator;
pub mod aqi;
pub mod config;
pub mod debounce;
pub mod error;
pub mod model;
pub mod navigation;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ErrorKind, StoreError, WeatherError};
pub use model::{FetchRequest, Location, SearchCandidate, WeatherSnapshot};
pub use provider::{Geolocator, PlacesProvider, WeatherBackend};
pub use session::{ResolutionStatus, SessionSettings, WeatherSession};
pub use store::LocationStore;
