use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{Coordinates, PlaceDetails, PlaceMatch},
};

use super::{PlacesProvider, truncate_body};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub api_key: String,

    #[serde(default = "default_places_url")]
    pub base_url: String,

    #[serde(default = "default_places_timeout")]
    pub timeout_secs: u64,
}

fn default_places_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

const fn default_places_timeout() -> u64 {
    10
}

impl PlacesConfig {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: default_places_url(), timeout_secs: default_places_timeout() }
    }
}

/// Google Places web service (autocomplete, details, reverse geocoding).
#[derive(Debug, Clone)]
pub struct GooglePlaces {
    api_key: String,
    base_url: String,
    http: Client,
}

impl GooglePlaces {
    pub fn new(config: &PlacesConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::network("Failed to build places HTTP client", e))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WeatherError::network(format!("Failed to send {what} request"), e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::network(format!("Failed to read {what} response"), e))?;

        if !status.is_success() {
            return Err(WeatherError::network(
                format!("{what} request failed with status {status}"),
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::invalid_response(what, e))
    }
}

/// Google reports application-level failures in a `status` field on HTTP 200.
fn check_status(status: &str, what: &str, subject: &str) -> Result<(), WeatherError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" | "NOT_FOUND" => Err(WeatherError::NotFound(subject.to_string())),
        other => Err(WeatherError::network(format!("{what} rejected"), other)),
    }
}

#[async_trait]
impl PlacesProvider for GooglePlaces {
    #[instrument(skip(self))]
    async fn predict(&self, text: &str) -> Result<Vec<PlaceMatch>, WeatherError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let parsed: AutocompleteResponse = self
            .get(
                "/place/autocomplete/json",
                &[("input", text), ("types", "(cities)")],
                "place autocomplete",
            )
            .await?;

        if parsed.status == "ZERO_RESULTS" {
            return Ok(Vec::new());
        }
        check_status(&parsed.status, "place autocomplete", text)?;

        Ok(parsed
            .predictions
            .into_iter()
            .map(|prediction| {
                let formatting = prediction.structured_formatting.unwrap_or_default();
                PlaceMatch {
                    place_id: prediction.place_id,
                    main_text: formatting.main_text.unwrap_or(prediction.description),
                    secondary_text: formatting.secondary_text.unwrap_or_default(),
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, WeatherError> {
        let parsed: DetailsResponse = self
            .get(
                "/place/details/json",
                &[("place_id", place_id), ("fields", "geometry,name,formatted_address")],
                "place details",
            )
            .await?;

        check_status(&parsed.status, "place details", place_id)?;

        let result = parsed.result.ok_or_else(|| WeatherError::NotFound(place_id.to_string()))?;
        let geometry =
            result.geometry.ok_or_else(|| WeatherError::NotFound(place_id.to_string()))?;

        Ok(PlaceDetails {
            name: result.name,
            coordinates: Coordinates::new(geometry.location.lat, geometry.location.lng),
        })
    }

    #[instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, WeatherError> {
        let latlng = format!("{},{}", coordinates.lat, coordinates.lon);
        let parsed: GeocodeResponse =
            self.get("/geocode/json", &[("latlng", latlng.as_str())], "reverse geocode").await?;

        check_status(&parsed.status, "reverse geocode", &latlng)?;

        // Prefer the most specific populated-place result.
        let best = parsed
            .results
            .iter()
            .find(|result| {
                result.types.iter().any(|t| {
                    matches!(t.as_str(), "locality" | "sublocality" | "neighborhood")
                })
            })
            .or_else(|| parsed.results.first())
            .ok_or_else(|| WeatherError::NotFound(latlng.clone()))?;

        let name = best
            .address_components
            .first()
            .map(|component| component.long_name.clone())
            .unwrap_or_else(|| best.formatted_address.clone());

        debug!(%name, "reverse geocoded");
        Ok(name)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StructuredFormatting {
    main_text: Option<String>,
    secondary_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    #[serde(default)]
    description: String,
    structured_formatting: Option<StructuredFormatting>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    name: String,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<DetailsResult>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
}
