use std::time::Duration;

use thiserror::Error;

/// Coarse failure classes the rest of the system reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkFailure,
    NotFound,
    PartialProviderFailure,
    StorageCorruption,
    PermissionDenied,
}

/// Errors produced while talking to the backend, the places provider or
/// the geolocation capability.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    /// Connection failure, timeout or non-2xx status.
    #[error("{context}: {reason}")]
    Network { context: String, reason: String },

    /// Empty search or an unresolvable location.
    #[error("No matching location found for '{0}'")]
    NotFound(String),

    /// The upstream answered, but the body could not be decoded.
    #[error("Invalid response from {context}: {reason}")]
    InvalidResponse { context: String, reason: String },

    /// Station overlay could not be obtained. Never fatal to an aggregation.
    #[error("Station {station_id} reading unavailable: {reason}")]
    StationUnavailable { station_id: i64, reason: String },

    #[error("Geolocation permission denied")]
    PermissionDenied,

    #[error("Current position unavailable: {0}")]
    PositionUnavailable(String),
}

impl WeatherError {
    pub fn network(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network { context: context.into(), reason: reason.to_string() }
    }

    pub fn invalid_response(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidResponse { context: context.into(), reason: reason.to_string() }
    }

    pub fn timeout(context: impl Into<String>, after: Duration) -> Self {
        Self::Network {
            context: context.into(),
            reason: format!("timed out after {}ms", after.as_millis()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Network { .. } | WeatherError::InvalidResponse { .. } => {
                ErrorKind::NetworkFailure
            }
            WeatherError::NotFound(_) => ErrorKind::NotFound,
            WeatherError::StationUnavailable { .. } => ErrorKind::PartialProviderFailure,
            // A position that cannot be obtained is handled exactly like a refusal:
            // fall back to the last known location.
            WeatherError::PermissionDenied | WeatherError::PositionUnavailable(_) => {
                ErrorKind::PermissionDenied
            }
        }
    }

    /// Only failures of the primary fetches are shown to the user (with a retry).
    pub fn is_user_visible(&self) -> bool {
        matches!(self.kind(), ErrorKind::NetworkFailure | ErrorKind::NotFound)
    }
}

/// Write-side failures of the local key-value store.
///
/// Reads never fail: malformed values degrade to the key's default.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
