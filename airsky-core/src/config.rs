use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    provider::{BackendConfig, PlacesConfig},
    session::{DEFAULT_LOCATION, SessionSettings},
};

const MIN_GEOLOCATION_TIMEOUT_SECS: u64 = 5;
const MAX_GEOLOCATION_TIMEOUT_SECS: u64 = 15;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_location = "London"
///
/// [backend]
/// base_url = "http://localhost:8080/api"
/// forecast_days = 7
///
/// [places]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    /// Place autocomplete and reverse geocoding; disabled when absent.
    #[serde(default)]
    pub places: Option<PlacesConfig>,

    #[serde(default = "default_geolocation_timeout")]
    pub geolocation_timeout_secs: u64,

    #[serde(default = "default_location")]
    pub default_location: String,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub strict_ordering: bool,
}

const fn default_geolocation_timeout() -> u64 {
    10
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

const fn default_debounce_ms() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            places: None,
            geolocation_timeout_secs: default_geolocation_timeout(),
            default_location: default_location(),
            debounce_ms: default_debounce_ms(),
            strict_ordering: false,
        }
    }
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "airsky", "airsky")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace the places API key, keeping any custom endpoint.
    pub fn set_places_api_key(&mut self, api_key: String) {
        match &mut self.places {
            Some(places) => places.api_key = api_key,
            None => self.places = Some(PlacesConfig::new(api_key)),
        }
    }

    pub fn has_places(&self) -> bool {
        self.places.as_ref().is_some_and(|places| !places.api_key.is_empty())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn session_settings(&self) -> SessionSettings {
        let lookup_timeout = self
            .places
            .as_ref()
            .map_or(self.backend.timeout(), |places| Duration::from_secs(places.timeout_secs));

        SessionSettings {
            forecast_days: self.backend.effective_forecast_days(),
            request_timeout: self.backend.timeout(),
            lookup_timeout,
            geolocation_timeout: Duration::from_secs(self.geolocation_timeout_secs.clamp(
                MIN_GEOLOCATION_TIMEOUT_SECS,
                MAX_GEOLOCATION_TIMEOUT_SECS,
            )),
            default_location: if self.default_location.trim().is_empty() {
                default_location()
            } else {
                self.default_location.clone()
            },
            strict_ordering: self.strict_ordering,
            debounce: self.debounce(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").expect("empty config parses");

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.default_location, "London");
        assert_eq!(cfg.debounce(), Duration::from_millis(300));
        assert!(!cfg.has_places());
    }

    #[test]
    fn partial_backend_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [backend]
            forecast_days = 10
            "#,
        )
        .expect("config parses");

        assert_eq!(cfg.backend.forecast_days, 10);
        assert_eq!(cfg.backend.base_url, "http://localhost:8080/api");
        assert_eq!(cfg.session_settings().forecast_days, 10);
    }

    #[test]
    fn set_places_api_key_keeps_custom_endpoint() {
        let mut cfg = Config::default();
        cfg.set_places_api_key("FIRST".into());
        assert!(cfg.has_places());

        if let Some(places) = &mut cfg.places {
            places.base_url = "http://127.0.0.1:9999".into();
        }
        cfg.set_places_api_key("SECOND".into());

        let places = cfg.places.as_ref().expect("places configured");
        assert_eq!(places.api_key, "SECOND");
        assert_eq!(places.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn session_settings_clamp_out_of_range_values() {
        let cfg = Config {
            backend: BackendConfig { forecast_days: 30, ..Default::default() },
            geolocation_timeout_secs: 60,
            default_location: "  ".into(),
            ..Default::default()
        };

        let settings = cfg.session_settings();

        assert_eq!(settings.forecast_days, 16);
        assert_eq!(settings.geolocation_timeout, Duration::from_secs(15));
        assert_eq!(settings.default_location, "London");
    }

    #[test]
    fn debounce_interval_reaches_session_settings() {
        let cfg: Config = toml::from_str("debounce_ms = 150").expect("config parses");
        assert_eq!(cfg.session_settings().debounce, Duration::from_millis(150));
        assert_eq!(Config::default().session_settings().debounce, Duration::from_millis(300));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut cfg = Config { strict_ordering: true, ..Default::default() };
        cfg.set_places_api_key("KEY".into());

        let text = toml::to_string_pretty(&cfg).expect("serializes");
        let back: Config = toml::from_str(&text).expect("parses");

        assert_eq!(back, cfg);
    }
}
