use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Select, Text};

use airsky_core::{
    Config, LocationStore, WeatherError, WeatherSession, WeatherSnapshot,
    aqi,
    model::{Coordinates, Pollutants, RecentSearchEntry, Theme, UnitPreference},
    navigation::SuggestionNavigator,
    provider::{
        FixedPosition, GooglePlaces, HttpBackend,
        backend::{MAX_FORECAST_DAYS, MIN_FORECAST_DAYS},
    },
    resolver::Suggestions,
    store::FileStore,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "airsky", version, about = "Weather and air-quality dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively configure the backend and optional place search.
    Configure,

    /// Show weather for a location; without QUERY, the last viewed one.
    Show {
        /// Free-text location, e.g. "Paris" or "48.85,2.35".
        query: Option<String>,
    },

    /// Search cities, monitoring stations and places, then pick one.
    Search {
        /// At least two characters.
        query: String,
    },

    /// Show weather for the current position.
    Here {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Re-fetch the last viewed location.
    Refresh,

    /// List recent searches.
    Recent,

    /// Manage favourite locations.
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Show or set the unit system ("metric" or "imperial").
    Units { units: Option<String> },

    /// Set the theme ("light" or "dark"); toggles when omitted.
    Theme { theme: Option<String> },

    /// Compute the AQI for particulate concentrations (µg/m³).
    Aqi {
        #[arg(long)]
        pm25: Option<f64>,

        #[arg(long)]
        pm10: Option<f64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoriteAction {
    /// Add a location by name; the last viewed one when omitted.
    Add { name: Option<String> },
    /// Remove a favourite by name.
    Remove { name: String },
    /// List favourites.
    List,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { query } => {
                let session = open_session(None)?;
                let result = match query {
                    Some(query) => session.search(&query).await,
                    None => session.start().await,
                };
                present(&session, result).await
            }
            Command::Search { query } => search(&query).await,
            Command::Here { lat, lon } => {
                let position = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
                let session = open_session(Some(FixedPosition::new(position)))?;
                let result = session.use_current_position().await;
                present(&session, result).await
            }
            Command::Refresh => {
                let session = open_session(None)?;
                if session.store().last_location().is_none() {
                    bail!("Nothing to refresh yet.\nHint: run `airsky show <location>` first.");
                }
                let result = session.start().await;
                present(&session, result).await
            }
            Command::Recent => {
                let store = open_store()?;
                print_entries("Recent searches", &store.recent_searches());
                Ok(())
            }
            Command::Favorite { action } => favorite(action),
            Command::Units { units } => {
                let store = open_store()?;
                if let Some(units) = units {
                    let units: UnitPreference = units.parse()?;
                    store.set_unit_preference(units)?;
                }
                println!("Units: {}", store.unit_preference().as_str());
                Ok(())
            }
            Command::Theme { theme } => {
                let store = open_store()?;
                let theme = match theme {
                    Some(theme) => theme.parse::<Theme>()?,
                    None => store.theme_preference().toggled(),
                };
                store.set_theme_preference(theme)?;
                println!("Theme: {}", theme.as_str());
                Ok(())
            }
            Command::Aqi { pm25, pm10 } => {
                if pm25.is_none() && pm10.is_none() {
                    bail!("Provide at least one of --pm25 or --pm10.");
                }
                let index =
                    aqi::combined_index(&Pollutants { pm2_5: pm25, pm10, ..Default::default() });
                println!("{}", render::aqi_line(Some(index)));
                println!("{}", aqi::classify(index).guidance);
                Ok(())
            }
        }
    }
}

fn open_store() -> anyhow::Result<LocationStore> {
    let file = FileStore::open_default()?;
    Ok(LocationStore::new(Box::new(file)))
}

fn open_session(geolocator: Option<FixedPosition>) -> anyhow::Result<WeatherSession> {
    let cfg = Config::load()?;
    tracing::debug!(backend = %cfg.backend.base_url, places = cfg.has_places(), "configuration loaded");

    let backend = HttpBackend::new(&cfg.backend).context("Failed to create backend client")?;
    let store = Arc::new(open_store()?);
    let mut session = WeatherSession::new(Arc::new(backend), store, cfg.session_settings());
    if let Some(places) = cfg.places.as_ref().filter(|_| cfg.has_places()) {
        let places = GooglePlaces::new(places).context("Failed to create places client")?;
        session = session.with_places(Arc::new(places));
    }
    if let Some(geolocator) = geolocator {
        session = session.with_geolocator(Arc::new(geolocator));
    }

    Ok(session)
}

/// Prints the snapshot, or the error with an offer to retry the same request.
async fn present(
    session: &WeatherSession,
    mut result: Result<WeatherSnapshot, WeatherError>,
) -> anyhow::Result<()> {
    loop {
        match result {
            Ok(snapshot) => {
                let mut text = String::new();
                render::snapshot(&mut text, &snapshot, session.units())?;
                print!("{text}");
                return Ok(());
            }
            Err(err) => {
                eprintln!("{}", render::error(&err));
                let again = Confirm::new("Retry?").with_default(false).prompt().unwrap_or(false);
                if !again {
                    return Err(err.into());
                }
                result = match session.retry().await {
                    Ok(Some(snapshot)) => Ok(snapshot),
                    Ok(None) => return Err(err.into()),
                    Err(err) => Err(err),
                };
            }
        }
    }
}

async fn search(query: &str) -> anyhow::Result<()> {
    let session = open_session(None)?;

    // Same path as typed input; a one-shot query settles after one interval.
    let (input, mut debouncer) = session.input_channel();
    input.send(query);
    drop(input);
    let mut suggestions = Suggestions::default();
    session.suggest_settled(&mut debouncer, |_, settled| suggestions = settled).await;

    if suggestions.is_empty() {
        bail!("No matches for '{query}'.");
    }

    let mut navigator = SuggestionNavigator::new();
    navigator.show(suggestions);

    let options: Vec<String> = navigator
        .suggestions()
        .candidates()
        .iter()
        .map(|candidate| format!("{} ({})", candidate.label(), candidate.description()))
        .collect();
    let picked = Select::new("Pick a location:", options).raw_prompt()?;

    let Some(candidate) = navigator.commit_at(picked.index) else {
        bail!("Selection is no longer available.");
    };
    match session.select(&candidate).await {
        Ok(Some(snapshot)) => present(&session, Ok(snapshot)).await,
        Ok(None) => bail!("Could not resolve '{}'.", candidate.label()),
        Err(err) => present(&session, Err(err)).await,
    }
}

fn favorite(action: FavoriteAction) -> anyhow::Result<()> {
    let store = open_store()?;
    match action {
        FavoriteAction::Add { name } => {
            let entry = match name {
                Some(name) => RecentSearchEntry::new(name, "", ""),
                None => {
                    let Some(location) = store.last_location() else {
                        bail!("No location viewed yet; pass a name.");
                    };
                    RecentSearchEntry::new(
                        location.name,
                        location.region.unwrap_or_default(),
                        location.country.unwrap_or_default(),
                    )
                }
            };
            let name = entry.name.clone();
            store.add_favorite(entry)?;
            println!("★ {name}");
        }
        FavoriteAction::Remove { name } => {
            if !store.is_favorite(&name) {
                bail!("'{name}' is not a favourite.");
            }
            store.remove_favorite(&name)?;
            println!("Removed {name}");
        }
        FavoriteAction::List => print_entries("Favourites", &store.favorites()),
    }
    Ok(())
}

fn print_entries(title: &str, entries: &[RecentSearchEntry]) {
    if entries.is_empty() {
        println!("{title}: none");
        return;
    }
    println!("{title}:");
    for entry in entries {
        println!("  {}", render::entry(entry));
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    cfg.backend.base_url = Text::new("Backend base URL:")
        .with_default(&cfg.backend.base_url)
        .prompt()
        .context("Failed to read backend URL")?;

    cfg.backend.forecast_days = CustomType::<u8>::new("Forecast days (7-16):")
        .with_default(cfg.backend.forecast_days)
        .with_error_message("Please enter a whole number")
        .with_validator(|days: &u8| {
            if (MIN_FORECAST_DAYS..=MAX_FORECAST_DAYS).contains(days) {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid("Must be between 7 and 16".into()))
            }
        })
        .prompt()
        .context("Failed to read forecast days")?;

    cfg.default_location = Text::new("Default location:")
        .with_default(&cfg.default_location)
        .prompt()
        .context("Failed to read default location")?;

    let api_key = Password::new("Google Places API key (empty to skip):")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        cfg.set_places_api_key(api_key.trim().to_string());
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
