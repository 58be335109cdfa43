//! Session handle owning the current location/snapshot and the collaborators
//! that produce them.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    aggregator::Aggregator,
    debounce::{DEFAULT_DEBOUNCE, Debouncer, InputSender},
    error::WeatherError,
    model::{
        FetchRequest, Location, RecentSearchEntry, SearchCandidate, Theme, UnitPreference,
        WeatherSnapshot,
    },
    provider::{Geolocator, PlacesProvider, WeatherBackend},
    resolver::{Resolver, Suggestions},
    store::LocationStore,
};

pub const DEFAULT_LOCATION: &str = "London";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub forecast_days: u8,
    pub request_timeout: Duration,
    pub lookup_timeout: Duration,
    pub geolocation_timeout: Duration,
    pub default_location: String,
    /// Discard completions of superseded resolutions instead of letting the
    /// last one to finish win.
    pub strict_ordering: bool,
    /// Quiet period before typed text triggers a suggestion fetch.
    pub debounce: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            forecast_days: 7,
            request_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(10),
            geolocation_timeout: Duration::from_secs(10),
            default_location: DEFAULT_LOCATION.to_string(),
            strict_ordering: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolutionStatus {
    #[default]
    Idle,
    Resolving,
    Resolved,
    Failed(WeatherError),
}

#[derive(Debug, Default)]
struct SessionState {
    status: ResolutionStatus,
    snapshot: Option<WeatherSnapshot>,
    failed_request: Option<FetchRequest>,
    generation: u64,
}

#[derive(Debug)]
pub struct WeatherSession {
    aggregator: Aggregator,
    resolver: Resolver,
    backend: Arc<dyn WeatherBackend>,
    geolocator: Option<Arc<dyn Geolocator>>,
    store: Arc<LocationStore>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

impl WeatherSession {
    pub fn new(
        backend: Arc<dyn WeatherBackend>,
        store: Arc<LocationStore>,
        settings: SessionSettings,
    ) -> Self {
        let aggregator =
            Aggregator::new(backend.clone(), settings.forecast_days, settings.request_timeout);
        let resolver =
            Resolver::new(backend.clone(), None, store.clone(), settings.lookup_timeout);

        info!(default_location = %settings.default_location, "weather session opened");
        Self {
            aggregator,
            resolver,
            backend,
            geolocator: None,
            store,
            settings,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_places(mut self, places: Arc<dyn PlacesProvider>) -> Self {
        self.resolver = Resolver::new(
            self.backend.clone(),
            Some(places),
            self.store.clone(),
            self.settings.lookup_timeout,
        );
        self
    }

    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = Some(geolocator);
        self
    }

    /// Loads the last known location, or the default one on first run.
    pub async fn start(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.load(self.fallback_request()).await
    }

    pub async fn search(&self, text: &str) -> Result<WeatherSnapshot, WeatherError> {
        let request = self.resolver.resolve_from_query(text);
        self.load(request).await
    }

    pub async fn suggest(&self, text: &str) -> Suggestions {
        self.resolver.suggest(text).await
    }

    /// Keystroke channel using the configured debounce interval. Feed it
    /// with the sender and drain it with [`Self::suggest_settled`].
    pub fn input_channel(&self) -> (InputSender, Debouncer) {
        Debouncer::channel(self.settings.debounce)
    }

    /// Fetches suggestions only for input that stayed unchanged for the
    /// debounce interval. Runs until every sender is dropped.
    pub async fn suggest_settled<F>(&self, debouncer: &mut Debouncer, mut on_settled: F)
    where
        F: FnMut(&str, Suggestions),
    {
        while let Some(text) = debouncer.settled().await {
            let suggestions = self.suggest(&text).await;
            debug!(%text, found = suggestions.len(), "suggestions for settled input");
            on_settled(&text, suggestions);
        }
    }

    /// `Ok(None)` when the candidate could not be resolved (failed place lookup).
    pub async fn select(
        &self,
        candidate: &SearchCandidate,
    ) -> Result<Option<WeatherSnapshot>, WeatherError> {
        match self.resolver.resolve(candidate).await {
            Some(request) => self.load(request).await.map(Some),
            None => Ok(None),
        }
    }

    /// Geolocation failures never surface: the last known (or default)
    /// location is loaded instead.
    pub async fn use_current_position(&self) -> Result<WeatherSnapshot, WeatherError> {
        let position = match &self.geolocator {
            None => Err(WeatherError::PositionUnavailable("no geolocation capability".into())),
            Some(geolocator) => {
                let timeout = self.settings.geolocation_timeout;
                tokio::time::timeout(timeout, geolocator.current_position())
                    .await
                    .unwrap_or_else(|_| {
                        Err(WeatherError::PositionUnavailable(format!(
                            "timed out after {}s",
                            timeout.as_secs()
                        )))
                    })
            }
        };

        let request = match position {
            Ok(coordinates) => self.resolver.resolve_from_geolocation(coordinates).await,
            Err(err) => {
                warn!(error = %err, "geolocation failed; falling back to last known location");
                self.fallback_request()
            }
        };

        self.load(request).await
    }

    /// Re-fetches the current location. `Ok(None)` when nothing is loaded yet.
    pub async fn refresh(&self) -> Result<Option<WeatherSnapshot>, WeatherError> {
        let request = self.location().map(|location| location.fetch_request());
        match request {
            Some(request) => self.load(request).await.map(Some),
            None => Ok(None),
        }
    }

    /// Re-invokes the resolution that last failed. `Ok(None)` when none did.
    pub async fn retry(&self) -> Result<Option<WeatherSnapshot>, WeatherError> {
        let request = self.state.lock().failed_request.clone();
        match request {
            Some(request) => self.load(request).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn status(&self) -> ResolutionStatus {
        self.state.lock().status.clone()
    }

    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.state.lock().snapshot.clone()
    }

    pub fn location(&self) -> Option<Location> {
        self.state.lock().snapshot.as_ref().map(|snapshot| snapshot.location.clone())
    }

    pub fn recent_searches(&self) -> Vec<RecentSearchEntry> {
        self.store.recent_searches()
    }

    pub fn units(&self) -> UnitPreference {
        self.store.unit_preference()
    }

    pub fn set_units(&self, units: UnitPreference) {
        if let Err(err) = self.store.set_unit_preference(units) {
            warn!(error = %err, "failed to persist unit preference");
        }
    }

    pub fn theme(&self) -> Theme {
        self.store.theme_preference()
    }

    pub fn toggle_theme(&self) -> Theme {
        let theme = self.theme().toggled();
        if let Err(err) = self.store.set_theme_preference(theme) {
            warn!(error = %err, "failed to persist theme preference");
        }
        theme
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    pub fn close(self) {
        let location = self.location().map(|location| location.name);
        info!(?location, "weather session closed");
    }

    fn fallback_request(&self) -> FetchRequest {
        match self.store.last_location() {
            Some(location) => location.fetch_request(),
            None => FetchRequest::Query(self.settings.default_location.clone()),
        }
    }

    /// Runs one resolution. The returned value is always this request's own
    /// result; whether it becomes the session's current state depends on the
    /// ordering mode.
    async fn load(&self, request: FetchRequest) -> Result<WeatherSnapshot, WeatherError> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.status = ResolutionStatus::Resolving;
            state.generation
        };
        debug!(%request, generation, "resolving");

        let result = self.aggregator.fetch(&request).await;

        {
            let mut state = self.state.lock();
            if self.settings.strict_ordering && state.generation != generation {
                debug!(%request, generation, latest = state.generation, "discarding superseded result");
                return result;
            }

            match &result {
                Ok(snapshot) => {
                    state.status = ResolutionStatus::Resolved;
                    state.snapshot = Some(snapshot.clone());
                    state.failed_request = None;
                }
                Err(err) => {
                    warn!(%request, error = %err, "resolution failed; keeping previous snapshot");
                    state.status = ResolutionStatus::Failed(err.clone());
                    state.failed_request = Some(request);
                }
            }
        }

        if let Ok(snapshot) = &result {
            if let Err(err) = self.store.set_last_location(&snapshot.location) {
                warn!(error = %err, "failed to persist last location");
            }
        }

        result
    }
}
