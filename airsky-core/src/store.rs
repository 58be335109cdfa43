//! Recent-location store: recent searches, last location, favourites and the
//! two display preferences, over a simple persistent key-value backend.
//!
//! Reads never fail. A missing, unreadable or malformed value degrades to
//! that key's default and is logged.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    model::{Location, RecentSearchEntry, Theme, UnitPreference},
};

pub const MAX_RECENT_SEARCHES: usize = 5;

const RECENT_SEARCHES_KEY: &str = "weather_recent_searches";
const FAVORITES_KEY: &str = "weather_favorites";
const LAST_LOCATION_KEY: &str = "weather_last_location";
const THEME_KEY: &str = "weather_theme";
const UNITS_KEY: &str = "weather_units";

/// Process-local string key-value storage.
pub trait KeyValueStore: Send + Sync + Debug {
    /// `None` when the key is absent or the storage cannot be read.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// All keys in one JSON object on disk. Last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Store file in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "airsky", "airsky")
            .ok_or_else(|| anyhow!("Could not determine platform data directory"))?;

        Ok(dirs.data_dir().join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> BTreeMap<String, String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "store file unreadable; using defaults");
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "store file corrupted; using defaults");
            BTreeMap::new()
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());

        let io_err = |source| StoreError::Io { path: self.path.display().to_string(), source };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&map)
            .map_err(|source| StoreError::Serialize { key: key.to_string(), source })?;

        fs::write(&self.path, json).map_err(io_err)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct LocationStore {
    backend: Box<dyn KeyValueStore>,
}

impl LocationStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Moves (or inserts) the entry to the front, deduplicated by exact name,
    /// keeping at most [`MAX_RECENT_SEARCHES`].
    pub fn record_search(&self, entry: RecentSearchEntry) -> Result<(), StoreError> {
        let mut searches = self.recent_searches();
        searches.retain(|existing| existing.name != entry.name);
        searches.insert(0, entry);
        searches.truncate(MAX_RECENT_SEARCHES);

        self.write_json(RECENT_SEARCHES_KEY, &searches)
    }

    /// Most recent first.
    pub fn recent_searches(&self) -> Vec<RecentSearchEntry> {
        let mut searches: Vec<RecentSearchEntry> =
            self.read_json(RECENT_SEARCHES_KEY).unwrap_or_default();
        searches.truncate(MAX_RECENT_SEARCHES);
        searches
    }

    pub fn set_last_location(&self, location: &Location) -> Result<(), StoreError> {
        self.write_json(LAST_LOCATION_KEY, location)
    }

    pub fn last_location(&self) -> Option<Location> {
        self.read_json::<Option<Location>>(LAST_LOCATION_KEY).flatten()
    }

    /// Appends unless an entry with the same name is already present.
    pub fn add_favorite(&self, entry: RecentSearchEntry) -> Result<(), StoreError> {
        let mut favorites = self.favorites();
        if favorites.iter().any(|existing| existing.name == entry.name) {
            return Ok(());
        }
        favorites.push(entry);

        self.write_json(FAVORITES_KEY, &favorites)
    }

    pub fn remove_favorite(&self, name: &str) -> Result<(), StoreError> {
        let mut favorites = self.favorites();
        favorites.retain(|existing| existing.name != name);

        self.write_json(FAVORITES_KEY, &favorites)
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites().iter().any(|existing| existing.name == name)
    }

    pub fn favorites(&self) -> Vec<RecentSearchEntry> {
        self.read_json(FAVORITES_KEY).unwrap_or_default()
    }

    pub fn unit_preference(&self) -> UnitPreference {
        self.read_scalar(UNITS_KEY)
    }

    pub fn set_unit_preference(&self, units: UnitPreference) -> Result<(), StoreError> {
        self.backend.set(UNITS_KEY, units.as_str())
    }

    pub fn theme_preference(&self) -> Theme {
        self.read_scalar(THEME_KEY)
    }

    pub fn set_theme_preference(&self, theme: Theme) -> Result<(), StoreError> {
        self.backend.set(THEME_KEY, theme.as_str())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.backend.get(key)?;
        if raw == "undefined" {
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "corrupted stored value; using default");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)
            .map_err(|source| StoreError::Serialize { key: key.to_string(), source })?;
        debug!(key, "writing stored value");
        self.backend.set(key, &json)
    }

    fn read_scalar<T>(&self, key: &str) -> T
    where
        T: std::str::FromStr + Default,
    {
        match self.backend.get(key) {
            None => T::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, "unrecognised stored preference; using default");
                T::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AqiProvenance, Coordinates};

    fn entry(name: &str) -> RecentSearchEntry {
        RecentSearchEntry::new(name, "", "")
    }

    #[test]
    fn recent_searches_are_bounded_most_recent_first() {
        let store = LocationStore::in_memory();
        for name in ["Oslo", "Rome", "Lima", "Kyiv", "Doha", "Baku"] {
            store.record_search(entry(name)).unwrap();
        }

        let names: Vec<_> = store.recent_searches().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Baku", "Doha", "Kyiv", "Lima", "Rome"]);
    }

    #[test]
    fn recording_same_name_replaces_and_moves_to_front() {
        let store = LocationStore::in_memory();
        store.record_search(RecentSearchEntry::new("Paris", "Ile-de-France", "France")).unwrap();
        store.record_search(entry("Berlin")).unwrap();
        store.record_search(RecentSearchEntry::new("Paris", "Texas", "USA")).unwrap();

        let searches = store.recent_searches();
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[0], RecentSearchEntry::new("Paris", "Texas", "USA"));
        assert_eq!(searches[1].name, "Berlin");
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let store = LocationStore::in_memory();
        store.record_search(entry("paris")).unwrap();
        store.record_search(entry("Paris")).unwrap();

        assert_eq!(store.recent_searches().len(), 2);
    }

    #[test]
    fn corrupted_values_degrade_to_defaults() {
        let backend = MemoryStore::new();
        backend.set(RECENT_SEARCHES_KEY, "{not json").unwrap();
        backend.set(LAST_LOCATION_KEY, "undefined").unwrap();
        backend.set(UNITS_KEY, "kelvin").unwrap();
        backend.set(THEME_KEY, "").unwrap();
        let store = LocationStore::new(Box::new(backend));

        assert!(store.recent_searches().is_empty());
        assert!(store.last_location().is_none());
        assert_eq!(store.unit_preference(), UnitPreference::Metric);
        assert_eq!(store.theme_preference(), Theme::Light);
    }

    #[test]
    fn oversized_stored_list_is_capped_on_read() {
        let names: Vec<_> = (0..8).map(|i| entry(&format!("City {i}"))).collect();
        let backend = MemoryStore::new();
        backend.set(RECENT_SEARCHES_KEY, &serde_json::to_string(&names).unwrap()).unwrap();
        let store = LocationStore::new(Box::new(backend));

        let recent = store.recent_searches();

        assert_eq!(recent.len(), MAX_RECENT_SEARCHES);
        assert_eq!(recent[0].name, "City 0");
    }

    #[test]
    fn null_last_location_is_absent() {
        let backend = MemoryStore::new();
        backend.set(LAST_LOCATION_KEY, "null").unwrap();
        let store = LocationStore::new(Box::new(backend));

        assert!(store.last_location().is_none());
    }

    #[test]
    fn last_location_overwrites_single_slot() {
        let store = LocationStore::in_memory();
        store.set_last_location(&Location::named("Oslo")).unwrap();

        let station = Location {
            coordinates: Some(Coordinates::new(59.9, 10.7)),
            monitoring_station_id: Some(42),
            aqi_provenance: AqiProvenance::StationProvider,
            ..Location::named("Oslo Kirkeveien")
        };
        store.set_last_location(&station).unwrap();

        assert_eq!(store.last_location(), Some(station));
    }

    #[test]
    fn preferences_default_and_persist() {
        let store = LocationStore::in_memory();
        assert_eq!(store.unit_preference(), UnitPreference::Metric);
        assert_eq!(store.theme_preference(), Theme::Light);

        store.set_unit_preference(UnitPreference::Imperial).unwrap();
        store.set_theme_preference(Theme::Dark).unwrap();

        assert_eq!(store.unit_preference(), UnitPreference::Imperial);
        assert_eq!(store.theme_preference(), Theme::Dark);
    }

    #[test]
    fn favorites_are_unique_by_name() {
        let store = LocationStore::in_memory();
        store.add_favorite(entry("Oslo")).unwrap();
        store.add_favorite(entry("Rome")).unwrap();
        store.add_favorite(RecentSearchEntry::new("Oslo", "Viken", "Norway")).unwrap();

        let favorites = store.favorites();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0], entry("Oslo"));
        assert!(store.is_favorite("Rome"));

        store.remove_favorite("Oslo").unwrap();
        assert!(!store.is_favorite("Oslo"));
        assert_eq!(store.favorites().len(), 1);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = LocationStore::new(Box::new(FileStore::new(&path)));
        store.record_search(entry("Oslo")).unwrap();
        store.set_unit_preference(UnitPreference::Imperial).unwrap();

        let reopened = LocationStore::new(Box::new(FileStore::new(&path)));
        assert_eq!(reopened.recent_searches(), vec![entry("Oslo")]);
        assert_eq!(reopened.unit_preference(), UnitPreference::Imperial);
    }

    #[test]
    fn corrupted_file_reads_as_empty_and_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "\u{0}garbage").unwrap();

        let store = LocationStore::new(Box::new(FileStore::new(&path)));
        assert!(store.recent_searches().is_empty());
        assert!(store.last_location().is_none());

        store.record_search(entry("Oslo")).unwrap();
        assert_eq!(store.recent_searches(), vec![entry("Oslo")]);
    }
}
