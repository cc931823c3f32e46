use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::store::KeyValueStore;
use crate::errors::DashboardError;
use crate::models::settings::Settings;
use crate::models::view::ColumnVisibility;

pub const SETTINGS_KEY: &str = "portfolio_settings";
pub const COLUMN_VISIBILITY_KEY: &str = "portfolio_column_visibility";

/// Persists the settings record and the column-visibility map.
///
/// Loading never fails: an absent, unreadable or corrupt record yields the
/// defaults.
pub struct SettingsStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_settings(&self) -> Settings {
        self.load_or_default(SETTINGS_KEY)
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<(), DashboardError> {
        self.save(SETTINGS_KEY, settings)
    }

    pub fn load_columns(&self) -> ColumnVisibility {
        self.load_or_default(COLUMN_VISIBILITY_KEY)
    }

    pub fn save_columns(&mut self, columns: &ColumnVisibility) -> Result<(), DashboardError> {
        self.save(COLUMN_VISIBILITY_KEY, columns)
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "failed to read stored record, using defaults");
                return T::default();
            }
        };
        match serde_json::from_str::<Option<T>>(&raw) {
            Ok(Some(value)) => value,
            // A stored `null` reads as absent.
            Ok(None) => T::default(),
            Err(e) => {
                warn!(key, error = %e, "corrupt stored record, using defaults");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), DashboardError> {
        let json = serde_json::to_string(value)
            .map_err(|e| DashboardError::Serialization(format!("Failed to serialize {key}: {e}")))?;
        self.store.set(key, &json)
    }
}
