//! Persistent settings storage.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::Settings;
use crate::error::SettingsError;
use crate::Result;

/// Backing store for [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Load stored settings; `Ok(None)` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or decoded.
    fn load(&self) -> Result<Option<Settings>>;

    /// Persist settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Load settings, falling back to defaults when the store is empty or broken.
pub fn load_or_default(store: &dyn SettingsStore) -> Settings {
    match store.load() {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            tracing::debug!("No stored settings, using defaults");
            Settings::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Settings store unavailable, using defaults");
            Settings::default()
        }
    }
}

/// Store the defaults when nothing has been stored yet.
///
/// Returns the settings now in effect. A store that cannot be read or
/// decoded is left untouched.
///
/// # Errors
///
/// Returns an error if the store cannot be read or decoded, or if the
/// defaults cannot be written.
pub fn initialize_defaults(store: &dyn SettingsStore) -> Result<Settings> {
    if let Some(existing) = store.load()? {
        return Ok(existing);
    }
    let defaults = Settings::default();
    store.save(&defaults)?;
    tracing::info!(?defaults, "Initialized default settings");
    Ok(defaults)
}

/// On-disk envelope: `{"settings": {...}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<Settings>,
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Create a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SettingsError::Unavailable(format!(
                    "cannot read '{}': {e}",
                    self.path.display()
                ))
                .into())
            }
        };
        let stored: StoredSettings = serde_json::from_str(&raw).map_err(SettingsError::from)?;
        Ok(stored.settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let path = self.path.display().to_string();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::persist(&path, e))?;
        }
        let stored = StoredSettings {
            settings: Some(*settings),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(SettingsError::from)?;
        std::fs::write(&self.path, json).map_err(|e| SettingsError::persist(&path, e))?;
        tracing::debug!(path = %path, ?settings, "Settings saved");
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Option<Settings>>,
}

impl MemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `settings`.
    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<Settings>> {
        Ok(*self.settings.lock())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock() = Some(*settings);
        Ok(())
    }
}
