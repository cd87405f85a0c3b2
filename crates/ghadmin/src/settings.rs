//! Persisted session settings and the store boundary.

use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

/// Session state that survives restarts.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub token: Option<String>,
    pub selected_org: Option<String>,
    pub default_org: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("selected_org", &self.selected_org)
            .field("default_org", &self.default_org)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Where settings are loaded from and saved to.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Load settings, treating any failure as "no settings yet".
pub fn load_or_default(store: &dyn ConfigStore) -> Settings {
    store.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load settings, using defaults");
        Settings::default()
    })
}

/// Load, modify and save settings. A failed save is logged and otherwise ignored.
pub fn update(store: &dyn ConfigStore, apply: impl FnOnce(&mut Settings)) {
    let mut settings = load_or_default(store);
    apply(&mut settings);
    if let Err(e) = store.save(&settings) {
        tracing::warn!(error = %e, "Failed to save settings");
    }
}

/// Normalize an empty string to `None`.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Settings held in memory, for embedding hosts without a settings file and for tests.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    settings: Mutex<Settings>,
}

impl MemoryConfigStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings.clone();
        Ok(())
    }
}
