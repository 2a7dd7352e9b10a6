//! Live settings slot and the message protocol that updates it.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Settings;

/// Request understood by [`SettingsHandle::handle_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SettingsMessage {
    /// Ask for the settings currently in effect.
    GetCurrentSettings,
    /// Replace the settings in effect.
    UpdateSettings { settings: Settings },
}

/// Reply to a [`SettingsMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsResponse {
    Settings(Settings),
    Status { status: String },
}

/// Single-slot holder of the process-wide settings.
///
/// Updates overwrite the slot; readers take a snapshot at the start of each
/// pass and never see a partially applied change.
#[derive(Debug)]
pub struct SettingsHandle {
    tx: watch::Sender<Settings>,
}

impl SettingsHandle {
    /// Create a handle holding `initial`.
    #[must_use]
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Settings currently in effect.
    #[must_use]
    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Receiver that observes every update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Overwrite the settings.
    pub fn update(&self, settings: Settings) {
        let previous = self.tx.send_replace(settings);
        if previous != settings {
            tracing::info!(
                whole_site_enabled = settings.whole_site_enabled,
                performance_mode = settings.performance_mode,
                "Settings updated"
            );
        }
    }

    /// Answer a protocol message.
    pub fn handle_message(&self, message: SettingsMessage) -> SettingsResponse {
        match message {
            SettingsMessage::GetCurrentSettings => SettingsResponse::Settings(self.current()),
            SettingsMessage::UpdateSettings { settings } => {
                self.update(settings);
                SettingsResponse::Status {
                    status: "ok".to_string(),
                }
            }
        }
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
