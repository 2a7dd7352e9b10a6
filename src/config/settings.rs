//! Configuration settings and validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default rescan coalescing window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default delay before the first scan after start.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Default duration of the copy success feedback.
pub const DEFAULT_FEEDBACK: Duration = Duration::from_millis(1500);

/// Upper bound accepted for the debounce window.
const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

/// Main configuration for postcode-marker.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub log_json: bool,

    /// Path of the persisted settings file.
    pub settings_path: PathBuf,

    /// Rescan coalescing window.
    pub debounce: Duration,

    /// Delay before the first scan after the engine starts.
    pub initial_delay: Duration,

    /// How long the copy trigger shows success feedback.
    pub feedback_duration: Duration,

    /// Log clipboard failures at warn level instead of debug.
    pub debug_clipboard: bool,

    /// External command receiving copied text on stdin.
    pub clipboard_command: Option<String>,

    /// Reclaim detached nodes after every background scan pass.
    pub reclaim_detached: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            settings_path: PathBuf::from("./postcode-marker.json"),
            debounce: DEFAULT_DEBOUNCE,
            initial_delay: DEFAULT_INITIAL_DELAY,
            feedback_duration: DEFAULT_FEEDBACK,
            debug_clipboard: false,
            clipboard_command: None,
            reclaim_detached: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.debounce.is_zero() {
            return Err(Error::config("debounce cannot be 0"));
        }

        if self.debounce > MAX_DEBOUNCE {
            return Err(Error::config("debounce cannot exceed 10s"));
        }

        if self.feedback_duration.is_zero() {
            return Err(Error::config("feedback_duration cannot be 0"));
        }

        if self
            .clipboard_command
            .as_deref()
            .is_some_and(|cmd| cmd.trim().is_empty())
        {
            return Err(Error::config("clipboard_command cannot be empty"));
        }

        if self.settings_path.as_os_str().is_empty() {
            return Err(Error::config("settings_path cannot be empty"));
        }

        Ok(())
    }
}
