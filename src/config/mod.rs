//! Configuration management for postcode-marker.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - Built-in defaults (lowest priority)

mod settings;

pub use settings::{Config, DEFAULT_DEBOUNCE, DEFAULT_FEEDBACK, DEFAULT_INITIAL_DELAY};
