//! Settings provider.
//!
//! Holds the two user toggles, persists them, and pushes updates to the
//! engine through a single-slot watch channel.

mod handle;
mod model;
mod store;

pub use handle::{SettingsHandle, SettingsMessage, SettingsResponse};
pub use model::{Settings, ThroughputProfile};
pub use store::{
    initialize_defaults, load_or_default, FileSettingsStore, MemorySettingsStore, SettingsStore,
};
