//! Postcode Marker Library
//!
//! Finds Dutch postal codes in a live document tree, wraps each one with a
//! copy-to-clipboard trigger, and keeps doing so as the document changes.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod activation;
pub mod clipboard;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod settings;

pub use config::Config;
pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};
