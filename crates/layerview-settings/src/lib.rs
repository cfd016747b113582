//! LayerView Settings Crate
//!
//! Handles viewer configuration: renderer tuning, view preferences,
//! persistence as JSON or TOML, and validation.

pub mod config;
pub mod error;

pub use config::{Config, RendererSettings, Theme, ViewSettings};
pub use error::{SettingsError, SettingsResult};
