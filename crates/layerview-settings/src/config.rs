//! Configuration for the layer viewer
//!
//! Configuration is organized into two sections:
//! - Renderer settings (widths, colors, mesh resolution, memory policy)
//! - View preferences (theme, active render types, material colors)
//!
//! Files are read and written as JSON or TOML depending on the extension.

use crate::error::{SettingsError, SettingsResult};
use layerview_core::{EvictionPolicy, RenderType, Rgba};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR_NAME: &str = "layerview";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Theme selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    Light,
    /// Dark background
    #[default]
    Dark,
}

impl Theme {
    /// Gray used for extrusions when `GRAY_COLORS` is active
    pub fn extrusion_gray(&self) -> Rgba {
        match self {
            Theme::Light => Rgba::DARK_GRAY,
            Theme::Dark => Rgba::LIGHT_GRAY,
        }
    }

    /// Canvas background color
    pub fn background(&self) -> Rgba {
        match self {
            Theme::Light => Rgba::WHITE,
            Theme::Dark => Rgba::rgb(30, 30, 34),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "Light"),
            Self::Dark => write!(f, "Dark"),
        }
    }
}

/// Renderer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Nominal extrusion bead width in mm
    pub extruder_width: f64,
    /// Color of travel moves
    pub travel_color: Rgba,
    /// Color of the highlighted feature in inspector mode
    pub highlight_color: Rgba,
    /// Ring vertex count of extrusion/travel cylinders
    pub cylinder_steps: usize,
    /// Ring vertex count of retraction pointers
    pub pointer_steps: usize,
    /// Cached layer buffer eviction policy
    pub eviction: EvictionPolicy,
    /// Filament diameter assumed when the file does not declare one
    pub default_filament_diameter: f64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            extruder_width: 0.4,
            travel_color: Rgba::TRAVEL,
            highlight_color: Rgba::HIGHLIGHT,
            cylinder_steps: 6,
            pointer_steps: 5,
            eviction: EvictionPolicy::default(),
            default_filament_diameter: 1.75,
        }
    }
}

/// View preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub theme: Theme,
    /// Render types active when the viewer opens
    pub render_types: RenderType,
    /// Material color per extruder; indices past the end wrap around
    pub material_colors: Vec<Rgba>,
    /// Highlight the last drawn feature in the 2D preview
    pub gcode_inspector: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            render_types: RenderType::default(),
            material_colors: vec![Rgba::ORANGE, Rgba::CYAN, Rgba::rgb(230, 60, 160)],
            gcode_inspector: false,
        }
    }
}

impl ViewSettings {
    /// Material color for an extruder index
    pub fn material_color(&self, extruder: usize) -> Rgba {
        if self.material_colors.is_empty() {
            return Rgba::ORANGE;
        }
        self.material_colors[extruder % self.material_colors.len()]
    }
}

/// Complete viewer configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub renderer: RendererSettings,
    pub view: ViewSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config location, e.g. `~/.config/layerview/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let renderer = &self.renderer;

        if !is_positive(renderer.extruder_width) {
            return Err(SettingsError::invalid(
                "renderer.extruder_width",
                "must be > 0",
            ));
        }

        if !is_positive(renderer.default_filament_diameter) {
            return Err(SettingsError::invalid(
                "renderer.default_filament_diameter",
                "must be > 0",
            ));
        }

        if renderer.cylinder_steps < 3 {
            return Err(SettingsError::invalid(
                "renderer.cylinder_steps",
                "must be at least 3",
            ));
        }

        if renderer.pointer_steps < 3 {
            return Err(SettingsError::invalid(
                "renderer.pointer_steps",
                "must be at least 3",
            ));
        }

        if renderer.eviction.ceiling() == Some(0) {
            return Err(SettingsError::invalid(
                "renderer.eviction.ceiling",
                "must be > 0",
            ));
        }

        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let mut config = Config::default();
        config.renderer.cylinder_steps = 2;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));

        let mut config = Config::default();
        config.renderer.extruder_width = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.renderer.eviction = EvictionPolicy::Always { ceiling: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_material_color_wraps() {
        let view = ViewSettings::default();
        assert_eq!(view.material_color(0), Rgba::ORANGE);
        assert_eq!(view.material_color(3), Rgba::ORANGE);

        let empty = ViewSettings {
            material_colors: Vec::new(),
            ..ViewSettings::default()
        };
        assert_eq!(empty.material_color(5), Rgba::ORANGE);
    }

    #[test]
    fn test_theme_gray() {
        assert_eq!(Theme::Dark.extrusion_gray(), Rgba::LIGHT_GRAY);
        assert_eq!(Theme::Light.extrusion_gray(), Rgba::DARK_GRAY);
        assert_ne!(Theme::Dark.background(), Theme::Light.background());
    }
}
