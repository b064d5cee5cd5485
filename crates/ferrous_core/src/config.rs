//! Engine configuration documents.
//!
//! Settings are plain TOML.  Every field has a default so a partial file (or
//! an empty one) is valid:
//!
//! ```toml
//! [logging]
//! level = "ferrous_renderer=debug,info"
//!
//! [render]
//! layer_size = 512
//! clear_color = [0.15, 0.15, 0.15, 1.0]
//!
//! [render.culling]
//! kind = "front"
//! radius = 40.0
//! ```

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LoggingConfig;

/// Highest texture unit index the settings accept for the shadow map.
const MAX_TEXTURE_UNIT: u32 = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Minimum device API version, e.g. 3.2 for framebuffer-texture support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which culling strategy a camera gets by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CullKind {
    /// Every candidate is submitted.
    #[default]
    None,
    /// Keep a circular region projected ahead of the camera.
    Front,
    /// Keep everything within a radius around the camera.
    Radius,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullSettings {
    pub kind: CullKind,
    pub radius: f64,
}

impl Default for CullSettings {
    fn default() -> Self {
        Self {
            kind: CullKind::None,
            radius: 100.0,
        }
    }
}

/// Renderer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Square resolution of off-screen targets and shadow maps.
    pub layer_size: u32,
    /// Texture unit reserved for the shadow map sampler.
    pub shadow_map_unit: u32,
    /// Oldest device version the binder accepts.
    pub min_version: ApiVersion,
    /// Background color used by `clear`.
    pub clear_color: [f32; 4],
    pub culling: CullSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            layer_size: 1024,
            shadow_map_unit: 15,
            min_version: ApiVersion::new(3, 2),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            culling: CullSettings::default(),
        }
    }
}

impl RenderSettings {
    /// Parses a `[render]`-less document, i.e. the render table itself.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the binder cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "layer_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.shadow_map_unit > MAX_TEXTURE_UNIT {
            return Err(ConfigError::Invalid {
                field: "shadow_map_unit",
                reason: format!("{} exceeds the last unit {MAX_TEXTURE_UNIT}", self.shadow_map_unit),
            });
        }
        if !self.culling.radius.is_finite() {
            return Err(ConfigError::Invalid {
                field: "culling.radius",
                reason: "must be a finite number".into(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub render: RenderSettings,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.render.validate()?;
        Ok(config)
    }
}

/// Reads and validates an [`EngineConfig`] from disk.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<EngineConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EngineConfig::from_toml_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}
