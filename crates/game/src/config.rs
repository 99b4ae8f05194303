//! Run configuration. Loaded from `sky.ron` at startup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use sky::{ClusterFieldConfig, ParticleFieldConfig};

use crate::flight::FlightConfig;

pub const DEFAULT_CONFIG_FILE: &str = "sky.ron";

/// Everything the headless flight needs. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyConfig {
    /// Frames to simulate before exiting.
    #[serde(default = "default_frames")]
    pub frames: u64,
    /// Fixed simulation rate in Hz.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    /// Seconds between stats lines.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: f32,
    #[serde(default)]
    pub flight: FlightConfig,
    /// Sun position; shading uses its direction from the origin.
    #[serde(default = "default_sun_position")]
    pub sun_position: Vec3,
    /// Switch to sunset colors after this many seconds.
    #[serde(default)]
    pub sunset_at: Option<f32>,
    #[serde(default = "default_sunset_sun")]
    pub sunset_sun_color: u32,
    #[serde(default = "default_sunset_ambient")]
    pub sunset_ambient_color: u32,
    /// Optional glTF/GLB whose primitives replace the procedural puffs.
    #[serde(default)]
    pub detail_model: Option<PathBuf>,
    #[serde(default)]
    pub particles: ParticleFieldConfig,
    #[serde(default)]
    pub clusters: ClusterFieldConfig,
}

fn default_frames() -> u64 {
    3600
}
fn default_tick_rate() -> f64 {
    60.0
}
fn default_stats_interval() -> f32 {
    1.0
}
fn default_sun_position() -> Vec3 {
    Vec3::new(300.0, 400.0, -200.0)
}
fn default_sunset_sun() -> u32 {
    0xff8844
}
fn default_sunset_ambient() -> u32 {
    0x4a3a6a
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            tick_rate: default_tick_rate(),
            stats_interval: default_stats_interval(),
            flight: FlightConfig::default(),
            sun_position: default_sun_position(),
            sunset_at: Some(30.0),
            sunset_sun_color: default_sunset_sun(),
            sunset_ambient_color: default_sunset_ambient(),
            detail_model: None,
            particles: ParticleFieldConfig::default(),
            clusters: ClusterFieldConfig::default(),
        }
    }
}

impl SkyConfig {
    /// Load from `path`. A missing or invalid file yields the defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match Self::parse(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {:#}, using defaults", path, e),
            },
            Err(_) => log::info!("No config at {:?}, using defaults", path),
        }
        Self::default()
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(data)?)
    }

    pub fn to_ron(&self) -> anyhow::Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let s = self.to_ron()?;
        std::fs::write(path, s).with_context(|| format!("could not write config to {}", path.display()))
    }
}

pub fn default_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILE)
}
