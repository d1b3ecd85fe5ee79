//! # Unified Configuration System
//!
//! All configuration structures consumed by the pooling and scene-loading
//! core live here. They are read-only once the owning context is created.
//!
//! ## Configuration Categories
//!
//! - **Loader Config**: progress smoothing cadence and rescaling
//! - **Pool Settings**: per-kind uniqueness and initial capacities
//! - **Catalog Config**: scene-group identifier → ordered scene paths
//! - **Base Config**: everything above plus logging, as one file

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};
use crate::scene::catalog::SceneGroupId;

/// # Scene Loader Configuration
///
/// Controls how raw engine load progress is turned into the smoothed ratio
/// shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLoaderConfig {
    /// Maximum progress gained per second of smoothing
    pub progress_multiplier: f32,
    /// Raw progress value treated as "fully loaded"
    ///
    /// Engines that hold scenes back from activation usually report at most
    /// 0.9 until activation happens.
    pub progress_rescale: f32,
    /// Seconds between two progress ticks
    pub progress_tick_interval: f32,
    /// Distance below which current and target progress count as equal
    pub progress_epsilon: f32,
}

impl SceneLoaderConfig {
    /// Set the smoothing rate
    pub fn with_progress_multiplier(mut self, multiplier: f32) -> Self {
        self.progress_multiplier = multiplier;
        self
    }

    /// Set the raw progress ceiling
    pub fn with_progress_rescale(mut self, rescale: f32) -> Self {
        self.progress_rescale = rescale;
        self
    }

    /// Set the tick cadence
    pub fn with_tick_interval(mut self, interval: f32) -> Self {
        self.progress_tick_interval = interval;
        self
    }
}

impl Default for SceneLoaderConfig {
    fn default() -> Self {
        Self {
            progress_multiplier: 1.0,
            progress_rescale: 0.9,
            progress_tick_interval: 0.02,
            progress_epsilon: 1e-4,
        }
    }
}

impl Config for SceneLoaderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_multiplier.is_nan() || self.progress_multiplier <= 0.0 {
            return Err(ConfigError::Invalid("progress_multiplier must be positive".to_string()));
        }
        if self.progress_rescale.is_nan() || self.progress_rescale <= 0.0 || self.progress_rescale > 1.0 {
            return Err(ConfigError::Invalid("progress_rescale must be in (0, 1]".to_string()));
        }
        if self.progress_tick_interval < 0.0 || self.progress_epsilon < 0.0 {
            return Err(ConfigError::Invalid(
                "progress_tick_interval and progress_epsilon must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pool configuration for one named kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// Kind name, matched against `PoolKind::config_name`
    pub name: String,
    /// At most one instance ever exists for this kind
    #[serde(default)]
    pub unique: bool,
    /// Instances created up front when the pool is prewarmed
    #[serde(default)]
    pub prewarm: usize,
}

/// # Pool Settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Prewarm count for kinds without an explicit entry
    pub default_prewarm: usize,
    /// Per-kind overrides
    pub pools: Vec<PoolEntry>,
}

impl PoolSettings {
    /// Look up the entry for a kind name
    pub fn entry(&self, name: &str) -> Option<&PoolEntry> {
        self.pools.iter().find(|entry| entry.name == name)
    }
}

impl Config for PoolSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.pools.iter().enumerate() {
            if self.pools[..index].iter().any(|other| other.name == entry.name) {
                return Err(ConfigError::Invalid(format!("duplicate pool entry '{}'", entry.name)));
            }
            if entry.unique && entry.prewarm > 1 {
                return Err(ConfigError::Invalid(format!(
                    "unique pool '{}' cannot prewarm {} instances",
                    entry.name, entry.prewarm
                )));
            }
        }
        Ok(())
    }
}

/// One scene group as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneGroupEntry {
    /// Group identifier
    pub id: SceneGroupId,
    /// Scene paths in load order
    pub scenes: Vec<String>,
}

/// # Scene Catalog Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Scene shown while a group loads
    pub transition_scene: String,
    /// All scene groups
    pub groups: Vec<SceneGroupEntry>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let group = |id: &str, scenes: &[&str]| SceneGroupEntry {
            id: SceneGroupId::new(id),
            scenes: scenes.iter().map(|scene| (*scene).to_string()).collect(),
        };
        Self {
            transition_scene: "Scenes/Loading".to_string(),
            groups: vec![
                group("App", &["Scenes/App"]),
                group("MainMenu", &["Scenes/MainMenu"]),
                group("Gameplay", &["Scenes/Gameplay", "Scenes/GameplayHud"]),
            ],
        }
    }
}

impl Config for CatalogConfig {}

/// # Base Configuration
///
/// Everything a `BaseContext` needs, loadable from a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Log filter used by the demo and embedding hosts
    pub log_level: String,
    /// Progress smoothing
    pub loader: SceneLoaderConfig,
    /// Pool capacities
    pub pools: PoolSettings,
    /// Scene groups
    pub catalog: CatalogConfig,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            loader: SceneLoaderConfig::default(),
            pools: PoolSettings::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Config for BaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()?;
        self.pools.validate()?;
        self.catalog.validate()
    }
}
