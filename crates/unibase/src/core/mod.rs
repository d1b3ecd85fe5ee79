//! # Core Module
//!
//! Shared configuration used by the pool registry, the scene loader and
//! the owning context.

pub mod config;

pub use crate::foundation;

pub use config::{
    BaseConfig,
    CatalogConfig,
    Config,
    ConfigError,
    ConfigFormat,
    PoolEntry,
    PoolSettings,
    SceneGroupEntry,
    SceneLoaderConfig,
};
