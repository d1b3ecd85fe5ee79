//! # Unibase
//!
//! Object pooling and scene-group loading for tick-driven games.
//!
//! ## Features
//!
//! - **Object Pools**: per-kind pools with lazy creation, reuse and unique kinds
//! - **Show/Hide Transitions**: timed per-instance state machines with exactly-once completions
//! - **Scene Groups**: named sets of scenes loaded and activated as one unit
//! - **Smoothed Progress**: monotonic, rate-limited progress for loading screens
//! - **Explicit Context**: one owner for pools and scenes, torn down on every exit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unibase::prelude::*;
//!
//! struct Coin;
//! impl Poolable for Coin {}
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = SimulatedBackend::new()
//!         .with_scene("Scenes/Loading", 0.0)
//!         .with_scene("Scenes/App", 0.5);
//!     let mut context: BaseContext<&'static str, Coin, SimulatedBackend> =
//!         BaseContext::create(BaseConfig::default(), backend)?;
//!
//!     context.register_pool("coin", |_| Coin);
//!     context.start(Some(&SceneGroupId::new("App")))?;
//!     while !context.scenes().is_idle() {
//!         context.update(1.0 / 60.0)?;
//!     }
//!
//!     let coin = context.pools_mut().acquire("coin", true, Transition::INSTANT, Completion::none());
//!     assert!(coin.is_some());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod events;
pub mod pool;
pub mod scene;

mod application;
mod context;

pub use application::{run_fixed, AppContext, AppError, Application};
pub use context::{BaseContext, ContextError, ContextPhase};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        run_fixed, AppContext, AppError, Application,
        BaseContext, ContextError, ContextPhase,
        core::config::{BaseConfig, CatalogConfig, Config, PoolEntry, PoolSettings, SceneLoaderConfig},
        events::{EventHandler, EventSystem, EventType, SceneEvent},
        foundation::{
            collections::{InstanceId, OperationId},
            time::{FixedStep, Timer},
        },
        pool::{BatchCompletion, Completion, InstanceState, PoolKind, PoolRegistry, PoolSpec, Poolable, Transition},
        scene::{
            SceneBackend, SceneGroupCatalog, SceneGroupId, SceneLoadCoordinator, SceneRef, SimulatedBackend,
            TransitionError, TransitionFlags, TransitionId, TransitionOutcome,
        },
    };
}

#[cfg(test)]
mod tests;
