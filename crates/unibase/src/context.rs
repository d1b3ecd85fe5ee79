//! Owning context
//!
//! `BaseContext` owns the pool registry, the scene coordinator and the
//! configuration they were built from. Components that need cross-scene
//! lookups receive the context explicitly instead of reading a global.
//!
//! Lifecycle: `create` → `start` → `update` every frame → `teardown`.
//! Teardown also runs on drop, so pooled objects are destroyed on every
//! exit path.

use thiserror::Error;

use crate::core::config::{BaseConfig, Config, ConfigError};
use crate::foundation::time::Timer;
use crate::pool::{PoolKind, PoolRegistry, PoolSpec, Poolable};
use crate::scene::{
    CatalogError, SceneBackend, SceneGroupCatalog, SceneGroupId, SceneLoadCoordinator, TransitionError,
    TransitionFlags, TransitionId,
};

/// Context-level errors
#[derive(Error, Debug)]
pub enum ContextError {
    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene catalog could not be built
    #[error("Scene catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A transition request failed or the engine ran out of resources
    #[error("Scene transition error: {0}")]
    Transition(#[from] TransitionError),

    /// The operation needs a started, not yet torn down context
    #[error("Context is not running (phase {0:?})")]
    NotRunning(ContextPhase),
}

/// Lifecycle phase of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPhase {
    /// Created, pools may be registered
    Created,
    /// Started and ticking
    Running,
    /// Torn down; nothing is usable anymore
    TornDown,
}

/// Explicit owner of pools and scene loading
pub struct BaseContext<K: PoolKind, T: Poolable, B: SceneBackend> {
    config: BaseConfig,
    pools: PoolRegistry<K, T>,
    scenes: SceneLoadCoordinator<B>,
    timer: Timer,
    phase: ContextPhase,
    exit_requested: bool,
}

impl<K: PoolKind, T: Poolable, B: SceneBackend> BaseContext<K, T, B> {
    /// Validate configuration and build every owned subsystem
    pub fn create(config: BaseConfig, backend: B) -> Result<Self, ContextError> {
        config.validate()?;
        let catalog = SceneGroupCatalog::build(&config.catalog)?;
        let scenes = SceneLoadCoordinator::new(backend, catalog, &config.loader);

        log::info!("Context created");
        Ok(Self {
            config,
            pools: PoolRegistry::new(),
            scenes,
            timer: Timer::new(),
            phase: ContextPhase::Created,
            exit_requested: false,
        })
    }

    /// Register a pool kind with the settings configured for its name
    pub fn register_pool<F>(&mut self, kind: K, factory: F)
    where
        F: FnMut(&K) -> T + 'static,
    {
        let spec = PoolSpec::from_settings(&self.config.pools, &kind.config_name());
        self.pools.register(kind, spec, factory);
    }

    /// Prewarm every registered pool and optionally load a first group
    pub fn start(&mut self, initial_group: Option<&SceneGroupId>) -> Result<Option<TransitionId>, ContextError> {
        if self.phase != ContextPhase::Created {
            return Err(ContextError::NotRunning(self.phase));
        }

        let kinds: Vec<K> = self.pools.registered_kinds().cloned().collect();
        for kind in &kinds {
            self.pools.prewarm(kind);
        }
        self.phase = ContextPhase::Running;
        log::info!("Context started with {} pool kinds", kinds.len());

        initial_group
            .map(|group| self.scenes.request_transition(group, TransitionFlags::empty()))
            .transpose()
            .map_err(ContextError::from)
    }

    /// Tick pools and scene loading by one frame
    ///
    /// Only fatal engine errors are returned; ordinary transition failures
    /// are reported through scene events.
    pub fn update(&mut self, delta_time: f32) -> Result<(), ContextError> {
        if self.phase != ContextPhase::Running {
            return Err(ContextError::NotRunning(self.phase));
        }
        self.timer.advance(delta_time);
        self.pools.update(delta_time);
        self.scenes.update(delta_time)?;
        Ok(())
    }

    /// Request a scene-group transition
    pub fn transition_to(
        &mut self,
        group: &SceneGroupId,
        flags: TransitionFlags,
    ) -> Result<TransitionId, ContextError> {
        if self.phase != ContextPhase::Running {
            return Err(ContextError::NotRunning(self.phase));
        }
        Ok(self.scenes.request_transition(group, flags)?)
    }

    /// Destroy every pool and stop any transition
    ///
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.phase == ContextPhase::TornDown {
            return;
        }
        if self.scenes.cancel() {
            // One tick runs the coordinator's cleanup path
            if let Err(err) = self.scenes.update(0.0) {
                log::error!("Scene cleanup during teardown failed: {}", err);
            }
        }
        self.pools.teardown();
        self.phase = ContextPhase::TornDown;
        log::info!("Context torn down after {} frames", self.timer.frame_count());
    }

    /// Ask the owning loop to stop after this frame
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Whether `request_exit` was called
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ContextPhase {
        self.phase
    }

    /// Configuration the context was created from
    pub fn config(&self) -> &BaseConfig {
        &self.config
    }

    /// Frame timer
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Pool registry
    pub fn pools(&self) -> &PoolRegistry<K, T> {
        &self.pools
    }

    /// Pool registry, mutable
    pub fn pools_mut(&mut self) -> &mut PoolRegistry<K, T> {
        &mut self.pools
    }

    /// Scene coordinator
    pub fn scenes(&self) -> &SceneLoadCoordinator<B> {
        &self.scenes
    }

    /// Scene coordinator, mutable
    pub fn scenes_mut(&mut self) -> &mut SceneLoadCoordinator<B> {
        &mut self.scenes
    }
}

impl<K: PoolKind, T: Poolable, B: SceneBackend> Drop for BaseContext<K, T, B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PoolEntry;
    use crate::pool::{Completion, Transition};
    use crate::scene::SimulatedBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Token(Rc<Cell<u32>>);

    impl Poolable for Token {
        fn on_destroy(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn backend() -> SimulatedBackend {
        SimulatedBackend::new()
            .with_scene("Scenes/Loading", 0.0)
            .with_scene("Scenes/App", 0.05)
            .with_scene("Scenes/MainMenu", 0.05)
    }

    fn config() -> BaseConfig {
        let mut config = BaseConfig::default();
        config.loader.progress_multiplier = 10.0;
        config.pools.pools.push(PoolEntry { name: "coin".to_string(), unique: false, prewarm: 4 });
        config
    }

    #[test]
    fn test_start_prewarms_and_loads_initial_group() {
        let destroyed = Rc::new(Cell::new(0));
        let shared = Rc::clone(&destroyed);
        let mut context: BaseContext<&'static str, Token, SimulatedBackend> =
            BaseContext::create(config(), backend()).unwrap();
        context.register_pool("coin", move |_| Token(Rc::clone(&shared)));

        assert!(context.start(Some(&"App".into())).unwrap().is_some());
        assert_eq!(context.pools().idle_count(&"coin"), 4);

        while !context.scenes().is_idle() {
            context.update(0.02).unwrap();
        }
        assert_eq!(context.scenes().current_group(), Some(&"App".into()));

        context.teardown();
        assert_eq!(destroyed.get(), 4);
        assert_eq!(context.phase(), ContextPhase::TornDown);
        assert!(matches!(context.update(0.02), Err(ContextError::NotRunning(ContextPhase::TornDown))));
    }

    #[test]
    fn test_drop_tears_down_pools() {
        let destroyed = Rc::new(Cell::new(0));
        {
            let shared = Rc::clone(&destroyed);
            let mut context: BaseContext<&'static str, Token, SimulatedBackend> =
                BaseContext::create(config(), backend()).unwrap();
            context.register_pool("gem", move |_| Token(Rc::clone(&shared)));
            context.start(None).unwrap();
            context.pools_mut().acquire("gem", true, Transition::new(1.0, 0.0), Completion::none());
        }
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let mut config = config();
        config.catalog.transition_scene.clear();
        let result: Result<BaseContext<&'static str, Token, SimulatedBackend>, _> =
            BaseContext::create(config, backend());
        assert!(matches!(result, Err(ContextError::Catalog(CatalogError::EmptyTransitionScene))));
    }

    #[test]
    fn test_transition_requires_running_context() {
        let mut context: BaseContext<&'static str, Token, SimulatedBackend> =
            BaseContext::create(config(), backend()).unwrap();
        assert!(matches!(
            context.transition_to(&"App".into(), TransitionFlags::empty()),
            Err(ContextError::NotRunning(ContextPhase::Created))
        ));
    }
}
