//! Scene Load Coordinator
//!
//! Drives one scene-group transition at a time through
//!
//! ```text
//! Idle → Unloading → (LoadingTransitionScene) → LoadingTargetScenes
//!      → AwaitingProgressCatchUp → Activating → (UnloadingTransitionScene) → Idle
//! ```
//!
//! The coordinator is ticked once per frame with [`SceneLoadCoordinator::update`].
//! Every wait (engine load, unload, activation, progress catch-up) is a
//! state that polls on the next tick. Target scenes load strictly one
//! after the other. Every exit, including errors and cancellation, goes
//! through a single cleanup path that leaves the coordinator `Idle`.

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::core::config::SceneLoaderConfig;
use crate::events::{EventSystem, SceneEvent};
use crate::foundation::collections::OperationId;
use crate::foundation::time::FixedStep;
use crate::scene::backend::{BackendError, SceneBackend};
use crate::scene::catalog::{SceneGroupCatalog, SceneGroupId, SceneRef};
use crate::scene::handle_group::LoadHandleGroup;
use crate::scene::progress::LoadProgressAggregator;

bitflags! {
    /// Options for one transition request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransitionFlags: u8 {
        /// Show the transition scene while the group loads
        const USE_LOADING_SCENE = 1 << 0;
        /// Skip `release_unused` after unloading the previous group
        const KEEP_UNUSED_RESOURCES = 1 << 1;
    }
}

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// No transition in flight
    Idle,
    /// Unloading the previous group
    Unloading,
    /// Loading the loading-indicator scene
    LoadingTransitionScene,
    /// Loading target scenes one by one
    LoadingTargetScenes,
    /// Letting the smoothed progress reach the real progress
    AwaitingProgressCatchUp,
    /// Activating all target scenes as one batch
    Activating,
    /// Removing the loading-indicator scene
    UnloadingTransitionScene,
}

impl LoadState {
    /// Whether a cancel can still stop the transition
    ///
    /// Once activation has been issued the target scenes become visible, so
    /// the transition runs to completion.
    pub fn is_cancellable(self) -> bool {
        !matches!(self, Self::Idle | Self::Activating | Self::UnloadingTransitionScene)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifier of one accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(u64);

impl TransitionId {
    /// Wrap a raw id
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Transition errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    /// A transition is already in flight; nothing changed
    #[error("Scene transition already in progress (state {0})")]
    Busy(LoadState),

    /// The group is not in the catalog
    #[error("Unknown scene group: {0}")]
    UnknownGroup(SceneGroupId),

    /// The backend refused a call
    #[error("Scene backend failure: {0}")]
    Backend(#[from] BackendError),

    /// A load being awaited was dropped by the engine
    #[error("Load of scene '{0}' became invalid")]
    InvalidOperation(SceneRef),

    /// The activation batch was dropped by the engine
    #[error("Scene activation failed")]
    ActivationFailed,

    /// The transition was cancelled by the caller
    #[error("Scene transition cancelled")]
    Cancelled,
}

impl TransitionError {
    /// Whether the error must also be surfaced from `update`
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_fatal())
    }
}

/// How the last transition ended
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// All target scenes are active
    Completed {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
    },
    /// The transition stopped on an error
    Failed {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
        /// The error
        error: TransitionError,
    },
    /// The caller cancelled the transition
    Cancelled {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
    },
}

impl TransitionOutcome {
    /// Whether the target scenes ended up active
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Advanced,
    Waiting,
}

/// Per-transition bookkeeping; exists only while not `Idle`
#[derive(Debug)]
struct ActiveTransition {
    id: TransitionId,
    group: SceneGroupId,
    flags: TransitionFlags,
    scenes: Vec<SceneRef>,
    next_scene: usize,
    awaiting: Option<(SceneRef, OperationId)>,
    unloads: Option<Vec<OperationId>>,
    transition_scene: Option<OperationId>,
    transition_unload: Option<OperationId>,
    activation: Option<OperationId>,
    cancel_requested: bool,
}

impl ActiveTransition {
    fn new(id: TransitionId, group: SceneGroupId, flags: TransitionFlags, scenes: Vec<SceneRef>) -> Self {
        Self {
            id,
            group,
            flags,
            scenes,
            next_scene: 0,
            awaiting: None,
            unloads: None,
            transition_scene: None,
            transition_unload: None,
            activation: None,
            cancel_requested: false,
        }
    }
}

/// Scene-group transition state machine
pub struct SceneLoadCoordinator<B: SceneBackend> {
    backend: B,
    catalog: SceneGroupCatalog,
    events: EventSystem,
    state: LoadState,
    loaded: LoadHandleGroup,
    active: Option<ActiveTransition>,
    aggregator: LoadProgressAggregator,
    ticker: FixedStep,
    next_id: u64,
    current_group: Option<SceneGroupId>,
    last_outcome: Option<TransitionOutcome>,
}

impl<B: SceneBackend> SceneLoadCoordinator<B> {
    /// Create an idle coordinator
    pub fn new(backend: B, catalog: SceneGroupCatalog, config: &SceneLoaderConfig) -> Self {
        Self {
            backend,
            catalog,
            events: EventSystem::new(),
            state: LoadState::Idle,
            loaded: LoadHandleGroup::new(),
            active: None,
            aggregator: LoadProgressAggregator::new(config),
            ticker: FixedStep::new(config.progress_tick_interval),
            next_id: 1,
            current_group: None,
            last_outcome: None,
        }
    }

    //--- Requests ---------------------------------------------------------

    /// Start a transition to `group`
    ///
    /// Rejected without any state change when a transition is already in
    /// flight or the group is not in the catalog.
    pub fn request_transition(
        &mut self,
        group: &SceneGroupId,
        flags: TransitionFlags,
    ) -> Result<TransitionId, TransitionError> {
        if self.state != LoadState::Idle {
            log::warn!("Rejected transition to '{}': {} in progress", group, self.state);
            return Err(TransitionError::Busy(self.state));
        }

        let scenes = self
            .catalog
            .resolve(group)
            .ok_or_else(|| {
                log::error!("Scene group '{}' is not in the catalog", group);
                TransitionError::UnknownGroup(group.clone())
            })?
            .to_vec();

        let id = TransitionId::new(self.next_id);
        self.next_id += 1;

        log::info!("Transition {} to '{}' started ({} scenes, {:?})", id.raw(), group, scenes.len(), flags);
        self.active = Some(ActiveTransition::new(id, group.clone(), flags, scenes));
        self.aggregator.reset();
        self.ticker.reset();
        self.set_state(LoadState::Unloading);

        self.events.send(SceneEvent::TransitionStarted { id, group: group.clone() });
        self.events.dispatch();
        Ok(id)
    }

    /// Ask the in-flight transition to stop at the next tick
    ///
    /// Remaining loads are skipped, the transition scene is removed and the
    /// coordinator returns to `Idle`. Returns false when nothing is running
    /// or activation has already started.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_cancellable() {
            if let Some(active) = self.active.as_ref() {
                log::info!("Transition {} is activating, cancel ignored", active.id.raw());
            }
            return false;
        }
        match self.active.as_mut() {
            Some(active) => {
                log::info!("Cancellation requested for transition {}", active.id.raw());
                active.cancel_requested = true;
                true
            }
            None => false,
        }
    }

    //--- Tick -------------------------------------------------------------

    /// Advance the backend and the state machine by one frame
    ///
    /// Transition failures are reported through events and
    /// [`SceneLoadCoordinator::last_outcome`]; only fatal engine errors are
    /// also returned here, after cleanup has already run.
    pub fn update(&mut self, delta_time: f32) -> Result<(), TransitionError> {
        self.backend.update(delta_time);

        let result = if self.state == LoadState::Idle {
            Ok(())
        } else if self.state.is_cancellable() && self.active.as_ref().is_some_and(|active| active.cancel_requested) {
            self.finish(Err(TransitionError::Cancelled));
            Ok(())
        } else {
            match self.advance(delta_time) {
                Ok(()) => Ok(()),
                Err(error) => {
                    let fatal = error.is_fatal();
                    self.finish(Err(error.clone()));
                    if fatal {
                        Err(error)
                    } else {
                        Ok(())
                    }
                }
            }
        };

        self.events.dispatch();
        result
    }

    fn advance(&mut self, delta_time: f32) -> Result<(), TransitionError> {
        self.ticker.accumulate(delta_time);

        loop {
            let step = match self.state {
                LoadState::Idle => return Ok(()),
                LoadState::Unloading => self.step_unloading()?,
                LoadState::LoadingTransitionScene => self.step_loading_transition_scene()?,
                LoadState::LoadingTargetScenes => self.step_loading_targets()?,
                LoadState::AwaitingProgressCatchUp => self.step_catch_up()?,
                LoadState::Activating => self.step_activating()?,
                LoadState::UnloadingTransitionScene => self.step_unloading_transition_scene(),
            };
            if step == Step::Waiting {
                return Ok(());
            }
        }
    }

    //--- States -----------------------------------------------------------

    fn step_unloading(&mut self) -> Result<Step, TransitionError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(Step::Advanced);
        };

        if active.unloads.is_none() {
            let mut unloads = Vec::with_capacity(self.loaded.len());
            let handles = self.loaded.drain();
            for (index, handle) in handles.iter().enumerate() {
                match self.backend.unload(handle.operation) {
                    Ok(op) => unloads.push(op),
                    Err(err) if err.is_fatal() => {
                        // Scenes not unloaded yet stay tracked for the next transition
                        for rest in &handles[index..] {
                            self.loaded.push(rest.scene.clone(), rest.operation);
                        }
                        return Err(err.into());
                    }
                    Err(err) => log::warn!("Skipping unload of '{}': {}", handle.scene, err),
                }
            }
            self.current_group = None;
            active.unloads = Some(unloads);
        }

        let unloads = active.unloads.as_deref().unwrap_or_default();
        let mut pending = false;
        for &op in unloads {
            let status = self.backend.status(op);
            if !status.valid {
                log::warn!("Unload operation {:?} became invalid, skipping", op);
            } else if !status.done {
                pending = true;
            }
        }
        if pending {
            return Ok(Step::Waiting);
        }

        if !active.flags.contains(TransitionFlags::KEEP_UNUSED_RESOURCES) {
            self.backend.release_unused();
        }

        let next = if active.flags.contains(TransitionFlags::USE_LOADING_SCENE) {
            LoadState::LoadingTransitionScene
        } else {
            LoadState::LoadingTargetScenes
        };
        self.loaded = LoadHandleGroup::with_expected(active.scenes.len());
        self.set_state(next);
        Ok(Step::Advanced)
    }

    fn step_loading_transition_scene(&mut self) -> Result<Step, TransitionError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(Step::Advanced);
        };

        let op = match active.transition_scene {
            Some(op) => op,
            None => {
                let op = self.backend.load_additive(self.catalog.transition_scene(), true)?;
                active.transition_scene = Some(op);
                op
            }
        };

        let status = self.backend.status(op);
        if !status.valid {
            active.transition_scene = None;
            return Err(TransitionError::InvalidOperation(self.catalog.transition_scene().clone()));
        }
        if !status.done {
            return Ok(Step::Waiting);
        }

        self.set_state(LoadState::LoadingTargetScenes);
        Ok(Step::Advanced)
    }

    fn step_loading_targets(&mut self) -> Result<Step, TransitionError> {
        self.pump_progress();

        let Some(active) = self.active.as_mut() else {
            return Ok(Step::Advanced);
        };

        if let Some((scene, op)) = active.awaiting.as_ref() {
            let status = self.backend.status(*op);
            if !status.valid {
                return Err(TransitionError::InvalidOperation(scene.clone()));
            }
            if !status.done {
                return Ok(Step::Waiting);
            }
            log::debug!("Scene '{}' loaded", scene);
            active.awaiting = None;
        }

        if let Some(scene) = active.scenes.get(active.next_scene).cloned() {
            let op = self.backend.load_additive(&scene, false)?;
            log::debug!("Loading scene '{}' ({}/{})", scene, active.next_scene + 1, active.scenes.len());
            self.loaded.push(scene.clone(), op);
            active.awaiting = Some((scene, op));
            active.next_scene += 1;
            return Ok(Step::Advanced);
        }

        self.set_state(LoadState::AwaitingProgressCatchUp);
        Ok(Step::Advanced)
    }

    fn step_catch_up(&mut self) -> Result<Step, TransitionError> {
        let invalid = self.loaded.invalid_handles(&self.backend);
        if let Some(first) = invalid.first() {
            for handle in &invalid {
                log::warn!("Loaded scene '{}' was dropped by the engine before activation", handle.scene);
            }
            return Err(TransitionError::InvalidOperation(first.scene.clone()));
        }

        self.pump_progress();
        if !self.aggregator.is_caught_up() || !self.loaded.is_done(&self.backend) {
            return Ok(Step::Waiting);
        }
        self.set_state(LoadState::Activating);
        Ok(Step::Advanced)
    }

    fn step_activating(&mut self) -> Result<Step, TransitionError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(Step::Advanced);
        };

        if !self.loaded.is_empty() {
            let op = match active.activation {
                Some(op) => op,
                None => {
                    let op = self.backend.activate(&self.loaded.operations())?;
                    active.activation = Some(op);
                    op
                }
            };

            let status = self.backend.status(op);
            if !status.valid {
                return Err(TransitionError::ActivationFailed);
            }
            if !status.done {
                return Ok(Step::Waiting);
            }
        }

        if active.transition_scene.is_some() {
            self.set_state(LoadState::UnloadingTransitionScene);
        } else {
            self.finish(Ok(()));
        }
        Ok(Step::Advanced)
    }

    fn step_unloading_transition_scene(&mut self) -> Step {
        let Some(active) = self.active.as_mut() else {
            return Step::Advanced;
        };

        if active.transition_unload.is_none() {
            match active.transition_scene.map(|op| self.backend.unload(op)) {
                Some(Ok(op)) => active.transition_unload = Some(op),
                Some(Err(err)) => log::warn!("Transition scene could not be unloaded: {}", err),
                None => {}
            }
            active.transition_scene = None;
        }

        if let Some(op) = active.transition_unload {
            let status = self.backend.status(op);
            if status.valid && !status.done {
                return Step::Waiting;
            }
        }

        self.finish(Ok(()));
        Step::Advanced
    }

    //--- Helpers ----------------------------------------------------------

    fn pump_progress(&mut self) {
        let Some(id) = self.active.as_ref().map(|active| active.id) else {
            return;
        };

        self.aggregator.set_target(self.loaded.progress(&self.backend));
        while let Some(step) = self.ticker.next_step() {
            if let Some(ratio) = self.aggregator.step(step) {
                self.events.send(SceneEvent::ProgressChanged { id, ratio });
            }
        }
    }

    fn set_state(&mut self, state: LoadState) {
        if self.state != state {
            log::debug!("Scene loader: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Single exit path: cleanup, outcome, event, back to `Idle`
    fn finish(&mut self, result: Result<(), TransitionError>) {
        let Some(active) = self.active.take() else {
            self.set_state(LoadState::Idle);
            return;
        };

        // Loaded-but-inactive target scenes stay in `loaded`; the next
        // transition's unloading step removes them.
        if let Some(op) = active.transition_scene {
            if let Err(err) = self.backend.unload(op) {
                log::warn!("Transition scene could not be unloaded during cleanup: {}", err);
            }
        }

        let (outcome, event) = match result {
            Ok(()) => {
                log::info!("Transition {} to '{}' completed", active.id.raw(), active.group);
                self.current_group = Some(active.group.clone());
                (
                    TransitionOutcome::Completed { id: active.id, group: active.group.clone() },
                    SceneEvent::TransitionCompleted { id: active.id, group: active.group },
                )
            }
            Err(TransitionError::Cancelled) => {
                log::info!("Transition {} to '{}' cancelled", active.id.raw(), active.group);
                (
                    TransitionOutcome::Cancelled { id: active.id, group: active.group.clone() },
                    SceneEvent::TransitionFailed {
                        id: active.id,
                        group: active.group,
                        error: TransitionError::Cancelled,
                    },
                )
            }
            Err(error) => {
                log::error!("Transition {} to '{}' failed: {}", active.id.raw(), active.group, error);
                (
                    TransitionOutcome::Failed {
                        id: active.id,
                        group: active.group.clone(),
                        error: error.clone(),
                    },
                    SceneEvent::TransitionFailed { id: active.id, group: active.group, error },
                )
            }
        };

        self.last_outcome = Some(outcome);
        self.events.send(event);
        self.set_state(LoadState::Idle);
    }

    //--- Accessors --------------------------------------------------------

    /// Current state
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Whether a new transition would be accepted
    pub fn is_idle(&self) -> bool {
        self.state == LoadState::Idle
    }

    /// Smoothed progress of the current (or last) transition
    pub fn progress(&self) -> f32 {
        self.aggregator.current()
    }

    /// Outcome of the most recently finished transition
    pub fn last_outcome(&self) -> Option<&TransitionOutcome> {
        self.last_outcome.as_ref()
    }

    /// Group whose scenes are currently active
    pub fn current_group(&self) -> Option<&SceneGroupId> {
        self.current_group.as_ref()
    }

    /// Scenes loaded by the current or last transition
    pub fn loaded_scenes(&self) -> Vec<&SceneRef> {
        self.loaded.handles().iter().map(|handle| &handle.scene).collect()
    }

    /// Catalog used to resolve groups
    pub fn catalog(&self) -> &SceneGroupCatalog {
        &self.catalog
    }

    /// Event system the UI subscribes to
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Engine backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Engine backend, mutable
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CatalogConfig;
    use crate::events::EventType;
    use crate::scene::simulated::{BackendEvent, SimulatedBackend};
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME: f32 = 0.02;

    fn backend() -> SimulatedBackend {
        SimulatedBackend::new()
            .with_scene("Scenes/Loading", 0.04)
            .with_scene("Scenes/App", 0.1)
            .with_scene("Scenes/MainMenu", 0.1)
            .with_scene("Scenes/Gameplay", 0.2)
            .with_scene("Scenes/GameplayHud", 0.1)
    }

    fn coordinator(backend: SimulatedBackend) -> SceneLoadCoordinator<SimulatedBackend> {
        let catalog = SceneGroupCatalog::build(&CatalogConfig::default()).unwrap();
        let config = SceneLoaderConfig::default().with_progress_multiplier(5.0);
        SceneLoadCoordinator::new(backend, catalog, &config)
    }

    fn run_to_idle(coordinator: &mut SceneLoadCoordinator<SimulatedBackend>) -> usize {
        for frame in 0..10_000 {
            coordinator.update(FRAME).unwrap();
            if coordinator.is_idle() {
                return frame;
            }
        }
        panic!("coordinator never returned to Idle (state {})", coordinator.state());
    }

    fn record_events(coordinator: &mut SceneLoadCoordinator<SimulatedBackend>) -> Rc<RefCell<Vec<SceneEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        coordinator.events_mut().register_for_all(|| {
            let sink = Rc::clone(&sink);
            move |event: &SceneEvent| {
                sink.borrow_mut().push(event.clone());
                false
            }
        });
        seen
    }

    #[test]
    fn test_transition_completes_and_activates_group() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert_eq!(coordinator.current_group(), Some(&"MainMenu".into()));
        assert_eq!(coordinator.backend().active_scenes(), vec!["Scenes/MainMenu"]);
        assert_eq!(coordinator.progress(), 1.0);
    }

    #[test]
    fn test_second_request_is_rejected_while_busy() {
        let mut coordinator = coordinator(backend());
        let first = coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();
        coordinator.update(FRAME).unwrap();
        let state_before = coordinator.state();

        let rejected = coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty());
        assert_eq!(rejected, Err(TransitionError::Busy(state_before)));
        assert_eq!(coordinator.state(), state_before);

        run_to_idle(&mut coordinator);
        match coordinator.last_outcome() {
            Some(TransitionOutcome::Completed { id, group }) => {
                assert_eq!(*id, first);
                assert_eq!(group.as_str(), "Gameplay");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_unknown_group_leaves_coordinator_idle() {
        let mut coordinator = coordinator(backend());
        let err = coordinator.request_transition(&"Credits".into(), TransitionFlags::empty());

        assert_eq!(err, Err(TransitionError::UnknownGroup("Credits".into())));
        assert!(coordinator.is_idle());
        assert!(coordinator.last_outcome().is_none());
    }

    #[test]
    fn test_previous_group_is_unloaded_first() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);
        coordinator.backend_mut().clear_log();

        coordinator.request_transition(&"App".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        let log = coordinator.backend().log();
        assert_eq!(log[0], BackendEvent::UnloadStarted("Scenes/MainMenu".to_string()));
        assert_eq!(log[1], BackendEvent::Unloaded("Scenes/MainMenu".to_string()));
        assert_eq!(log[2], BackendEvent::ReleasedUnused);
        assert_eq!(coordinator.backend().loaded_scenes(), vec!["Scenes/App"]);
    }

    #[test]
    fn test_progress_events_are_monotonic_and_reach_one() {
        let mut coordinator = coordinator(backend());
        let seen = record_events(&mut coordinator);

        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        let ratios: Vec<f32> = seen
            .borrow()
            .iter()
            .filter_map(|event| match event {
                SceneEvent::ProgressChanged { ratio, .. } => Some(*ratio),
                _ => None,
            })
            .collect();

        assert!(ratios.len() > 2, "expected several progress ticks, got {ratios:?}");
        assert!(ratios.windows(2).all(|pair| pair[1] >= pair[0]));
        assert_eq!(ratios.last().copied(), Some(1.0));
    }

    #[test]
    fn test_missing_scene_fails_back_to_idle() {
        let mut backend = backend();
        backend.remove_scene("Scenes/GameplayHud");
        let mut coordinator = coordinator(backend);
        let seen = record_events(&mut coordinator);

        coordinator
            .request_transition(&"Gameplay".into(), TransitionFlags::USE_LOADING_SCENE)
            .unwrap();
        run_to_idle(&mut coordinator);

        assert!(matches!(
            coordinator.last_outcome(),
            Some(TransitionOutcome::Failed { error: TransitionError::Backend(BackendError::SceneNotFound(_)), .. })
        ));
        assert!(seen.borrow().iter().any(|event| event.event_type() == EventType::TransitionFailed));

        // Transition scene was cleaned up
        coordinator.update(FRAME).unwrap();
        assert!(!coordinator.backend().loaded_scenes().contains(&"Scenes/Loading"));
        assert!(coordinator.current_group().is_none());
    }

    #[test]
    fn test_invalidated_load_aborts_transition() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();

        while coordinator.backend().log().is_empty() {
            coordinator.update(FRAME).unwrap();
        }
        assert_eq!(coordinator.state(), LoadState::LoadingTargetScenes);
        assert!(coordinator.backend_mut().invalidate_scene("Scenes/Gameplay"));

        run_to_idle(&mut coordinator);
        assert!(matches!(
            coordinator.last_outcome(),
            Some(TransitionOutcome::Failed { error: TransitionError::InvalidOperation(_), .. })
        ));
    }

    #[test]
    fn test_invalid_handle_during_unload_is_skipped() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        coordinator.backend_mut().invalidate_scene("Scenes/GameplayHud");
        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert_eq!(coordinator.backend().active_scenes(), vec!["Scenes/MainMenu"]);
    }

    #[test]
    fn test_cancel_skips_remaining_loads() {
        let mut coordinator = coordinator(backend());
        coordinator
            .request_transition(&"Gameplay".into(), TransitionFlags::USE_LOADING_SCENE)
            .unwrap();

        while coordinator.state() != LoadState::LoadingTargetScenes {
            coordinator.update(FRAME).unwrap();
        }
        assert!(coordinator.cancel());
        coordinator.update(FRAME).unwrap();

        assert!(coordinator.is_idle());
        assert!(matches!(coordinator.last_outcome(), Some(TransitionOutcome::Cancelled { .. })));
        let log = coordinator.backend().log();
        assert!(!log.contains(&BackendEvent::LoadStarted("Scenes/GameplayHud".to_string())));
        assert!(log.contains(&BackendEvent::UnloadStarted("Scenes/Loading".to_string())));
        assert!(!coordinator.cancel());
    }

    #[test]
    fn test_resource_exhaustion_is_surfaced() {
        let mut coordinator = coordinator(backend());
        coordinator.backend_mut().exhaust_resources();
        coordinator.request_transition(&"App".into(), TransitionFlags::empty()).unwrap();

        let err = coordinator.update(FRAME).unwrap_err();
        assert!(err.is_fatal());
        assert!(coordinator.is_idle());
    }

    fn tracked(coordinator: &SceneLoadCoordinator<SimulatedBackend>) -> Vec<&str> {
        coordinator.loaded_scenes().into_iter().map(SceneRef::path).collect()
    }

    #[test]
    fn test_fatal_unload_keeps_remaining_scenes_tracked() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        coordinator.backend_mut().fail_next_unloads(1);
        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        let err = coordinator.update(FRAME).unwrap_err();

        assert!(matches!(err, TransitionError::Backend(BackendError::ResourceExhausted(_))));
        assert!(coordinator.is_idle());
        assert_eq!(tracked(&coordinator), vec!["Scenes/Gameplay", "Scenes/GameplayHud"]);

        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);
        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert_eq!(coordinator.backend().loaded_scenes(), vec!["Scenes/MainMenu"]);
        assert_eq!(tracked(&coordinator), vec!["Scenes/MainMenu"]);
    }

    #[test]
    fn test_zero_multiplier_still_returns_to_idle() {
        let catalog = SceneGroupCatalog::build(&CatalogConfig::default()).unwrap();
        let config = SceneLoaderConfig::default().with_progress_multiplier(0.0);
        let mut coordinator = SceneLoadCoordinator::new(backend(), catalog, &config);

        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);

        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert_eq!(coordinator.progress(), 1.0);
    }

    #[test]
    fn test_cancel_is_ignored_once_activation_started() {
        let backend = backend().with_activation_duration(0.1).with_unload_duration(0.1);
        let mut coordinator = coordinator(backend);
        let seen = record_events(&mut coordinator);
        coordinator
            .request_transition(&"Gameplay".into(), TransitionFlags::USE_LOADING_SCENE)
            .unwrap();

        while coordinator.state() != LoadState::Activating {
            coordinator.update(FRAME).unwrap();
        }
        assert!(!coordinator.cancel());
        while coordinator.state() != LoadState::UnloadingTransitionScene {
            coordinator.update(FRAME).unwrap();
        }
        assert!(!coordinator.cancel());
        run_to_idle(&mut coordinator);

        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert_eq!(coordinator.current_group(), Some(&"Gameplay".into()));
        let mut active = coordinator.backend().active_scenes();
        active.sort_unstable();
        assert_eq!(active, vec!["Scenes/Gameplay", "Scenes/GameplayHud"]);
        assert!(!seen.borrow().iter().any(|event| event.event_type() == EventType::TransitionFailed));
    }

    #[test]
    fn test_failed_activation_fails_transition() {
        let mut coordinator = coordinator(backend().with_activation_duration(0.1));
        coordinator
            .request_transition(&"Gameplay".into(), TransitionFlags::USE_LOADING_SCENE)
            .unwrap();

        while coordinator.state() != LoadState::Activating {
            coordinator.update(FRAME).unwrap();
        }
        assert_eq!(coordinator.backend_mut().invalidate_activations(), 1);
        coordinator.update(FRAME).unwrap();

        assert!(coordinator.is_idle());
        assert!(matches!(
            coordinator.last_outcome(),
            Some(TransitionOutcome::Failed { error: TransitionError::ActivationFailed, .. })
        ));
        assert!(coordinator.current_group().is_none());

        coordinator.update(FRAME).unwrap();
        assert!(!coordinator.backend().loaded_scenes().contains(&"Scenes/Loading"));
        assert!(coordinator.backend().active_scenes().is_empty());
    }

    #[test]
    fn test_scene_dropped_before_activation_fails_transition() {
        let catalog = SceneGroupCatalog::build(&CatalogConfig::default()).unwrap();
        let config = SceneLoaderConfig::default().with_progress_multiplier(0.5);
        let mut coordinator = SceneLoadCoordinator::new(backend(), catalog, &config);
        coordinator.request_transition(&"Gameplay".into(), TransitionFlags::empty()).unwrap();

        while coordinator.state() != LoadState::AwaitingProgressCatchUp {
            coordinator.update(FRAME).unwrap();
        }
        assert!(coordinator.backend_mut().invalidate_scene("Scenes/Gameplay"));
        coordinator.update(FRAME).unwrap();

        assert!(coordinator.is_idle());
        match coordinator.last_outcome() {
            Some(TransitionOutcome::Failed { error: TransitionError::InvalidOperation(scene), .. }) => {
                assert_eq!(scene.path(), "Scenes/Gameplay");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!coordinator.backend().log().iter().any(|event| matches!(event, BackendEvent::ActivateStarted(_))));
    }

    #[test]
    fn test_keep_unused_resources_skips_release() {
        let mut coordinator = coordinator(backend());
        coordinator.request_transition(&"MainMenu".into(), TransitionFlags::empty()).unwrap();
        run_to_idle(&mut coordinator);
        assert!(coordinator.backend().log().contains(&BackendEvent::ReleasedUnused));
        coordinator.backend_mut().clear_log();

        coordinator
            .request_transition(&"App".into(), TransitionFlags::KEEP_UNUSED_RESOURCES)
            .unwrap();
        run_to_idle(&mut coordinator);

        assert!(coordinator.last_outcome().unwrap().is_completed());
        assert!(!coordinator.backend().log().contains(&BackendEvent::ReleasedUnused));
        assert_eq!(coordinator.backend().loaded_scenes(), vec!["Scenes/App"]);
    }
}
