//! In-memory scene backend
//!
//! Stands in for the host engine in headless runs and tests. Each scene has
//! a load duration; non-activating loads stop at a progress ceiling until
//! they are activated, the way real engines hold scenes back. Every issued
//! call and every completion is appended to an ordered log.

use std::collections::HashMap;

use crate::foundation::collections::{HandleMap, OperationId};
use crate::scene::backend::{BackendError, OperationStatus, SceneBackend};
use crate::scene::catalog::SceneRef;

/// One entry of the backend's call/completion log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// `load_additive` was issued
    LoadStarted(String),
    /// A load reached its ready state
    Loaded(String),
    /// `unload` was issued
    UnloadStarted(String),
    /// A scene finished unloading
    Unloaded(String),
    /// `activate` was issued
    ActivateStarted(Vec<String>),
    /// A batch of scenes became active
    Activated(Vec<String>),
    /// `release_unused` was called
    ReleasedUnused,
}

#[derive(Debug, Clone)]
enum OperationKind {
    Load { scene: String, active: bool },
    Unload { target: OperationId },
    Activate { targets: Vec<OperationId> },
}

#[derive(Debug, Clone)]
struct Operation {
    kind: OperationKind,
    elapsed: f32,
    duration: f32,
    done: bool,
    valid: bool,
}

impl Operation {
    fn new(kind: OperationKind, duration: f32) -> Self {
        Self { kind, elapsed: 0.0, duration: duration.max(0.0), done: false, valid: true }
    }

    fn fraction(&self) -> f32 {
        if self.done || self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

/// Scene backend simulated in memory
#[derive(Debug)]
pub struct SimulatedBackend {
    scenes: HashMap<String, f32>,
    operations: HandleMap<OperationId, Operation>,
    log: Vec<BackendEvent>,
    load_ceiling: f32,
    unload_duration: f32,
    activation_duration: f32,
    exhausted: bool,
    failing_unloads: usize,
}

impl SimulatedBackend {
    /// Create an empty backend with no known scenes
    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            operations: HandleMap::with_key(),
            log: Vec::new(),
            load_ceiling: 0.9,
            unload_duration: 0.0,
            activation_duration: 0.0,
            exhausted: false,
            failing_unloads: 0,
        }
    }

    /// Make a scene loadable, taking `load_duration` seconds
    pub fn with_scene(mut self, path: impl Into<String>, load_duration: f32) -> Self {
        self.add_scene(path, load_duration);
        self
    }

    /// Progress reported by finished but not yet activated loads
    pub fn with_load_ceiling(mut self, ceiling: f32) -> Self {
        self.load_ceiling = ceiling.clamp(0.0, 1.0);
        self
    }

    /// Seconds an unload takes
    pub fn with_unload_duration(mut self, duration: f32) -> Self {
        self.unload_duration = duration.max(0.0);
        self
    }

    /// Seconds an activation batch takes
    pub fn with_activation_duration(mut self, duration: f32) -> Self {
        self.activation_duration = duration.max(0.0);
        self
    }

    /// Make a scene loadable
    pub fn add_scene(&mut self, path: impl Into<String>, load_duration: f32) {
        self.scenes.insert(path.into(), load_duration.max(0.0));
    }

    /// Forget a scene so further loads of it fail
    pub fn remove_scene(&mut self, path: &str) {
        self.scenes.remove(path);
    }

    /// Mark an operation invalid, as if the engine dropped it
    pub fn invalidate(&mut self, operation: OperationId) {
        if let Some(op) = self.operations.get_mut(operation) {
            op.valid = false;
        }
    }

    /// Invalidate the most recent load of `path`, if any
    pub fn invalidate_scene(&mut self, path: &str) -> bool {
        let target = self
            .operations
            .iter()
            .filter(|(_, op)| matches!(&op.kind, OperationKind::Load { scene, .. } if scene == path))
            .map(|(id, _)| id)
            .last();
        if let Some(id) = target {
            self.invalidate(id);
        }
        target.is_some()
    }

    /// Make every further call fail with resource exhaustion
    pub fn exhaust_resources(&mut self) {
        self.exhausted = true;
    }

    /// Make the next `count` unload calls fail with resource exhaustion
    pub fn fail_next_unloads(&mut self, count: usize) {
        self.failing_unloads = count;
    }

    /// Invalidate every activation batch still in flight
    ///
    /// Returns the number of batches invalidated.
    pub fn invalidate_activations(&mut self) -> usize {
        let mut invalidated = 0;
        for (_, op) in &mut self.operations {
            if op.valid && !op.done && matches!(op.kind, OperationKind::Activate { .. }) {
                op.valid = false;
                invalidated += 1;
            }
        }
        invalidated
    }

    /// Ordered call/completion log
    pub fn log(&self) -> &[BackendEvent] {
        &self.log
    }

    /// Clear the log
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Scenes currently loaded, active or not
    pub fn loaded_scenes(&self) -> Vec<&str> {
        self.load_ops().filter(|(_, op)| op.done).map(|(scene, _)| scene).collect()
    }

    /// Scenes currently loaded and active
    pub fn active_scenes(&self) -> Vec<&str> {
        self.load_ops()
            .filter(|(_, op)| matches!(op.kind, OperationKind::Load { active: true, .. }))
            .map(|(scene, _)| scene)
            .collect()
    }

    fn load_ops(&self) -> impl Iterator<Item = (&str, &Operation)> {
        self.operations.values().filter(|op| op.valid).filter_map(|op| match &op.kind {
            OperationKind::Load { scene, .. } => Some((scene.as_str(), op)),
            _ => None,
        })
    }

    fn scene_name(&self, operation: OperationId) -> String {
        match self.operations.get(operation).map(|op| &op.kind) {
            Some(OperationKind::Load { scene, .. }) => scene.clone(),
            _ => format!("{operation:?}"),
        }
    }

    fn check_resources(&self) -> Result<(), BackendError> {
        if self.exhausted {
            Err(BackendError::ResourceExhausted("simulated memory budget".to_string()))
        } else {
            Ok(())
        }
    }

    fn complete(&mut self, id: OperationId) {
        let Some(op) = self.operations.get_mut(id) else { return };
        op.done = true;
        let kind = op.kind.clone();

        match kind {
            OperationKind::Load { scene, .. } => self.log.push(BackendEvent::Loaded(scene)),
            OperationKind::Unload { target } => {
                let scene = self.scene_name(target);
                self.operations.remove(target);
                self.log.push(BackendEvent::Unloaded(scene));
            }
            OperationKind::Activate { targets } => {
                let mut scenes = Vec::with_capacity(targets.len());
                for target in targets {
                    scenes.push(self.scene_name(target));
                    if let Some(OperationKind::Load { active, .. }) =
                        self.operations.get_mut(target).map(|op| &mut op.kind)
                    {
                        *active = true;
                    }
                }
                self.log.push(BackendEvent::Activated(scenes));
            }
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBackend for SimulatedBackend {
    fn load_additive(&mut self, scene: &SceneRef, activate: bool) -> Result<OperationId, BackendError> {
        self.check_resources()?;
        let duration = *self
            .scenes
            .get(scene.path())
            .ok_or_else(|| BackendError::SceneNotFound(scene.path().to_string()))?;

        self.log.push(BackendEvent::LoadStarted(scene.path().to_string()));
        let kind = OperationKind::Load { scene: scene.path().to_string(), active: activate };
        Ok(self.operations.insert(Operation::new(kind, duration)))
    }

    fn unload(&mut self, handle: OperationId) -> Result<OperationId, BackendError> {
        if self.failing_unloads > 0 {
            self.failing_unloads -= 1;
            return Err(BackendError::ResourceExhausted("simulated unload failure".to_string()));
        }
        match self.operations.get(handle) {
            Some(op) if op.valid && matches!(op.kind, OperationKind::Load { .. }) => {}
            _ => return Err(BackendError::InvalidHandle(handle)),
        }

        self.log.push(BackendEvent::UnloadStarted(self.scene_name(handle)));
        let kind = OperationKind::Unload { target: handle };
        Ok(self.operations.insert(Operation::new(kind, self.unload_duration)))
    }

    fn activate(&mut self, handles: &[OperationId]) -> Result<OperationId, BackendError> {
        self.check_resources()?;
        for &handle in handles {
            match self.operations.get(handle) {
                Some(op) if op.valid && op.done => {}
                _ => return Err(BackendError::InvalidHandle(handle)),
            }
        }

        let scenes = handles.iter().map(|&handle| self.scene_name(handle)).collect();
        self.log.push(BackendEvent::ActivateStarted(scenes));
        let kind = OperationKind::Activate { targets: handles.to_vec() };
        Ok(self.operations.insert(Operation::new(kind, self.activation_duration)))
    }

    fn status(&self, operation: OperationId) -> OperationStatus {
        let Some(op) = self.operations.get(operation) else {
            return OperationStatus::INVALID;
        };
        if !op.valid {
            return OperationStatus::INVALID;
        }

        let progress = match op.kind {
            OperationKind::Load { active: true, .. } if op.done => 1.0,
            OperationKind::Load { active, .. } => {
                let ceiling = if active { 1.0 } else { self.load_ceiling };
                op.fraction() * ceiling
            }
            _ => op.fraction(),
        };

        if op.done {
            OperationStatus::finished(progress)
        } else {
            OperationStatus::pending(progress)
        }
    }

    fn release_unused(&mut self) {
        // Finished unload/activate records are the only thing left to free.
        self.operations.retain(|_, op| op.valid && (!op.done || matches!(op.kind, OperationKind::Load { .. })));
        self.log.push(BackendEvent::ReleasedUnused);
    }

    fn update(&mut self, delta_time: f32) {
        let mut finished = Vec::new();
        for (id, op) in &mut self.operations {
            if op.done || !op.valid {
                continue;
            }
            op.elapsed += delta_time.max(0.0);
            if op.elapsed >= op.duration {
                finished.push(id);
            }
        }
        for id in finished {
            self.complete(id);
        }
    }
}
