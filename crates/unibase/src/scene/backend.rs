//! Engine scene-loading contract
//!
//! The coordinator only ever talks to the engine through [`SceneBackend`].
//! Every call returns an [`OperationId`] immediately; completion and
//! progress are polled through [`SceneBackend::status`] on later ticks.

use thiserror::Error;

use crate::foundation::collections::OperationId;
use crate::scene::catalog::SceneRef;

/// Snapshot of one asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationStatus {
    /// The operation still refers to something the engine knows about
    pub valid: bool,
    /// The operation finished
    pub done: bool,
    /// Progress in `[0, 1]`
    pub progress: f32,
}

impl OperationStatus {
    /// Status reported for ids the backend does not know
    pub const INVALID: Self = Self { valid: false, done: false, progress: 0.0 };

    /// In-flight operation at `progress`
    pub fn pending(progress: f32) -> Self {
        Self { valid: true, done: false, progress: progress.clamp(0.0, 1.0) }
    }

    /// Finished operation at `progress`
    pub fn finished(progress: f32) -> Self {
        Self { valid: true, done: true, progress: progress.clamp(0.0, 1.0) }
    }
}

/// Errors reported by a scene backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The scene path is unknown to the engine
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    /// The handle was never issued or has already been released
    #[error("Invalid operation handle: {0:?}")]
    InvalidHandle(OperationId),

    /// The engine ran out of memory or another hard resource
    #[error("Engine resources exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other engine failure
    #[error("Scene backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether the error must be surfaced upward unchanged
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }
}

/// Narrow scene-loading API of the host engine
pub trait SceneBackend {
    /// Start loading `scene` additively
    ///
    /// With `activate == false` the scene stays loaded-but-inactive until a
    /// later [`SceneBackend::activate`] covers its handle.
    fn load_additive(&mut self, scene: &SceneRef, activate: bool) -> Result<OperationId, BackendError>;

    /// Start unloading the scene loaded by `handle`
    fn unload(&mut self, handle: OperationId) -> Result<OperationId, BackendError>;

    /// Start activating loaded-but-inactive scenes as one batch
    fn activate(&mut self, handles: &[OperationId]) -> Result<OperationId, BackendError>;

    /// Poll an operation
    fn status(&self, operation: OperationId) -> OperationStatus;

    /// Free engine resources no longer referenced by any loaded scene
    fn release_unused(&mut self);

    /// Advance backend-side work by one frame
    fn update(&mut self, _delta_time: f32) {}
}

impl<B: SceneBackend + ?Sized> SceneBackend for Box<B> {
    fn load_additive(&mut self, scene: &SceneRef, activate: bool) -> Result<OperationId, BackendError> {
        (**self).load_additive(scene, activate)
    }

    fn unload(&mut self, handle: OperationId) -> Result<OperationId, BackendError> {
        (**self).unload(handle)
    }

    fn activate(&mut self, handles: &[OperationId]) -> Result<OperationId, BackendError> {
        (**self).activate(handles)
    }

    fn status(&self, operation: OperationId) -> OperationStatus {
        (**self).status(operation)
    }

    fn release_unused(&mut self) {
        (**self).release_unused();
    }

    fn update(&mut self, delta_time: f32) {
        (**self).update(delta_time);
    }
}
