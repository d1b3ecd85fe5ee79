//! Handle group
//!
//! The set of scene-load operations belonging to one group transition.
//! Aggregate progress and completion are always derived from the members'
//! current statuses; nothing aggregate is stored.

use crate::foundation::collections::OperationId;
use crate::scene::backend::SceneBackend;
use crate::scene::catalog::SceneRef;

/// One load in the group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHandle {
    /// Scene the handle loads
    pub scene: SceneRef,
    /// Backend operation
    pub operation: OperationId,
}

/// Loads issued for one scene group
#[derive(Debug, Clone, Default)]
pub struct LoadHandleGroup {
    handles: Vec<LoadHandle>,
    expected: usize,
}

impl LoadHandleGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group that will eventually hold `expected` loads
    ///
    /// Loads that are not issued yet count as zero progress, so the
    /// aggregate does not jump back when the next sequential load starts.
    pub fn with_expected(expected: usize) -> Self {
        Self { handles: Vec::with_capacity(expected), expected }
    }

    /// Add an issued load
    pub fn push(&mut self, scene: SceneRef, operation: OperationId) {
        self.handles.push(LoadHandle { scene, operation });
    }

    /// Issued loads, in issue order
    pub fn handles(&self) -> &[LoadHandle] {
        &self.handles
    }

    /// Backend operation ids, in issue order
    pub fn operations(&self) -> Vec<OperationId> {
        self.handles.iter().map(|handle| handle.operation).collect()
    }

    /// Number of issued loads
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no loads were issued
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Take every handle out, leaving the group empty
    pub fn drain(&mut self) -> Vec<LoadHandle> {
        self.expected = 0;
        std::mem::take(&mut self.handles)
    }

    /// Mean progress over all members (and not yet issued loads)
    ///
    /// An empty group with nothing expected counts as complete.
    pub fn progress<B: SceneBackend + ?Sized>(&self, backend: &B) -> f32 {
        let count = self.expected.max(self.handles.len());
        if count == 0 {
            return 1.0;
        }
        let sum: f32 = self
            .handles
            .iter()
            .map(|handle| backend.status(handle.operation))
            .filter(|status| status.valid)
            .map(|status| status.progress)
            .sum();
        // usize → f32 is exact for any realistic group size
        #[allow(clippy::cast_precision_loss)]
        let count = count as f32;
        (sum / count).clamp(0.0, 1.0)
    }

    /// Whether every expected load was issued and has finished
    pub fn is_done<B: SceneBackend + ?Sized>(&self, backend: &B) -> bool {
        self.handles.len() >= self.expected
            && self.handles.iter().all(|handle| backend.status(handle.operation).done)
    }

    /// Members whose operation the backend no longer recognises
    pub fn invalid_handles<B: SceneBackend + ?Sized>(&self, backend: &B) -> Vec<&LoadHandle> {
        self.handles
            .iter()
            .filter(|handle| !backend.status(handle.operation).valid)
            .collect()
    }
}
