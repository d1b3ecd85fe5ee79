//! Scene-group loading
//!
//! ```text
//! SceneGroupCatalog ──resolve──▶ SceneLoadCoordinator ──drives──▶ SceneBackend
//!                                      │
//!                     LoadHandleGroup ─┴─▶ LoadProgressAggregator ──▶ EventSystem
//! ```
//!
//! The coordinator resolves a group through the catalog, unloads the
//! previous group, loads the new scenes one by one through the backend,
//! smooths the aggregate progress and activates the scenes as one batch.

pub mod backend;
pub mod catalog;
pub mod coordinator;
pub mod handle_group;
pub mod progress;
pub mod simulated;

pub use backend::{BackendError, OperationStatus, SceneBackend};
pub use catalog::{CatalogError, SceneGroupCatalog, SceneGroupId, SceneRef};
pub use coordinator::{
    LoadState, SceneLoadCoordinator, TransitionError, TransitionFlags, TransitionId, TransitionOutcome,
};
pub use handle_group::{LoadHandle, LoadHandleGroup};
pub use progress::LoadProgressAggregator;
pub use simulated::{BackendEvent, SimulatedBackend};
pub use crate::foundation::collections::OperationId;
