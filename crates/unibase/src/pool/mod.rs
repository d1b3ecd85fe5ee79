//! Object pooling
//!
//! - [`PoolRegistry`]: per-kind pools with lazy creation and reuse
//! - [`Poolable`]: hooks a pooled object receives
//! - [`Completion`] / [`BatchCompletion`]: exactly-once callbacks for
//!   show and hide transitions

pub mod completion;
pub mod poolable;
pub mod registry;

pub use completion::{BatchCompletion, Completion};
pub use poolable::{InstanceState, PoolKind, Poolable, Transition};
pub use registry::{PoolError, PoolRegistry, PoolSpec, PoolStats};
pub use crate::foundation::collections::InstanceId;
