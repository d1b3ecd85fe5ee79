//! Pool Registry
//!
//! Keyed storage of homogeneous object pools. Each registered kind has a
//! factory; its pool is created lazily on the first acquire and reuses idle
//! instances before asking the factory for new ones, so the number of
//! instances per kind never exceeds the historical peak of instances in
//! use at the same time.
//!
//! # Failure semantics
//!
//! Nothing here fails across the acquire/release boundary. Acquiring an
//! unregistered kind logs and returns `None`; releasing an unknown id logs
//! and still runs the callback.
//!
//! # Usage
//!
//! ```rust
//! use unibase::pool::{Completion, PoolRegistry, PoolSpec, Poolable, Transition};
//!
//! struct Coin;
//! impl Poolable for Coin {}
//!
//! let mut pools: PoolRegistry<&'static str, Coin> = PoolRegistry::new();
//! pools.register("coin", PoolSpec::default(), |_| Coin);
//!
//! let coin = pools.acquire("coin", true, Transition::new(0.2, 0.0), Completion::none()).unwrap();
//! pools.update(0.2);
//! pools.release(coin, Transition::INSTANT, Completion::none());
//! assert_eq!(pools.count(&"coin"), 1);
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::core::config::PoolSettings;
use crate::foundation::collections::{HandleMap, InstanceId};
use crate::pool::completion::{BatchCompletion, Completion};
use crate::pool::poolable::{InstanceState, PoolKind, Poolable, Transition};

/// Errors produced inside the registry
///
/// They are logged, never returned from acquire/release.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No factory registered for the kind
    #[error("No pool factory registered for kind {0}")]
    UnregisteredKind(String),

    /// The id does not belong to any live instance
    #[error("Unknown pooled instance {0:?}")]
    UnknownInstance(InstanceId),
}

/// Per-kind pool options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSpec {
    /// At most one instance ever exists; acquires return it
    pub unique: bool,
    /// Instances created by `prewarm`
    pub prewarm: usize,
}

impl PoolSpec {
    /// Spec for a single shared instance
    pub fn unique() -> Self {
        Self { unique: true, prewarm: 0 }
    }

    /// Set the prewarm count
    pub fn with_prewarm(mut self, prewarm: usize) -> Self {
        self.prewarm = prewarm;
        self
    }

    /// Spec from configuration, falling back to the default prewarm count
    pub fn from_settings(settings: &PoolSettings, name: &str) -> Self {
        settings.entry(name).map_or(
            Self { unique: false, prewarm: settings.default_prewarm },
            |entry| Self { unique: entry.unique, prewarm: entry.prewarm },
        )
    }
}

/// Diagnostics for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances created by the factory
    pub created: u64,
    /// Successful acquires
    pub acquired: u64,
    /// Instances returned to the idle set
    pub released: u64,
    /// Most instances in use at the same time
    pub high_water: usize,
}

struct Registration<K, T> {
    spec: PoolSpec,
    factory: Box<dyn FnMut(&K) -> T>,
}

#[derive(Default)]
struct Pool {
    instances: Vec<InstanceId>,
    idle: Vec<InstanceId>,
    stats: PoolStats,
}

impl Pool {
    fn in_use(&self) -> usize {
        self.instances.len() - self.idle.len()
    }
}

struct Slot<K, T> {
    kind: K,
    object: T,
    state: InstanceState,
    transition: Transition,
    elapsed: f32,
    pending: Vec<Completion>,
}

/// Registry of object pools keyed by kind
pub struct PoolRegistry<K: PoolKind, T: Poolable> {
    registrations: HashMap<K, Registration<K, T>>,
    pools: HashMap<K, Pool>,
    slots: HandleMap<InstanceId, Slot<K, T>>,
}

impl<K: PoolKind, T: Poolable> PoolRegistry<K, T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            pools: HashMap::new(),
            slots: HandleMap::with_key(),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Register the creation path for a kind
    ///
    /// Re-registering replaces the factory and spec; existing instances stay.
    pub fn register<F>(&mut self, kind: K, spec: PoolSpec, factory: F)
    where
        F: FnMut(&K) -> T + 'static,
    {
        let registration = Registration { spec, factory: Box::new(factory) };
        if self.registrations.insert(kind.clone(), registration).is_some() {
            log::warn!("Pool kind {:?} was already registered and has been replaced", kind);
        } else {
            log::debug!("Registered pool kind {:?} ({:?})", kind, spec);
        }
    }

    /// Remove a kind's factory and destroy its pool
    pub fn unregister(&mut self, kind: &K) -> bool {
        self.remove_pool(kind);
        self.registrations.remove(kind).is_some()
    }

    /// Whether a factory exists for the kind
    pub fn is_registered(&self, kind: &K) -> bool {
        self.registrations.contains_key(kind)
    }

    /// Kinds with a registered factory
    pub fn registered_kinds(&self) -> impl Iterator<Item = &K> {
        self.registrations.keys()
    }

    /// Create idle instances up to the kind's prewarm count
    ///
    /// Returns the number of instances created.
    pub fn prewarm(&mut self, kind: &K) -> usize {
        let Some(spec) = self.registrations.get(kind).map(|registration| registration.spec) else {
            log::error!("{}", PoolError::UnregisteredKind(format!("{kind:?}")));
            return 0;
        };

        let target = if spec.unique { spec.prewarm.min(1) } else { spec.prewarm };
        let mut created = 0;
        while self.count(kind) < target {
            let Some(id) = self.create(kind) else { break };
            if let Some(pool) = self.pools.get_mut(kind) {
                pool.idle.push(id);
            }
            created += 1;
        }
        if created > 0 {
            log::info!("Prewarmed pool {:?} with {} instances", kind, created);
        }
        created
    }

    //--- Acquire / Release ------------------------------------------------

    /// Take an instance of `kind` out of its pool
    ///
    /// Reuses an idle instance when there is one, otherwise creates one.
    /// Unique kinds always hand out their single instance. With `show` the
    /// show transition runs and `on_complete` fires when it ends; otherwise
    /// (or for an instant transition) it fires before this returns.
    ///
    /// Returns `None` for unregistered kinds; `on_complete` is then dropped.
    pub fn acquire(
        &mut self,
        kind: K,
        show: bool,
        transition: Transition,
        on_complete: Completion,
    ) -> Option<InstanceId> {
        let Some(unique) = self.registrations.get(&kind).map(|registration| registration.spec.unique) else {
            log::error!("{}", PoolError::UnregisteredKind(format!("{kind:?}")));
            return None;
        };

        if unique {
            if let Some(id) = self.pools.get(&kind).and_then(|pool| pool.instances.first().copied()) {
                match self.slots.get(id).map(|slot| slot.state) {
                    Some(InstanceState::Active) => {
                        on_complete.fire();
                        return Some(id);
                    }
                    Some(InstanceState::Showing) => {
                        if let Some(slot) = self.slots.get_mut(id) {
                            slot.pending.push(on_complete);
                        }
                        return Some(id);
                    }
                    Some(InstanceState::Hiding) => self.finish_hide(id),
                    Some(InstanceState::Idle) | None => {}
                }
            }
        }

        let id = match self.pools.get_mut(&kind).and_then(|pool| pool.idle.pop()) {
            Some(id) => id,
            None => self.create(&kind)?,
        };
        self.start_show(id, show, transition, on_complete);
        Some(id)
    }

    /// Return an instance to its pool
    ///
    /// Runs the hide transition, then moves the instance to the idle set.
    /// Releasing an idle instance only fires `on_complete`; releasing one
    /// that is already hiding fires it when that hide ends.
    pub fn release(&mut self, id: InstanceId, transition: Transition, on_complete: Completion) {
        let Some(slot) = self.slots.get_mut(id) else {
            log::warn!("{}", PoolError::UnknownInstance(id));
            on_complete.fire();
            return;
        };

        match slot.state {
            InstanceState::Idle => {
                log::debug!("Instance {:?} already released", id);
                on_complete.fire();
            }
            InstanceState::Hiding => slot.pending.push(on_complete),
            InstanceState::Showing => {
                // Interrupted show counts as finished
                let interrupted = std::mem::take(&mut slot.pending);
                slot.state = InstanceState::Active;
                for completion in interrupted {
                    completion.fire();
                }
                self.start_hide(id, transition, on_complete);
            }
            InstanceState::Active => self.start_hide(id, transition, on_complete),
        }
    }

    /// Release every in-use instance of `kind`
    ///
    /// `on_complete` fires once, after all hides finished; immediately when
    /// nothing of that kind is in use.
    pub fn release_all_of_kind(&mut self, kind: &K, transition: Transition, on_complete: Completion) {
        let batch = BatchCompletion::new(on_complete);
        for id in self.in_use_ids(kind) {
            self.release(id, transition, batch.member());
        }
        let members = batch.seal();
        log::debug!("Releasing {} instances of {:?}", members, kind);
    }

    /// Release every in-use instance of every kind
    pub fn release_all(&mut self, transition: Transition, on_complete: Completion) {
        let batch = BatchCompletion::new(on_complete);
        let kinds: Vec<K> = self.pools.keys().cloned().collect();
        for kind in &kinds {
            for id in self.in_use_ids(kind) {
                self.release(id, transition, batch.member());
            }
        }
        let members = batch.seal();
        log::debug!("Releasing {} instances across {} pools", members, kinds.len());
    }

    /// Destroy every instance of `kind` and drop its pool
    ///
    /// Pending callbacks fire; the factory stays registered, so a later
    /// acquire starts a fresh pool. Returns the number of destroyed instances.
    pub fn remove_pool(&mut self, kind: &K) -> usize {
        let Some(pool) = self.pools.remove(kind) else {
            return 0;
        };

        let destroyed = pool.instances.len();
        for id in pool.instances {
            if let Some(mut slot) = self.slots.remove(id) {
                slot.object.on_destroy();
                for completion in slot.pending {
                    completion.fire();
                }
            }
        }
        log::info!("Removed pool {:?} ({} instances destroyed)", kind, destroyed);
        destroyed
    }

    /// Remove every pool
    pub fn teardown(&mut self) {
        let kinds: Vec<K> = self.pools.keys().cloned().collect();
        for kind in &kinds {
            self.remove_pool(kind);
        }
    }

    //--- Tick -------------------------------------------------------------

    /// Advance show and hide transitions by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        let mut finished = Vec::new();
        for (id, slot) in &mut self.slots {
            if matches!(slot.state, InstanceState::Showing | InstanceState::Hiding) {
                slot.elapsed += delta_time.max(0.0);
                if slot.elapsed >= slot.transition.total() {
                    finished.push(id);
                }
            }
        }

        for id in finished {
            match self.slots.get(id).map(|slot| slot.state) {
                Some(InstanceState::Showing) => self.finish_show(id),
                Some(InstanceState::Hiding) => self.finish_hide(id),
                _ => {}
            }
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Total instances (in use + idle) of a kind
    pub fn count(&self, kind: &K) -> usize {
        self.pools.get(kind).map_or(0, |pool| pool.instances.len())
    }

    /// Instances of a kind currently out of the idle set
    pub fn active_count(&self, kind: &K) -> usize {
        self.pools.get(kind).map_or(0, Pool::in_use)
    }

    /// Idle instances of a kind
    pub fn idle_count(&self, kind: &K) -> usize {
        self.pools.get(kind).map_or(0, |pool| pool.idle.len())
    }

    /// Diagnostics for a kind's pool
    pub fn stats(&self, kind: &K) -> Option<PoolStats> {
        self.pools.get(kind).map(|pool| pool.stats)
    }

    /// Kinds that currently have a pool
    pub fn pooled_kinds(&self) -> impl Iterator<Item = &K> {
        self.pools.keys()
    }

    /// Borrow an instance
    pub fn get(&self, id: InstanceId) -> Option<&T> {
        self.slots.get(id).map(|slot| &slot.object)
    }

    /// Borrow an instance mutably
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.slots.get_mut(id).map(|slot| &mut slot.object)
    }

    /// Lifecycle state of an instance
    pub fn state(&self, id: InstanceId) -> Option<InstanceState> {
        self.slots.get(id).map(|slot| slot.state)
    }

    /// Whether an instance is out of the idle set
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.state(id).is_some_and(InstanceState::is_in_use)
    }

    /// Kind an instance belongs to
    pub fn kind_of(&self, id: InstanceId) -> Option<&K> {
        self.slots.get(id).map(|slot| &slot.kind)
    }

    //--- Internals --------------------------------------------------------

    fn create(&mut self, kind: &K) -> Option<InstanceId> {
        let registration = self.registrations.get_mut(kind)?;
        let object = (registration.factory)(kind);

        let id = self.slots.insert(Slot {
            kind: kind.clone(),
            object,
            state: InstanceState::Idle,
            transition: Transition::INSTANT,
            elapsed: 0.0,
            pending: Vec::new(),
        });

        let pool = self.pools.entry(kind.clone()).or_insert_with(|| {
            log::info!("Created pool for {:?}", kind);
            Pool::default()
        });
        pool.instances.push(id);
        pool.stats.created += 1;
        log::debug!("Instantiated {:?} #{}", kind, pool.instances.len());
        Some(id)
    }

    fn in_use_ids(&self, kind: &K) -> Vec<InstanceId> {
        self.pools.get(kind).map_or_else(Vec::new, |pool| {
            pool.instances.iter().copied().filter(|&id| self.is_active(id)).collect()
        })
    }

    fn start_show(&mut self, id: InstanceId, show: bool, transition: Transition, on_complete: Completion) {
        let Some(slot) = self.slots.get_mut(id) else {
            on_complete.fire();
            return;
        };

        slot.object.on_acquire();
        let kind = slot.kind.clone();
        let instant = !show || transition.is_instant();
        if show {
            slot.object.on_show(transition);
        }
        let fire_now = if instant {
            slot.state = InstanceState::Active;
            Some(on_complete)
        } else {
            slot.state = InstanceState::Showing;
            slot.transition = transition;
            slot.elapsed = 0.0;
            slot.pending.push(on_complete);
            None
        };

        if let Some(pool) = self.pools.get_mut(&kind) {
            pool.stats.acquired += 1;
            pool.stats.high_water = pool.stats.high_water.max(pool.in_use());
        }

        if let Some(completion) = fire_now {
            completion.fire();
        }
    }

    fn finish_show(&mut self, id: InstanceId) {
        let Some(slot) = self.slots.get_mut(id) else { return };
        slot.state = InstanceState::Active;
        let pending = std::mem::take(&mut slot.pending);
        for completion in pending {
            completion.fire();
        }
    }

    fn start_hide(&mut self, id: InstanceId, transition: Transition, on_complete: Completion) {
        let Some(slot) = self.slots.get_mut(id) else {
            on_complete.fire();
            return;
        };

        slot.object.on_hide(transition);
        slot.state = InstanceState::Hiding;
        slot.transition = transition;
        slot.elapsed = 0.0;
        slot.pending.push(on_complete);

        if transition.is_instant() {
            self.finish_hide(id);
        }
    }

    fn finish_hide(&mut self, id: InstanceId) {
        let Some(slot) = self.slots.get_mut(id) else { return };
        slot.state = InstanceState::Idle;
        slot.object.on_release();
        let pending = std::mem::take(&mut slot.pending);
        let kind = slot.kind.clone();

        if let Some(pool) = self.pools.get_mut(&kind) {
            pool.idle.push(id);
            pool.stats.released += 1;
        }
        for completion in pending {
            completion.fire();
        }
    }
}

impl<K: PoolKind, T: Poolable> Default for PoolRegistry<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
