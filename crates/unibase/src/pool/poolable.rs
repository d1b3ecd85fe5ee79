//! Pooled instance lifecycle
//!
//! An instance moves through
//!
//! ```text
//! Idle → Showing → Active → Hiding → Idle
//! ```
//!
//! `Showing` and `Hiding` are timed transitions advanced by the registry's
//! `update`; with zero total time the instance skips straight to the next
//! resting state.

use std::fmt;
use std::hash::Hash;

/// Key identifying one pool
///
/// Usually a game-specific enum (`enum Kind { Coin, Star, Popup(Screen) }`)
/// or a string tag. Enum variants with data act as sub-keys.
pub trait PoolKind: Clone + Eq + Hash + fmt::Debug + 'static {
    /// Name used to look the kind up in `PoolSettings`
    fn config_name(&self) -> String {
        format!("{self:?}")
    }
}

impl PoolKind for &'static str {
    fn config_name(&self) -> String {
        (*self).to_string()
    }
}

impl PoolKind for String {
    fn config_name(&self) -> String {
        self.clone()
    }
}

/// Hooks a pooled object receives from its registry
///
/// All hooks default to no-ops.
pub trait Poolable {
    /// Taken out of the idle set
    fn on_acquire(&mut self) {}

    /// Show transition starts
    fn on_show(&mut self, _transition: Transition) {}

    /// Hide transition starts
    fn on_hide(&mut self, _transition: Transition) {}

    /// Returned to the idle set
    fn on_release(&mut self) {}

    /// Destroyed together with its pool
    fn on_destroy(&mut self) {}
}

impl<P: Poolable + ?Sized> Poolable for Box<P> {
    fn on_acquire(&mut self) {
        (**self).on_acquire();
    }

    fn on_show(&mut self, transition: Transition) {
        (**self).on_show(transition);
    }

    fn on_hide(&mut self, transition: Transition) {
        (**self).on_hide(transition);
    }

    fn on_release(&mut self) {
        (**self).on_release();
    }

    fn on_destroy(&mut self) {
        (**self).on_destroy();
    }
}

/// Timing of a show or hide transition, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition {
    /// Length of the animation
    pub duration: f32,
    /// Wait before the animation starts
    pub delay: f32,
}

impl Transition {
    /// No animation, no delay
    pub const INSTANT: Self = Self { duration: 0.0, delay: 0.0 };

    /// Create a transition; negative values count as zero
    pub fn new(duration: f32, delay: f32) -> Self {
        Self { duration: duration.max(0.0), delay: delay.max(0.0) }
    }

    /// Delay plus duration
    pub fn total(&self) -> f32 {
        self.duration.max(0.0) + self.delay.max(0.0)
    }

    /// Whether the transition completes without waiting
    pub fn is_instant(&self) -> bool {
        self.total() <= 0.0
    }
}

/// Where an instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// In the idle set, ready for reuse
    Idle,
    /// Handed out, show transition running
    Showing,
    /// Handed out and fully shown
    Active,
    /// Released, hide transition running
    Hiding,
}

impl InstanceState {
    /// Whether the instance is out of the idle set
    pub fn is_in_use(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_clamps_negative_values() {
        let transition = Transition::new(-1.0, 0.25);
        assert_eq!(transition.duration, 0.0);
        assert_eq!(transition.total(), 0.25);
        assert!(!transition.is_instant());
        assert!(Transition::INSTANT.is_instant());
    }

    #[test]
    fn test_config_name_of_enum_kind() {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        enum Kind {
            Coin,
        }
        impl PoolKind for Kind {}

        assert_eq!(Kind::Coin.config_name(), "Coin");
        assert_eq!("Star".config_name(), "Star");
    }
}
