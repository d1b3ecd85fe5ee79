//! Load progress aggregation
//!
//! Turns the bursty progress reported by the engine into a rate-limited,
//! monotonically non-decreasing ratio for progress bars.

use crate::core::config::SceneLoaderConfig;

/// Smoothed progress state for one transition
#[derive(Debug, Clone)]
pub struct LoadProgressAggregator {
    current: f32,
    target: f32,
    /// Gain per second; `None` shows the target without smoothing
    rate: Option<f32>,
    rescale: f32,
    epsilon: f32,
}

impl LoadProgressAggregator {
    /// Create an aggregator from loader configuration
    ///
    /// A multiplier that is not a positive number disables smoothing, so the
    /// displayed value always reaches its target.
    pub fn new(config: &SceneLoaderConfig) -> Self {
        let multiplier = config.progress_multiplier;
        let rate = if multiplier.is_finite() && multiplier > 0.0 {
            Some(multiplier)
        } else {
            log::warn!("Progress multiplier {} is not positive, smoothing disabled", multiplier);
            None
        };
        Self {
            current: 0.0,
            target: 0.0,
            rate,
            rescale: if config.progress_rescale > 0.0 { config.progress_rescale } else { 1.0 },
            epsilon: config.progress_epsilon.max(0.0),
        }
    }

    /// Start a new transition at zero
    pub fn reset(&mut self) {
        self.current = 0.0;
        self.target = 0.0;
    }

    /// Feed the raw aggregate progress of the handle group
    ///
    /// The value is rescaled by the configured ceiling and clamped to
    /// `[0, 1]`. The target never moves backwards within a transition.
    pub fn set_target(&mut self, raw_progress: f32) -> f32 {
        let scaled = (raw_progress / self.rescale).clamp(0.0, 1.0);
        if scaled > self.target {
            self.target = scaled;
        }
        self.target
    }

    /// Move `current` toward `target` by at most `multiplier * delta_time`
    ///
    /// Returns the new value when it changed, i.e. when a progress event is
    /// due for this tick.
    pub fn step(&mut self, delta_time: f32) -> Option<f32> {
        if self.is_caught_up() {
            // Snap the last sub-epsilon gap so the bar ends exactly on target.
            if self.current < self.target {
                self.current = self.target;
                return Some(self.current);
            }
            return None;
        }

        let mut next = match self.rate {
            Some(rate) => (self.current + rate * delta_time.max(0.0)).min(self.target),
            None => self.target,
        };
        if self.target - next <= self.epsilon {
            next = self.target;
        }

        if next > self.current {
            self.current = next;
            Some(self.current)
        } else {
            None
        }
    }

    /// Whether the displayed value has reached the target
    pub fn is_caught_up(&self) -> bool {
        self.target - self.current <= self.epsilon
    }

    /// Displayed progress
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Progress being approached
    pub fn target(&self) -> f32 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn aggregator(multiplier: f32) -> LoadProgressAggregator {
        LoadProgressAggregator::new(&SceneLoaderConfig::default().with_progress_multiplier(multiplier))
    }

    #[test]
    fn test_rescales_engine_ceiling_to_one() {
        let mut progress = aggregator(1.0);
        assert_relative_eq!(progress.set_target(0.9), 1.0);
        assert_relative_eq!(progress.set_target(0.45), 1.0);
    }

    #[test]
    fn test_step_is_rate_limited() {
        let mut progress = aggregator(2.0);
        progress.set_target(0.9);

        assert_relative_eq!(progress.step(0.1).unwrap(), 0.2, epsilon = 1e-6);
        assert_relative_eq!(progress.step(0.1).unwrap(), 0.4, epsilon = 1e-6);
        assert!(!progress.is_caught_up());
    }

    #[test]
    fn test_stops_emitting_once_caught_up() {
        let mut progress = aggregator(10.0);
        progress.set_target(0.45);

        assert_relative_eq!(progress.step(1.0).unwrap(), 0.5, epsilon = 1e-6);
        assert!(progress.is_caught_up());
        assert!(progress.step(1.0).is_none());
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut progress = aggregator(1.0);
        let mut last = 0.0;
        for raw in [0.3, 0.1, 0.6, 0.2, 0.9, 0.0] {
            progress.set_target(raw);
            for _ in 0..5 {
                progress.step(0.05);
                assert!(progress.current() >= last);
                last = progress.current();
            }
        }
    }

    #[test]
    fn test_non_positive_multiplier_jumps_to_target() {
        for multiplier in [0.0, -1.0, f32::NAN] {
            let mut progress = aggregator(multiplier);
            progress.set_target(0.45);

            assert_relative_eq!(progress.step(0.02).unwrap(), 0.5, epsilon = 1e-6);
            assert!(progress.is_caught_up());
        }
    }

    #[test]
    fn test_reset_starts_from_zero() {
        let mut progress = aggregator(100.0);
        progress.set_target(0.9);
        progress.step(1.0);
        progress.reset();

        assert_eq!(progress.current(), 0.0);
        assert_eq!(progress.target(), 0.0);
        assert!(progress.is_caught_up());
    }
}
