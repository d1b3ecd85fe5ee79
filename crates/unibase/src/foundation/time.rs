//! Time management utilities

use std::time::Instant;

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer from the wall clock (call once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed.as_secs_f32());
    }

    /// Advance the timer by a fixed amount instead of reading the clock
    ///
    /// Used by headless loops and tests that need deterministic frames.
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time.max(0.0);
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-cadence accumulator
///
/// Frame deltas are fed in with [`FixedStep::accumulate`]; each call to
/// [`FixedStep::next_step`] hands out one `interval` worth of time until
/// the accumulated time is used up.
#[derive(Debug, Clone)]
pub struct FixedStep {
    interval: f32,
    accumulated: f32,
}

impl FixedStep {
    /// Create a new accumulator ticking every `interval` seconds
    ///
    /// Non-positive intervals degrade to "one step per accumulate call".
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            accumulated: 0.0,
        }
    }

    /// Tick interval in seconds
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Add elapsed frame time
    pub fn accumulate(&mut self, delta_time: f32) {
        if self.interval <= 0.0 {
            self.accumulated = delta_time.max(0.0);
        } else {
            self.accumulated += delta_time.max(0.0);
        }
    }

    /// Consume one step if enough time has accumulated
    pub fn next_step(&mut self) -> Option<f32> {
        if self.interval <= 0.0 {
            return (self.accumulated > 0.0).then(|| std::mem::take(&mut self.accumulated));
        }
        if self.accumulated + f32::EPSILON >= self.interval {
            self.accumulated = (self.accumulated - self.interval).max(0.0);
            Some(self.interval)
        } else {
            None
        }
    }

    /// Drop any partially accumulated time
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
