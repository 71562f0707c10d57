use std::time::{Duration, Instant};

use log::debug;

/// Fixed-interval step scheduler.
///
/// Each enable/disable starts a new generation. Steps are issued tagged with
/// the generation that scheduled them, and a resolved step is only applied
/// while that generation is still the live one.
#[derive(Debug, Clone)]
pub struct AutoPlay {
    interval: Duration,
    enabled: bool,
    generation: u64,
    last_step: Option<Instant>,
}

impl AutoPlay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: false,
            generation: 0,
            last_step: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// First step comes one interval after `now`.
    pub fn enable(&mut self, now: Instant) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.generation += 1;
        self.last_step = Some(now);
        debug!("auto-play on (generation {})", self.generation);
    }

    /// Stops scheduling and invalidates steps still in flight.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.generation += 1;
        self.last_step = None;
        debug!("auto-play off (generation {})", self.generation);
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.enabled {
            self.disable();
        } else {
            self.enable(now);
        }
    }

    /// Returns the generation to tag a new step with when one is due.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        let last = self.last_step?;
        if now.saturating_duration_since(last) < self.interval {
            return None;
        }
        self.last_step = Some(now);
        Some(self.generation)
    }

    /// Time left until the next step, for repaint scheduling.
    pub fn time_to_next(&self, now: Instant) -> Option<Duration> {
        let last = self.last_step.filter(|_| self.enabled)?;
        Some(self.interval.saturating_sub(now.saturating_duration_since(last)))
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.enabled && generation == self.generation
    }
}
