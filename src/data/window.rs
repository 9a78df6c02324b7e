//! The measuring window opened by `START_MEASUREMENT`.

use std::time::{Duration, Instant};

/// Default length of a measuring window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Default delay before channel selection is allowed.
pub const DEFAULT_SELECT_DELAY: Duration = Duration::from_secs(2);

/// Tracks whether the operator is currently measuring.
#[derive(Debug, Clone)]
pub struct MeasuringWindow {
    length: Duration,
    select_delay: Duration,
    started: Option<Instant>,
}

impl Default for MeasuringWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_SELECT_DELAY)
    }
}

impl MeasuringWindow {
    pub fn new(length: Duration, select_delay: Duration) -> Self {
        Self {
            length,
            select_delay,
            started: None,
        }
    }

    /// Open the window. Restarting an open window resets its clock.
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn is_measuring(&self) -> bool {
        self.started.is_some()
    }

    /// Channel buttons unlock a short while after the start command.
    pub fn can_select(&self, now: Instant) -> bool {
        match self.started {
            Some(started) => now.saturating_duration_since(started) >= self.select_delay,
            None => false,
        }
    }

    /// Time left before the window expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let started = self.started?;
        Some(self.length.saturating_sub(now.saturating_duration_since(started)))
    }

    /// Expire the window if its time is up. Returns true on the transition.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.started {
            Some(started) if now.saturating_duration_since(started) >= self.length => {
                self.started = None;
                true
            }
            _ => false,
        }
    }
}
