//! Fixed-timestep clock.
//!
//! Real elapsed time is fed into an accumulator; every whole tick interval in
//! the accumulator becomes one simulation tick. The accumulator is capped at
//! ten intervals so a long stall produces at most ten catch-up ticks; time
//! beyond the cap is dropped, never deferred.
//!
//! While paused the accumulator is frozen: elapsed time is ignored and no
//! ticks are produced, so pausing neither loses nor fabricates ticks.

use crate::fixed::Ticks;
use std::time::Duration;

/// Maximum backlog, in tick intervals.
pub const MAX_BACKLOG_TICKS: u32 = 10;

/// Highest rate whose tick interval is still at least one nanosecond.
pub const MAX_TICKS_PER_SECOND: u32 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("ticks per second must be positive")]
    ZeroTickRate,
    #[error("ticks per second must be at most {max}, got {0}", max = MAX_TICKS_PER_SECOND)]
    TickRateTooHigh(u32),
}

/// Decides how many whole ticks to run for a given amount of real time.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    ticks_per_second: u32,
    tick_interval: Duration,
    accumulator: Duration,
    current_tick: Ticks,
    paused: bool,
    dropped: Duration,
}

impl SimulationClock {
    pub fn new(ticks_per_second: u32) -> Result<Self, ClockError> {
        if ticks_per_second == 0 {
            return Err(ClockError::ZeroTickRate);
        }
        if ticks_per_second > MAX_TICKS_PER_SECOND {
            return Err(ClockError::TickRateTooHigh(ticks_per_second));
        }
        Ok(Self {
            ticks_per_second,
            tick_interval: Duration::from_secs(1) / ticks_per_second,
            accumulator: Duration::ZERO,
            current_tick: 0,
            paused: false,
            dropped: Duration::ZERO,
        })
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Number of the last tick produced. Zero before the first tick.
    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Total real time discarded by the backlog cap.
    pub fn dropped_time(&self) -> Duration {
        self.dropped
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            tracing::info!(tick = self.current_tick, "simulation paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            tracing::info!(tick = self.current_tick, "simulation resumed");
        }
    }

    /// Flip the pause flag. Returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.paused
    }

    /// Add real elapsed time to the accumulator, applying the backlog cap.
    /// Ignored while paused.
    pub fn accumulate(&mut self, elapsed: Duration) {
        if self.paused {
            return;
        }
        let cap = self.tick_interval * MAX_BACKLOG_TICKS;
        let total = self.accumulator.saturating_add(elapsed);
        if total > cap {
            let dropped = total - cap;
            self.dropped = self.dropped.saturating_add(dropped);
            tracing::debug!(?dropped, "tick backlog capped");
            self.accumulator = cap;
        } else {
            self.accumulator = total;
        }
    }

    /// Consume one interval from the accumulator and return the number of the
    /// tick to run, or `None` if a whole interval is not available or the
    /// clock is paused. The pause flag is checked before every tick.
    pub fn next_tick(&mut self) -> Option<Ticks> {
        if self.paused || self.accumulator < self.tick_interval {
            return None;
        }
        self.accumulator -= self.tick_interval;
        self.current_tick += 1;
        Some(self.current_tick)
    }

    /// Produce one tick regardless of the accumulator. `None` while paused.
    pub fn manual_tick(&mut self) -> Option<Ticks> {
        if self.paused {
            return None;
        }
        self.current_tick += 1;
        Some(self.current_tick)
    }

    /// Accumulate `elapsed` and call `on_tick` for every whole tick due.
    /// Returns the number of ticks run.
    pub fn update(&mut self, elapsed: Duration, mut on_tick: impl FnMut(Ticks)) -> u64 {
        self.accumulate(elapsed);
        let mut ran = 0;
        while let Some(tick) = self.next_tick() {
            on_tick(tick);
            ran += 1;
        }
        ran
    }

    /// Fraction of the next tick already accumulated, in `[0, 1)`. For
    /// rendering between ticks only.
    pub fn interpolation(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.tick_interval.as_secs_f64()
    }

    /// Zero the tick counter, accumulator and dropped time. The pause flag is kept.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.current_tick = 0;
        self.dropped = Duration::ZERO;
    }
}
