//! Fixed-interval flush scheduling driven by simulated time.

use std::time::Duration;

/// Interval between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Accumulates simulated time and reports when a flush is due.
///
/// At most one flush is reported per call to [`FlushCadence::advance`]; time
/// beyond the due interval keeps only its phase, so a long frame never queues
/// a burst of flushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushCadence {
    interval: Duration,
    accumulator: Duration,
}

impl FlushCadence {
    /// Creates a cadence with the provided interval. A zero interval flushes on every advance.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
        }
    }

    /// Interval between flushes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Simulated time banked toward the next flush.
    #[must_use]
    pub const fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Banks `dt` and reports whether a flush is due.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if dt.is_zero() {
            return false;
        }
        if self.interval.is_zero() {
            return true;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        if self.accumulator < self.interval {
            return false;
        }

        let phase = self.accumulator.as_nanos() % self.interval.as_nanos();
        self.accumulator = Duration::from_nanos(phase as u64);
        true
    }

    /// Discards banked time.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

impl Default for FlushCadence {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}
