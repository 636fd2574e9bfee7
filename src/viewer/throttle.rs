//! Leading + trailing edge throttle driven by an explicit clock

use std::time::{Duration, Instant};

/// Lets at most one value through per `interval`.
///
/// The first call after a quiet period passes immediately. Calls inside the
/// window are collapsed into the latest value, which [`flush`](Self::flush)
/// releases once the window has elapsed.
pub struct Throttle<T> {
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_fire
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Offer a value. Returns it when it should be applied right away.
    pub fn call(&mut self, now: Instant, value: T) -> Option<T> {
        if self.ready(now) {
            self.last_fire = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the trailing value if its window has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
