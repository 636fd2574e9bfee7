//! On-demand rendering: render continuously only while armed.

use std::time::{Duration, Instant};

/// What a tick should do about rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    /// Armed: render this frame.
    Render,
    /// The disarm deadline passed: render once more, then go idle.
    FinalRender,
    /// Nothing changed: skip rendering.
    Idle,
}

impl TickDecision {
    pub fn renders(self) -> bool {
        !matches!(self, TickDecision::Idle)
    }
}

/// Armed/disarmed state with a single pending disarm deadline.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    armed: bool,
    disarm_at: Option<Instant>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render continuously for `window` from `now`. Replaces any earlier
    /// deadline, even a later one.
    pub fn arm(&mut self, now: Instant, window: Duration) {
        self.armed = true;
        self.disarm_at = Some(now + window);
    }

    pub fn poll(&mut self, now: Instant) -> TickDecision {
        if !self.armed {
            return TickDecision::Idle;
        }
        match self.disarm_at {
            Some(deadline) if now >= deadline => {
                self.armed = false;
                self.disarm_at = None;
                TickDecision::FinalRender
            }
            _ => TickDecision::Render,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.disarm_at
    }
}
