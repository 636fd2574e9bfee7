//! Frame timing for the performance counter

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Frame-rate statistics over a trailing window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FpsWindow {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

/// Snapshot of the performance counter
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FrameStats {
    /// Frames per second, refreshed once per second
    pub fps: f32,
    /// Duration of the last tick in milliseconds
    pub frame_ms: f32,
    /// Rolling statistics over the last second
    pub last_second: FpsWindow,
    /// Total ticks observed
    pub frame_count: u64,
    /// Ticks that issued a render call
    pub rendered_frames: u64,
}

/// Counts ticks and rendered frames, Stats.js style.
///
/// The counter is fed an explicit `Instant` so the viewer can be driven by a
/// synthetic clock.
pub struct FrameTimer {
    last_frame: Option<Instant>,
    delta: Duration,
    frame_count: u64,
    rendered_frames: u64,
    fps_timer: Option<Instant>,
    fps: f32,
    fps_frame_count: u32,
    /// (timestamp, frame_time_secs) for the trailing window
    frame_history: VecDeque<(Instant, f32)>,
}

const HISTORY: Duration = Duration::from_secs(1);

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta: Duration::ZERO,
            frame_count: 0,
            rendered_frames: 0,
            fps_timer: None,
            fps: 0.0,
            fps_frame_count: 0,
            frame_history: VecDeque::new(),
        }
    }

    /// Record a tick at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);
        self.frame_count += 1;
        self.fps_frame_count += 1;

        if self.frame_count > 1 {
            self.frame_history.push_back((now, self.delta.as_secs_f32()));
        }
        while let Some(&(timestamp, _)) = self.frame_history.front() {
            if now.saturating_duration_since(timestamp) > HISTORY {
                self.frame_history.pop_front();
            } else {
                break;
            }
        }

        let fps_timer = *self.fps_timer.get_or_insert(now);
        let fps_elapsed = now.saturating_duration_since(fps_timer);
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = Some(now);
        }
    }

    /// Record a tick at the current wall-clock time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Count a tick that actually rendered.
    pub fn record_render(&mut self) {
        self.rendered_frames += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            fps: self.fps,
            frame_ms: self.delta.as_secs_f32() * 1000.0,
            last_second: self.window_stats(),
            frame_count: self.frame_count,
            rendered_frames: self.rendered_frames,
        }
    }

    fn window_stats(&self) -> FpsWindow {
        let mut count = 0;
        let mut total = 0.0f32;
        let mut min_fps = f32::INFINITY;
        let mut max_fps = 0.0f32;

        for &(_, frame_time) in &self.frame_history {
            count += 1;
            total += frame_time;
            let fps = if frame_time > 0.0 { 1.0 / frame_time } else { 0.0 };
            min_fps = min_fps.min(fps);
            max_fps = max_fps.max(fps);
        }

        if count == 0 {
            return FpsWindow::default();
        }

        FpsWindow {
            avg: if total > 0.0 { count as f32 / total } else { 0.0 },
            min: min_fps,
            max: max_fps,
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
