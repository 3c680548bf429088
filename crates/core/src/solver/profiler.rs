//! Timing helpers for frame steps and compositing.
//!
//! Provides RAII-style profiling scopes and a rolling frame timer.
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::trace;

/// Times the enclosing block.
///
/// The elapsed time is logged at trace level when dropped.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    /// Start timing a named section.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Milliseconds since the scope was opened.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        trace!("{} took {:.3} ms", self.name, self.elapsed_ms());
    }
}

/// Number of frames averaged by [`FrameTimer`]
const FRAME_WINDOW: usize = 60;

/// Rolling frame timer
///
/// Keeps the last [`FRAME_WINDOW`] frame durations.
pub struct FrameTimer {
    frames: VecDeque<Duration>,
}

impl FrameTimer {
    /// Empty timer.
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(FRAME_WINDOW),
        }
    }

    /// Records one frame duration.
    pub fn record(&mut self, frame: Duration) {
        if self.frames.len() == FRAME_WINDOW {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Gets the last recorded frame time in milliseconds.
    pub fn last_frame_time_ms(&self) -> f64 {
        self.frames
            .back()
            .map_or(0.0, |frame| frame.as_secs_f64() * 1000.0)
    }

    /// Mean frame time over the window in milliseconds.
    pub fn average_frame_time_ms(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        let total: Duration = self.frames.iter().sum();
        total.as_secs_f64() * 1000.0 / self.frames.len() as f64
    }

    /// Number of frames currently in the window.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
