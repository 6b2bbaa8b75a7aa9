//! Frame timing.

use std::time::{Duration, Instant};

/// Delta and total time of the render loop, excluding paused intervals.
#[derive(Debug)]
pub struct GameTimer {
    base: Instant,
    prev: Instant,
    paused: Duration,
    stopped_at: Option<Instant>,
    delta: Duration,
}

impl GameTimer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            base: now,
            prev: now,
            paused: Duration::ZERO,
            stopped_at: None,
            delta: Duration::ZERO,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    /// Advances to `now`. A stopped timer, or a `now` earlier than the
    /// previous tick, yields a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> Duration {
        if self.stopped_at.is_some() {
            self.delta = Duration::ZERO;
            return self.delta;
        }

        self.delta = now.saturating_duration_since(self.prev);
        self.prev = now;
        self.delta
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, now: Instant) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(now);
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        if let Some(stopped_at) = self.stopped_at.take() {
            self.paused += now.saturating_duration_since(stopped_at);
            self.prev = now;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn total_time(&self) -> Duration {
        let end = self.stopped_at.unwrap_or(self.prev);
        end.saturating_duration_since(self.base)
            .saturating_sub(self.paused)
    }

    pub fn total_secs(&self) -> f32 {
        self.total_time().as_secs_f32()
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStatsSample {
    pub fps: f32,
    pub ms_per_frame: f32,
}

#[derive(Debug, Default)]
pub struct FrameStats {
    frames: u32,
    window_start: Duration,
    last: Option<FrameStatsSample>,
}

impl FrameStats {
    /// Counts one frame at `total_time`. Returns a new sample whenever a
    /// full second has elapsed since the last one.
    pub fn record(&mut self, total_time: Duration) -> Option<FrameStatsSample> {
        self.frames += 1;

        let elapsed = total_time.saturating_sub(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        let sample = FrameStatsSample {
            fps,
            ms_per_frame: 1000.0 / fps,
        };

        self.frames = 0;
        self.window_start = total_time;
        self.last = Some(sample);

        Some(sample)
    }

    pub fn last(&self) -> Option<FrameStatsSample> {
        self.last
    }
}
