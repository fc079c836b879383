//! Frame timing and delta time.
//!
//! The [`Time`] clock is owned by the [`Runner`](crate::runner::Runner) and
//! updated at the start of each frame. Its delta is what the runner hands to
//! [`Schedule::tick`](crate::ecs::Schedule::tick).

use std::time::{Duration, Instant};

/// Frame clock. The first delta is measured from when the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct Time {
    /// When the clock was created.
    startup: Instant,
    /// When the current frame started.
    frame_start: Instant,
    /// Duration of the previous frame.
    delta: Duration,
    /// Total time since startup.
    elapsed: Duration,
    /// Frame counter.
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call at the start of each frame to update timing.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub(crate) fn update_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        self.elapsed = now.saturating_duration_since(self.startup);
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds, the unit systems receive.
    pub fn delta_secs(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    /// When the current frame started.
    pub fn frame_start(&self) -> Instant {
        self.frame_start
    }

    /// Total elapsed time since startup.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Number of frames so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f64 {
        if self.delta.as_secs_f64() > 0.0 {
            1.0 / self.delta.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_measures_delta_from_previous_frame() {
        let mut time = Time::new();
        let start = time.frame_start();
        time.update_at(start + Duration::from_millis(20));
        time.update_at(start + Duration::from_millis(50));

        assert_eq!(time.delta(), Duration::from_millis(30));
        assert_eq!(time.elapsed(), Duration::from_millis(50));
        assert_eq!(time.frame_count(), 2);
        assert!((time.fps() - 1.0 / 0.030).abs() < 1e-6);
    }

    #[test]
    fn fps_is_zero_before_first_frame() {
        let time = Time::new();
        assert_eq!(time.fps(), 0.0);
        assert_eq!(time.delta_secs(), 0.0);
    }
}
