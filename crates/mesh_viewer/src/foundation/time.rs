//! Time management utilities

use std::time::{Duration, Instant};

/// Frame timer measuring time since the render loop started
///
/// Total time is read from the start instant rather than accumulated, so it
/// never drifts from the wall clock.
pub struct Timer {
    start: Instant,
    last_frame: Instant,
    delta_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds since the timer was created, as of the last `update`
    pub fn total_time(&self) -> f64 {
        self.last_frame.duration_since(self.start).as_secs_f64()
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f64 {
        let total = self.total_time();
        if total > 0.0 {
            self.frame_count as f64 / total
        } else {
            0.0
        }
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Create a stopwatch and start it immediately
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_frames() {
        let mut timer = Timer::new();
        assert_eq!(timer.frame_count(), 0);
        assert_eq!(timer.total_time(), 0.0);

        timer.update();
        timer.update();

        assert_eq!(timer.frame_count(), 2);
        assert!(timer.total_time() >= 0.0);
        assert!(timer.delta_time() >= 0.0);
    }

    #[test]
    fn test_total_time_is_monotonic() {
        let mut timer = Timer::new();
        timer.update();
        let first = timer.total_time();
        std::thread::sleep(Duration::from_millis(2));
        timer.update();
        assert!(timer.total_time() > first);
    }
}
