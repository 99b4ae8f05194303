//! Frame timing for the host loop.

use std::time::{Duration, Instant};

/// Longest frame the clock will report. A hitch (debugger pause, window drag)
/// otherwise shows up as one enormous delta and teleports everything.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Where frame deltas come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// Wall clock, measured between `update` calls.
    Realtime,
    /// Every frame advances by exactly this step (headless runs, replays).
    FixedStep(Duration),
}

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    mode: ClockMode,
    /// Time of the last frame (realtime mode only).
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed simulated time.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a wall-clock time manager.
    pub fn new() -> Self {
        Self {
            mode: ClockMode::Realtime,
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Create a clock that advances by `step` on every update.
    pub fn fixed(step: Duration) -> Self {
        Self {
            mode: ClockMode::FixedStep(step.min(MAX_FRAME_DELTA)),
            ..Self::new()
        }
    }

    /// Create a fixed-step clock from a rate in Hz. Non-positive rates fall back to 60 Hz.
    pub fn fixed_hz(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            log::warn!("Invalid fixed rate {} Hz, using 60 Hz", hz);
            60.0
        };
        Self::fixed(Duration::from_secs_f64(1.0 / hz))
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        self.delta = match self.mode {
            ClockMode::Realtime => {
                let now = Instant::now();
                let raw = now - self.last_frame;
                self.last_frame = now;
                raw.min(MAX_FRAME_DELTA)
            }
            ClockMode::FixedStep(step) => step,
        };
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Clock mode in use.
    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get the delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get total elapsed time as Duration.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_advances_exactly() {
        let mut t = Time::fixed(Duration::from_millis(20));
        for _ in 0..50 {
            t.update();
        }
        assert_eq!(t.frame_count(), 50);
        assert_eq!(t.elapsed(), Duration::from_secs(1));
        assert!((t.delta_seconds() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn fixed_step_is_capped() {
        let t = Time::fixed(Duration::from_secs(3));
        assert_eq!(t.mode(), ClockMode::FixedStep(MAX_FRAME_DELTA));
    }

    #[test]
    fn fixed_hz_rejects_zero() {
        let mut t = Time::fixed_hz(0.0);
        t.update();
        assert!((t.fps() - 60.0).abs() < 0.01);
    }

    #[test]
    fn realtime_delta_never_exceeds_cap() {
        let mut t = Time::new();
        t.update();
        assert!(t.delta() <= MAX_FRAME_DELTA);
        assert_eq!(t.frame_count(), 1);
    }
}
