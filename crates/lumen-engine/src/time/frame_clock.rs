use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    pub now: Instant,

    pub frame_index: u64,

    /// Milliseconds since the clock started, saturating at `u32::MAX`.
    ///
    /// This is the counter the post-process pass animates with.
    pub elapsed_ms: u32,
}

/// Per-window frame clock.
///
/// `dt` is clamped so a debugger pause or a minimized window does not produce
/// a huge step; `elapsed_ms` is not clamped and keeps wall-clock time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts `dt` measurement without touching `elapsed_ms`.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    fn reset_at(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let elapsed = now.saturating_duration_since(self.start).as_millis();
        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
            elapsed_ms: u32::try_from(elapsed).unwrap_or(u32::MAX),
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_tracks_wall_time_and_dt_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.start;

        let first = clock.tick_at(start + Duration::from_millis(10));
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.elapsed_ms, 10);

        let second = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(second.frame_index, 1);
        assert_eq!(second.elapsed_ms, 3000);
        assert_eq!(second.dt, 0.25);
    }

    #[test]
    fn tiny_steps_use_the_minimum_dt() {
        let mut clock = FrameClock::new();
        let start = clock.start;
        clock.tick_at(start);
        let ft = clock.tick_at(start);
        assert_eq!(ft.dt, Duration::from_micros(100).as_secs_f32());
    }

    #[test]
    fn reset_keeps_elapsed() {
        let mut clock = FrameClock::new();
        let start = clock.start;
        clock.tick_at(start + Duration::from_millis(40));
        clock.reset_at(start + Duration::from_millis(1040));

        let ft = clock.tick_at(start + Duration::from_millis(1050));
        assert_eq!(ft.elapsed_ms, 1050);
        assert_eq!(ft.dt, Duration::from_millis(10).as_secs_f32());
    }
}
