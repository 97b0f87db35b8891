use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock started, sum of clamped deltas.
    pub elapsed: f64,

    pub now: Instant,

    /// Zero for the first frame after construction or [`FrameClock::reset`].
    pub frame_index: u64,
}

/// Produces [`FrameTime`]s for a render loop.
///
/// Delta time is clamped so a stalled or suspended loop does not hand a huge
/// step to the frame callback.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max, "FrameClock::with_clamps: min {dt_min:?} > max {dt_max:?}");
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts timing, e.g. when a render thread is restarted after a resize.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.elapsed = 0.0;
        self.frame_index = 0;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
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
