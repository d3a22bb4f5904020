use std::time::{Duration, Instant};

/// Elapsed-time clock for frame animation.
///
/// Starts on construction. Each [`tick`](Self::tick) returns the time since
/// start, records the delta since the previous tick and counts one frame.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
    last: Instant,
    elapsed: f32,
    delta: f32,
    frames: u64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    fn started_at(start: Instant) -> Self {
        Self {
            start,
            last: start,
            elapsed: 0.0,
            delta: 0.0,
            frames: 0,
        }
    }

    /// Advance the clock to now and return the elapsed seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        // Instants are monotonic, but never let elapsed go backwards.
        let now = now.max(self.last);
        self.delta = now.duration_since(self.last).as_secs_f32();
        self.elapsed = now.duration_since(self.start).as_secs_f32();
        self.last = now;
        self.frames += 1;
        self.elapsed
    }

    /// Seconds since the clock started, as of the last tick.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds between the last two ticks.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn since_start(&self) -> Duration {
        self.last.duration_since(self.start)
    }

    /// Number of ticks so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate() {
        let start = Instant::now();
        let mut clock = Clock::started_at(start);
        assert_eq!(clock.tick_at(start + Duration::from_millis(500)), 0.5);
        assert_eq!(clock.tick_at(start + Duration::from_millis(1250)), 1.25);
        assert!((clock.delta() - 0.75).abs() < 1e-6);
        assert_eq!(clock.since_start(), Duration::from_millis(1250));
    }

    #[test]
    fn one_frame_per_tick() {
        let start = Instant::now();
        let mut clock = Clock::started_at(start);
        assert_eq!(clock.frames(), 0);
        for i in 1..=5u64 {
            clock.tick_at(start + Duration::from_millis(16 * i));
            assert_eq!(clock.frames(), i);
        }
    }

    #[test]
    fn elapsed_never_decreases() {
        let start = Instant::now();
        let mut clock = Clock::started_at(start);
        clock.tick_at(start + Duration::from_secs(2));
        let elapsed = clock.tick_at(start + Duration::from_secs(1));
        assert_eq!(elapsed, 2.0);
        assert_eq!(clock.delta(), 0.0);
    }
}
