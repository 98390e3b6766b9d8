use std::time::{Duration, Instant};

/// Wall clock feeding the render loop. Each `tick` reports the time since the previous one.
pub struct FrameClock {
    start: Instant,
    last: Instant,
    delta: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self { start: now, last: now, delta: Duration::ZERO }
    }

    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Instants earlier than the previous tick yield a zero delta; time never runs backwards.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = now.saturating_duration_since(self.last);
        if now > self.last {
            self.last = now;
        }
        self.delta.as_secs_f32()
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
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
    fn tick_reports_elapsed_since_previous_tick() {
        let origin = Instant::now();
        let mut clock = FrameClock::starting_at(origin);
        let dt = clock.tick_at(origin + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
        let dt = clock.tick_at(origin + Duration::from_millis(48));
        assert!((dt - 0.032).abs() < 1e-6);
        assert!((clock.elapsed_seconds() - 0.048).abs() < 1e-6);
    }

    #[test]
    fn stale_instant_yields_zero_delta() {
        let origin = Instant::now();
        let mut clock = FrameClock::starting_at(origin + Duration::from_millis(10));
        assert_eq!(clock.tick_at(origin), 0.0);
        assert_eq!(clock.delta_seconds(), 0.0);
    }
}
