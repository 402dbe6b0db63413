//! Spin animation pacing: a decelerating slot-machine tick sequence.
//!
//! Purely cosmetic. The landing index is chosen before the spin starts and the
//! cursor is snapped to it on the last tick.

use rand::Rng;
use std::time::Duration;

/// Pacing parameters for one spin.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinTiming {
    /// Delay before the first tick and between early ticks.
    pub initial_interval: Duration,
    /// Inclusive lower bound for the number of ticks.
    pub min_steps: u32,
    /// Exclusive upper bound for the number of ticks.
    pub max_steps: u32,
    /// Fraction of ticks after which every tick slows down.
    pub slowdown_ratio: f64,
    /// Added to the interval on each tick past the slowdown point.
    pub slowdown_step: Duration,
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            min_steps: 50,
            max_steps: 80,
            slowdown_ratio: 0.7,
            slowdown_step: Duration::from_millis(20),
        }
    }
}

/// What to do after a tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpinStep {
    /// Schedule the next tick after this delay.
    Continue(Duration),
    /// That was the last tick.
    Landed,
}

/// Tick counter and current interval for one spin.
#[derive(Clone, Debug)]
pub struct SpinAnimator {
    total_steps: u32,
    taken: u32,
    interval: Duration,
    slowdown_after: f64,
    slowdown_step: Duration,
}

impl SpinAnimator {
    pub fn new<R: Rng + ?Sized>(timing: &SpinTiming, rng: &mut R) -> Self {
        let total_steps = if timing.max_steps > timing.min_steps {
            rng.gen_range(timing.min_steps..timing.max_steps)
        } else {
            timing.min_steps
        };
        Self {
            total_steps: total_steps.max(1),
            taken: 0,
            interval: timing.initial_interval,
            slowdown_after: f64::from(total_steps) * timing.slowdown_ratio,
            slowdown_step: timing.slowdown_step,
        }
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn steps_taken(&self) -> u32 {
        self.taken
    }

    /// Current delay until the next tick.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consume one tick.
    pub fn tick(&mut self) -> SpinStep {
        self.taken += 1;
        if f64::from(self.taken) > self.slowdown_after {
            self.interval += self.slowdown_step;
        }
        if self.taken >= self.total_steps {
            SpinStep::Landed
        } else {
            SpinStep::Continue(self.interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn step_count_stays_in_range() {
        let timing = SpinTiming::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let spin = SpinAnimator::new(&timing, &mut rng);
            assert!((50..80).contains(&spin.total_steps()));
        }
    }

    #[test]
    fn slows_down_only_after_seventy_percent() {
        let timing = SpinTiming {
            min_steps: 10,
            max_steps: 10,
            ..SpinTiming::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut spin = SpinAnimator::new(&timing, &mut rng);
        let mut delays = Vec::new();
        while let SpinStep::Continue(d) = spin.tick() {
            delays.push(d.as_millis());
        }
        assert_eq!(spin.steps_taken(), 10);
        // ticks 1..=7 keep 50ms, 8 and 9 slow down by 20ms each
        assert_eq!(delays, vec![50, 50, 50, 50, 50, 50, 50, 70, 90]);
    }
}
