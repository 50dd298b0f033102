use super::timeslot::Timeslot;

/// A simulation clock producing evenly spaced POSIX timestamps.
///
/// The `Clock` provides methods to advance time step-by-step or run
/// a function at each tick until completion.
///
/// # Examples
///
/// ```
/// use fleet_vpp_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(1_000, 300, 3);
/// let mut ticks = Vec::new();
///
/// clock.run(|now| ticks.push(now));
/// assert_eq!(ticks, vec![1_000, 1_300, 1_600]);
/// ```
pub struct Clock {
    /// Timestamp of the first tick
    start: Timeslot,
    /// Seconds between ticks
    step_secs: i64,
    /// Ticks already produced
    current: usize,
    /// Total ticks to produce
    total: usize,
}

impl Clock {
    /// Creates a new clock.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first tick
    /// * `step_secs` - Seconds between ticks (must be > 0)
    /// * `total` - The total number of ticks the clock will produce
    ///
    /// # Panics
    ///
    /// Panics if `step_secs` is not positive.
    pub fn new(start: Timeslot, step_secs: i64, total: usize) -> Self {
        assert!(step_secs > 0, "step_secs must be > 0");
        Self {
            start,
            step_secs,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(now)` - The timestamp of the tick
    /// * `None` - If the clock has produced all its ticks
    pub fn tick(&mut self) -> Option<Timeslot> {
        if self.current < self.total {
            let now = self.start + self.current as i64 * self.step_secs;
            self.current += 1;
            Some(now)
        } else {
            None
        }
    }

    /// Runs a function for each remaining tick.
    ///
    /// # Arguments
    ///
    /// * `f` - A function that takes the tick's timestamp as an argument
    pub fn run(&mut self, mut f: impl FnMut(Timeslot)) {
        while let Some(now) = self.tick() {
            f(now);
        }
    }

    /// Ticks left to produce.
    pub fn remaining(&self) -> usize {
        self.total - self.current
    }
}
