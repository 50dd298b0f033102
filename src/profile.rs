//! Seeded synthetic daily profiles standing in for historical series.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::timeslot::Timeslot;

/// A sinusoidal daily profile with Gaussian noise and optional clamping.
///
/// Used to synthesize clearing-price tables and fleet-capacity series when
/// no historical CSV is configured.
///
/// # Examples
///
/// ```
/// use fleet_vpp_sim::profile::DailyProfile;
///
/// let mut prices = DailyProfile::new(35.0, 15.0, 0.0, 0.0, 42);
/// let series = prices.series(0, 900, 96);
/// assert_eq!(series.len(), 96);
/// ```
#[derive(Debug, Clone)]
pub struct DailyProfile {
    /// Mean value over a day.
    pub base: f32,

    /// Amplitude of the daily sinusoid.
    pub amp: f32,

    /// Phase offset in radians (0 = rising through the mean at midnight).
    pub phase_rad: f32,

    /// Standard deviation of the additive Gaussian noise.
    pub noise_std: f32,

    /// Lower bound applied after noise.
    pub min: f32,

    /// Upper bound applied after noise.
    pub max: f32,

    rng: StdRng,
}

impl DailyProfile {
    /// Creates an unbounded profile.
    ///
    /// # Arguments
    ///
    /// * `base` - Mean value over a day
    /// * `amp` - Amplitude of the daily sinusoid
    /// * `phase_rad` - Phase offset in radians
    /// * `noise_std` - Standard deviation of the Gaussian noise
    /// * `seed` - Random seed for reproducible noise
    pub fn new(base: f32, amp: f32, phase_rad: f32, noise_std: f32, seed: u64) -> Self {
        Self {
            base,
            amp,
            phase_rad,
            noise_std: noise_std.max(0.0),
            min: f32::MIN,
            max: f32::MAX,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Restricts generated values to `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn clamped(mut self, min: f32, max: f32) -> Self {
        assert!(min <= max);
        self.min = min;
        self.max = max;
        self
    }

    /// Value at `day_fraction` of a day (`0.0..1.0`).
    pub fn value_at(&mut self, day_fraction: f32) -> f32 {
        let angle = 2.0 * std::f32::consts::PI * day_fraction + self.phase_rad;
        let v = self.base + self.amp * angle.sin() + gaussian_noise(&mut self.rng, self.noise_std);
        v.clamp(self.min, self.max)
    }

    /// Generates `count` points spaced `step_secs` apart starting at `start`.
    pub fn series(&mut self, start: Timeslot, step_secs: i64, count: usize) -> BTreeMap<Timeslot, f32> {
        (0..count as i64)
            .map(|i| {
                let t = start + i * step_secs;
                let day_fraction = t.rem_euclid(86_400) as f32 / 86_400.0;
                (t, self.value_at(day_fraction))
            })
            .collect()
    }
}

/// Draws zero-mean Gaussian noise using the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}
