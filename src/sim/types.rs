//! Core simulation types: configuration and per-tick records.

use std::fmt;

use super::timeslot::Timeslot;

/// Centralized simulation configuration.
///
/// # Examples
///
/// ```
/// use fleet_vpp_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(1_483_315_200, 2, 5, 42);
/// assert_eq!(cfg.steps_per_day(), 288);
/// assert_eq!(cfg.total_steps(), 576);
/// assert_eq!(cfg.step_secs(), 300);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// POSIX timestamp of the first tick.
    pub start: Timeslot,
    /// Number of days to simulate.
    pub days: usize,
    /// Length of one tick in minutes.
    pub timestep_min: u32,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first tick
    /// * `days` - Number of days to simulate (must be > 0)
    /// * `timestep_min` - Tick length in minutes (must be > 0 and divide a day)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `days` is zero or `timestep_min` does not divide a day.
    pub fn new(start: Timeslot, days: usize, timestep_min: u32, seed: u64) -> Self {
        assert!(days > 0, "days must be > 0");
        assert!(
            timestep_min > 0 && 1440 % timestep_min == 0,
            "timestep_min must divide a day"
        );
        Self {
            start,
            days,
            timestep_min,
            seed,
        }
    }

    pub fn steps_per_day(&self) -> usize {
        (1440 / self.timestep_min) as usize
    }

    /// Total number of ticks across all days.
    pub fn total_steps(&self) -> usize {
        self.steps_per_day() * self.days
    }

    pub fn step_secs(&self) -> i64 {
        i64::from(self.timestep_min) * 60
    }

    /// Tick length in hours.
    pub fn dt_hours(&self) -> f32 {
        self.timestep_min as f32 / 60.0
    }
}

/// What the controller did in one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Vehicles that were available and ranked.
    pub ranked: usize,
    pub balancing_evs: usize,
    pub intraday_evs: usize,
    pub regular_evs: usize,
    /// Committed vehicles missing across both plans.
    pub shortfall_evs: usize,
    pub committed_capacity_kw: f32,
    pub bids_submitted: u32,
    pub bids_accepted: u32,
}

impl TickReport {
    /// Vehicles dispatched this tick, by any source.
    pub fn dispatched(&self) -> usize {
        self.balancing_evs + self.intraday_evs + self.regular_evs
    }
}

/// Complete record of one simulation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// POSIX timestamp of the tick.
    pub timestamp: Timeslot,
    /// Vehicles connected and not mid-charge at dispatch.
    pub available_evs: usize,
    pub balancing_evs: usize,
    pub intraday_evs: usize,
    pub regular_evs: usize,
    /// Rentals that left this tick.
    pub rentals_started: usize,
    /// Charger capacity tied up by commitments (kW).
    pub committed_capacity_kw: f32,
    /// Cumulative undeliverable commitment (kWh).
    pub imbalance_kwh: f32,
    /// Cumulative energy dispatched against market plans (kWh).
    pub total_charged_kwh: f32,
    /// Cumulative energy drawn at the tariff (kWh).
    pub charged_regular_kwh: f32,
    pub bids_submitted: u32,
    pub bids_accepted: u32,
    /// Cumulative profit over the tariff baseline (EUR).
    pub profit_eur: f32,
    /// Cumulative revenue of refused rentals (EUR).
    pub lost_rentals_eur: f32,
    /// Cumulative number of refused rentals.
    pub refused_rentals: u32,
    /// Mean state of charge across the fleet (%).
    pub mean_soc_pct: f32,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} | avail={:>3} bal={:>3} intra={:>3} reg={:>3} | \
             committed={:>6.1} kW  imbalance={:>7.2} kWh  vpp={:>8.2} kWh | \
             bids={}/{} | profit={:>8.2} EUR  lost={:.2} EUR | SoC={:.1}%",
            self.timestamp,
            self.available_evs,
            self.balancing_evs,
            self.intraday_evs,
            self.regular_evs,
            self.committed_capacity_kw,
            self.imbalance_kwh,
            self.total_charged_kwh,
            self.bids_accepted,
            self.bids_submitted,
            self.profit_eur,
            self.lost_rentals_eur,
            self.mean_soc_pct,
        )
    }
}
