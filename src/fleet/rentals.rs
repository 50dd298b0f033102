use chrono::{FixedOffset, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{Fleet, VehicleId};
use crate::sim::timeslot::{SLOT_SECS, Timeslot, local_time};

/// Daytime hours (local, half-open) with elevated rental demand.
const DAY_HOURS: std::ops::Range<u32> = 7..21;
const DAY_WEIGHT: f64 = 1.5;
const NIGHT_WEIGHT: f64 = 0.3;

/// A customer asking to take a parked vehicle on a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalRequest {
    pub vehicle: VehicleId,
    /// Trip length, a whole number of simulation slots.
    pub trip_minutes: u32,
    /// Energy the trip will drain from the battery (kWh).
    pub energy_kwh: f32,
    /// Revenue the operator earns if the rental goes ahead (EUR).
    pub revenue_eur: f32,
}

impl RentalRequest {
    /// Time at which the vehicle is back at a charger.
    pub fn return_at(&self, now: Timeslot) -> Timeslot {
        now + i64::from(self.trip_minutes) * 60
    }
}

/// Seeded generator of rental demand.
///
/// Every tick, each idle vehicle with enough charge receives a request with
/// probability `request_prob`, scaled up during the day and down at night.
#[derive(Debug, Clone)]
pub struct RentalModel {
    /// Base per-vehicle, per-tick request probability.
    pub request_prob: f64,

    /// Shortest sampled trip (minutes).
    pub trip_minutes_min: u32,

    /// Longest sampled trip (minutes).
    pub trip_minutes_max: u32,

    /// Average power drawn while driving (kW).
    pub consumption_kw: f32,

    /// Rental price (EUR per minute).
    pub revenue_eur_per_min: f32,

    /// Vehicles below this state of charge (%) are not offered.
    pub min_level_pct: f32,

    rng: StdRng,
}

impl RentalModel {
    /// Creates a rental model.
    ///
    /// # Arguments
    ///
    /// * `request_prob` - Base per-vehicle, per-tick request probability (0.0 to 1.0)
    /// * `trip_minutes_min` - Shortest trip in minutes (must be > 0)
    /// * `trip_minutes_max` - Longest trip in minutes
    /// * `consumption_kw` - Average driving consumption in kW
    /// * `revenue_eur_per_min` - Rental price per minute
    /// * `min_level_pct` - Minimum state of charge for a vehicle to be offered
    /// * `seed` - Random seed for reproducible demand
    ///
    /// # Panics
    ///
    /// Panics if the probability or trip range is invalid.
    pub fn new(
        request_prob: f64,
        trip_minutes_min: u32,
        trip_minutes_max: u32,
        consumption_kw: f32,
        revenue_eur_per_min: f32,
        min_level_pct: f32,
        seed: u64,
    ) -> Self {
        assert!((0.0..=1.0).contains(&request_prob));
        assert!(trip_minutes_min > 0);
        assert!(trip_minutes_max >= trip_minutes_min);
        assert!(consumption_kw >= 0.0);

        Self {
            request_prob,
            trip_minutes_min,
            trip_minutes_max,
            consumption_kw,
            revenue_eur_per_min,
            min_level_pct,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A model that never produces requests.
    pub fn disabled() -> Self {
        Self::new(0.0, 5, 5, 0.0, 0.0, 0.0, 0)
    }

    /// Samples this tick's requests, in vehicle id order.
    pub fn sample(&mut self, now: Timeslot, offset: FixedOffset, fleet: &Fleet) -> Vec<RentalRequest> {
        if self.request_prob <= 0.0 {
            return Vec::new();
        }

        let weight = match local_time(now, offset) {
            Some(dt) if DAY_HOURS.contains(&dt.hour()) => DAY_WEIGHT,
            _ => NIGHT_WEIGHT,
        };
        let p = (self.request_prob * weight).clamp(0.0, 1.0);

        let mut requests = Vec::new();
        for v in fleet.iter() {
            if !v.is_available() || v.battery.level < self.min_level_pct {
                continue;
            }
            if !self.rng.random_bool(p) {
                continue;
            }

            let raw = self.rng.random_range(self.trip_minutes_min..=self.trip_minutes_max);
            let trip_minutes = round_up_to_slot(raw);
            requests.push(RentalRequest {
                vehicle: v.id,
                trip_minutes,
                energy_kwh: self.consumption_kw * trip_minutes as f32 / 60.0,
                revenue_eur: self.revenue_eur_per_min * trip_minutes as f32,
            });
        }
        requests
    }
}

fn round_up_to_slot(minutes: u32) -> u32 {
    let slot = (SLOT_SECS / 60) as u32;
    minutes.div_ceil(slot) * slot
}
