//! Shared EV fleet: vehicles, batteries, and the rental demand acting on them.

/// Scalar state-of-charge traction battery.
pub mod battery;
/// Seeded rental-request sampling.
pub mod rentals;
pub mod vehicle;

pub use battery::Battery;
pub use rentals::{RentalModel, RentalRequest};
pub use vehicle::{Vehicle, VehicleId, VehicleStatus};

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::timeslot::Timeslot;

/// All vehicles of the operator, keyed by id.
///
/// Iteration is in id order so that every run over the same fleet visits
/// vehicles identically.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    vehicles: BTreeMap<VehicleId, Vehicle>,
}

impl Fleet {
    /// Creates a fleet from an explicit vehicle list.
    pub fn new(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        Self {
            vehicles: vehicles.into_iter().map(|v| (v.id, v)).collect(),
        }
    }

    /// Creates `count` identical vehicles with seeded initial charge levels.
    ///
    /// # Arguments
    ///
    /// * `count` - Number of vehicles
    /// * `capacity_kwh` - Battery capacity of every vehicle
    /// * `eta_charge` - Charging efficiency of every vehicle
    /// * `level_min` / `level_max` - Initial state-of-charge range (%)
    /// * `seed` - Random seed for reproducible initial levels
    ///
    /// # Panics
    ///
    /// Panics if `level_min > level_max` or the levels are outside 0..=100.
    pub fn seeded(
        count: u32,
        capacity_kwh: f32,
        eta_charge: f32,
        level_min: f32,
        level_max: f32,
        seed: u64,
    ) -> Self {
        assert!(level_min <= level_max);
        let mut rng = StdRng::seed_from_u64(seed);

        Self::new((0..count).map(|i| {
            let level = if level_min < level_max {
                rng.random_range(level_min..level_max)
            } else {
                level_min
            };
            Vehicle::new(VehicleId(i), Battery::new(capacity_kwh, level, eta_charge))
        }))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Vehicles parked at a charger.
    pub fn connected_count(&self) -> usize {
        self.vehicles.values().filter(|v| v.is_connected()).count()
    }

    /// Vehicles parked and not mid-charge.
    pub fn available_count(&self) -> usize {
        self.vehicles.values().filter(|v| v.is_available()).count()
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Mean state of charge across all vehicles (%), `0.0` for an empty fleet.
    pub fn mean_level(&self) -> f32 {
        if self.vehicles.is_empty() {
            return 0.0;
        }
        self.vehicles.values().map(|v| v.battery.level).sum::<f32>() / self.vehicles.len() as f32
    }

    /// Sends an idle vehicle on a trip until `until`, draining `energy_kwh`.
    ///
    /// Returns `false` and leaves the vehicle untouched if it is unknown or
    /// not idle.
    pub fn rent(&mut self, id: VehicleId, until: Timeslot, energy_kwh: f32) -> bool {
        match self.vehicles.get_mut(&id) {
            Some(v) if v.is_available() => {
                v.battery.drain(energy_kwh);
                v.status = VehicleStatus::Rented { until };
                true
            }
            _ => false,
        }
    }

    /// Reconnects every vehicle whose trip ended at or before `now`.
    ///
    /// Returns the ids of returned vehicles in id order.
    pub fn return_due(&mut self, now: Timeslot) -> Vec<VehicleId> {
        let mut returned = Vec::new();
        for v in self.vehicles.values_mut() {
            if let VehicleStatus::Rented { until } = v.status
                && until <= now
            {
                v.status = VehicleStatus::Idle;
                returned.push(v.id);
            }
        }
        returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_fleet_is_deterministic() {
        let a = Fleet::seeded(20, 17.6, 0.9, 20.0, 80.0, 5);
        let b = Fleet::seeded(20, 17.6, 0.9, 20.0, 80.0, 5);
        let la: Vec<f32> = a.iter().map(|v| v.battery.level).collect();
        let lb: Vec<f32> = b.iter().map(|v| v.battery.level).collect();
        assert_eq!(la, lb);
        assert!(la.iter().all(|l| (20.0..80.0).contains(l)));
    }

    #[test]
    fn equal_level_bounds_are_allowed() {
        let fleet = Fleet::seeded(3, 10.0, 1.0, 50.0, 50.0, 0);
        assert!(fleet.iter().all(|v| v.battery.level == 50.0));
    }

    #[test]
    fn rent_and_return() {
        let mut fleet = Fleet::seeded(3, 10.0, 1.0, 50.0, 50.0, 0);
        assert!(fleet.rent(VehicleId(1), 1_200, 2.0));
        assert!(!fleet.rent(VehicleId(1), 1_200, 2.0));
        assert_eq!(fleet.connected_count(), 2);
        let level = fleet.get(VehicleId(1)).map_or(f32::NAN, |v| v.battery.level);
        assert!((level - 30.0).abs() < 1e-4, "level {level}");

        assert!(fleet.return_due(900).is_empty());
        assert_eq!(fleet.return_due(1_200), vec![VehicleId(1)]);
        assert_eq!(fleet.connected_count(), 3);
    }

    #[test]
    fn charging_vehicle_cannot_be_rented() {
        let mut fleet = Fleet::seeded(1, 10.0, 1.0, 50.0, 50.0, 0);
        if let Some(v) = fleet.get_mut(VehicleId(0)) {
            v.status = VehicleStatus::Charging;
        }
        assert!(!fleet.rent(VehicleId(0), 600, 1.0));
        assert_eq!(fleet.available_count(), 0);
        assert_eq!(fleet.connected_count(), 1);
    }

    #[test]
    fn mean_level_of_empty_fleet_is_zero() {
        assert_eq!(Fleet::default().mean_level(), 0.0);
    }
}
