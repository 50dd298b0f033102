use std::fmt;

use super::battery::Battery;
use crate::sim::timeslot::Timeslot;

/// Stable identifier of a fleet vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u32);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EV-{:03}", self.0)
    }
}

/// What a vehicle is doing right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleStatus {
    /// Parked at a charger with no outstanding charge operation.
    Idle,
    /// A charge operation for the current timestep is outstanding.
    Charging,
    /// On a rental trip, back at `until`.
    Rented { until: Timeslot },
}

/// A shared-fleet electric vehicle.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub battery: Battery,
    pub status: VehicleStatus,
}

impl Vehicle {
    /// Creates an idle vehicle.
    pub fn new(id: VehicleId, battery: Battery) -> Self {
        Self {
            id,
            battery,
            status: VehicleStatus::Idle,
        }
    }

    /// Parked and not mid-charge, so it can be dispatched this tick.
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Idle
    }

    /// Parked at a charger, whether or not it is charging.
    pub fn is_connected(&self) -> bool {
        !matches!(self.status, VehicleStatus::Rented { .. })
    }
}
