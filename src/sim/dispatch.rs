//! Ranking of available vehicles before they are handed out to commitments.

use std::cmp::Ordering;
use std::fmt;

use crate::fleet::{Fleet, Vehicle, VehicleId};

/// Order in which available vehicles are assigned to market commitments.
///
/// Vehicles ranked first serve the balancing plan, then the intraday plan;
/// whatever is left charges at the tariff. Ties keep vehicle id order.
#[derive(Clone, Copy, Default)]
pub enum DispatchOrder {
    /// Fullest batteries serve commitments first.
    #[default]
    HighestLevelFirst,
    /// Emptiest batteries serve commitments first.
    LowestLevelFirst,
    /// Caller-supplied comparator.
    Custom(fn(&Vehicle, &Vehicle) -> Ordering),
}

impl DispatchOrder {
    pub fn compare(&self, a: &Vehicle, b: &Vehicle) -> Ordering {
        match self {
            Self::HighestLevelFirst => b.battery.level.total_cmp(&a.battery.level),
            Self::LowestLevelFirst => a.battery.level.total_cmp(&b.battery.level),
            Self::Custom(cmp) => cmp(a, b),
        }
    }

    /// Ids of all vehicles that can be dispatched this tick, best first.
    pub fn rank(&self, fleet: &Fleet) -> Vec<VehicleId> {
        let mut pool: Vec<&Vehicle> = fleet.iter().filter(|v| v.is_available()).collect();
        pool.sort_by(|a, b| self.compare(a, b));
        pool.into_iter().map(|v| v.id).collect()
    }
}

impl fmt::Debug for DispatchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HighestLevelFirst => f.write_str("HighestLevelFirst"),
            Self::LowestLevelFirst => f.write_str("LowestLevelFirst"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}
