//! Fleet-capacity forecast backing the bid decisions.

use std::collections::BTreeMap;

use crate::sim::error::PredictionError;
use crate::sim::timeslot::{Timeslot, sub_slots};

/// Predicted available fleet charging capacity per 5-minute timeslot.
///
/// Lookups are exact: there is no interpolation, so the prediction horizon
/// ends where the underlying series ends.
#[derive(Debug, Clone, Default)]
pub struct CapacityForecast {
    by_slot: BTreeMap<Timeslot, f32>,
}

impl CapacityForecast {
    pub fn new(by_slot: BTreeMap<Timeslot, f32>) -> Self {
        Self { by_slot }
    }

    /// Predicted capacity (kW) at `timeslot`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::CapacityUnavailable`] if the series has no
    /// point at `timeslot`.
    pub fn predict_capacity(&self, timeslot: Timeslot) -> Result<f32, PredictionError> {
        self.by_slot
            .get(&timeslot)
            .copied()
            .ok_or(PredictionError::CapacityUnavailable(timeslot))
    }

    /// Minimum predicted capacity (kW) over the quarter hour starting at
    /// `timeslot`.
    ///
    /// Sub-slots missing from the series are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::CapacityUnavailable`] only if all three
    /// sub-slots are missing.
    pub fn predict_min_capacity(&self, timeslot: Timeslot) -> Result<f32, PredictionError> {
        sub_slots(timeslot)
            .into_iter()
            .filter_map(|t| self.predict_capacity(t).ok())
            .reduce(f32::min)
            .ok_or(PredictionError::CapacityUnavailable(timeslot))
    }

    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }
}
