//! Per-market ledger of committed charging capacity.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::error::PlanError;
use super::timeslot::{Timeslot, sub_slots};
use crate::market::Commitment;

/// Capacity committed to one market, keyed by 5-minute timeslot.
///
/// Entries are append-only: the simulation never re-plans the past, and a
/// second insert at the same timeslot is rejected rather than overwritten.
#[derive(Debug, Clone)]
pub struct ConsumptionPlan {
    name: String,
    entries: BTreeMap<Timeslot, f32>,
}

impl ConsumptionPlan {
    /// Creates an empty plan for the named market.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Market identifier this plan belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records `capacity_kw` at `timeslot`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateCommitment`] if the timeslot already has
    /// an entry, whatever its capacity.
    pub fn add(&mut self, timeslot: Timeslot, capacity_kw: f32) -> Result<(), PlanError> {
        match self.entries.entry(timeslot) {
            Entry::Occupied(_) => Err(self.duplicate(timeslot)),
            Entry::Vacant(slot) => {
                slot.insert(capacity_kw);
                Ok(())
            }
        }
    }

    /// Committed capacity at `timeslot`, `0.0` when nothing is committed.
    pub fn get(&self, timeslot: Timeslot) -> f32 {
        self.entries.get(&timeslot).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, timeslot: Timeslot) -> bool {
        self.entries.contains_key(&timeslot)
    }

    /// Expands a quarter-hour award into its three 5-minute entries.
    ///
    /// All sub-slots are checked before anything is written, so a conflict
    /// leaves the plan untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateCommitment`] naming the first occupied
    /// sub-slot.
    pub fn commit(&mut self, commitment: &Commitment) -> Result<(), PlanError> {
        let slots = sub_slots(commitment.timeslot);
        if let Some(&taken) = slots.iter().find(|t| self.contains(**t)) {
            return Err(self.duplicate(taken));
        }
        for t in slots {
            self.entries.insert(t, commitment.capacity_kw);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in timeslot order.
    pub fn iter(&self) -> impl Iterator<Item = (Timeslot, f32)> + '_ {
        self.entries.iter().map(|(t, kw)| (*t, *kw))
    }

    fn duplicate(&self, timeslot: Timeslot) -> PlanError {
        PlanError::DuplicateCommitment {
            plan: self.name.clone(),
            timeslot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(timeslot: Timeslot, capacity_kw: f32) -> Commitment {
        Commitment {
            timeslot,
            capacity_kw,
            price_eur_mwh: 30.0,
        }
    }

    #[test]
    fn unseen_timeslot_is_zero() {
        let plan = ConsumptionPlan::new("Balancing");
        assert_eq!(plan.get(1_000), 0.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn second_add_fails_even_with_same_capacity() {
        let mut plan = ConsumptionPlan::new("Intraday");
        assert!(plan.add(900, 20.0).is_ok());
        let err = plan.add(900, 20.0).unwrap_err();
        assert_eq!(
            err,
            PlanError::DuplicateCommitment {
                plan: "Intraday".to_string(),
                timeslot: 900,
            }
        );
        assert_eq!(plan.get(900), 20.0);
    }

    #[test]
    fn commit_expands_into_three_sub_slots() {
        let mut plan = ConsumptionPlan::new("Balancing");
        plan.commit(&award(1_800, 13.8)).unwrap();
        let entries: Vec<_> = plan.iter().collect();
        assert_eq!(entries, vec![(1_800, 13.8), (2_100, 13.8), (2_400, 13.8)]);
    }

    #[test]
    fn conflicting_commit_leaves_plan_untouched() {
        let mut plan = ConsumptionPlan::new("Balancing");
        plan.add(2_100, 4.6).unwrap();
        let err = plan.commit(&award(1_800, 9.2)).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateCommitment { timeslot: 2_100, .. }));
        assert!(!plan.contains(1_800));
        assert!(!plan.contains(2_400));
        assert_eq!(plan.get(2_100), 4.6);
    }
}
