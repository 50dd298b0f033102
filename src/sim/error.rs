//! Error taxonomy of the dispatch-and-bidding loop.
//!
//! Abstentions and commitment shortfalls are ordinary outcomes and never
//! appear here. Prediction failures are recoverable and are caught by the
//! bidding strategies. Only a duplicate commitment is a hard failure.

use thiserror::Error;

use super::timeslot::Timeslot;

/// Violation of the one-entry-per-timeslot rule of a consumption plan.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("{timeslot} was already in the {plan} consumption plan")]
    DuplicateCommitment { plan: String, timeslot: Timeslot },
}

/// A forecast or price lookup that has no data for the requested timeslot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    #[error("capacity prediction failed: {0} is not in data")]
    CapacityUnavailable(Timeslot),

    #[error("no {market} clearing price for {timeslot}")]
    PriceUnavailable { market: String, timeslot: Timeslot },
}

/// Failure of a single bid attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BidError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Failure that aborts the simulation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    #[error("consumption plan violated while bidding at {timeslot}: {source}")]
    PlanViolation {
        timeslot: Timeslot,
        #[source]
        source: PlanError,
    },
}
