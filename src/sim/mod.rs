/// Settlement of charging energy, imbalance and rentals.
pub mod account;
/// Simulation clock producing tick timestamps.
pub mod clock;
pub mod controller;
/// Ranking of vehicles for dispatch.
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod plan;
/// Outstanding per-vehicle charge operations.
pub mod scheduler;
pub mod strategy;
pub mod timeslot;
pub mod types;
