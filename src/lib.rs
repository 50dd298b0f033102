//! EV car-sharing fleet simulator that sells spare charging capacity into the
//! balancing and intraday electricity markets.

pub mod cli;
pub mod config;
/// Vehicles, batteries and rental demand.
pub mod fleet;
pub mod forecast;
pub mod io;
pub mod market;
pub mod profile;
pub mod runner;
/// Controller, strategies, scheduling, settlement and the simulation engine.
pub mod sim;
pub mod telemetry;
