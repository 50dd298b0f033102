//! Simulation engine that advances the clock and runs the fleet, the
//! rental demand and the controller in a fixed per-tick order.

use tracing::{debug, info};

use super::account::Account;
use super::clock::Clock;
use super::controller::Controller;
use super::error::SimError;
use super::scheduler::Scheduler;
use super::timeslot::Timeslot;
use super::types::{SimConfig, StepResult};
use crate::fleet::{Fleet, RentalModel};
use crate::market::Market;

/// Simulation engine owning the fleet, the controller and the bookkeeping.
///
/// Generic over `M: Market` for static dispatch.
pub struct Engine<M: Market> {
    config: SimConfig,
    controller: Controller<M>,
    fleet: Fleet,
    scheduler: Scheduler,
    rentals: RentalModel,
    account: Account,
    charged_regular_kwh: f32,
}

impl<M: Market> Engine<M> {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation configuration
    /// * `controller` - Dispatch-and-bidding controller
    /// * `fleet` - Vehicles at the start of the run
    /// * `rentals` - Rental demand model
    /// * `account` - Settlement account
    pub fn new(
        config: SimConfig,
        controller: Controller<M>,
        fleet: Fleet,
        rentals: RentalModel,
        account: Account,
    ) -> Self {
        Self {
            config,
            controller,
            fleet,
            scheduler: Scheduler::new(),
            rentals,
            account,
            charged_regular_kwh: 0.0,
        }
    }

    /// Executes the tick at `now` and returns its record.
    ///
    /// Order: complete the previous tick's charge operations and settle
    /// them, reconnect returning vehicles, process rental requests, run the
    /// controller, book any new imbalance.
    ///
    /// # Errors
    ///
    /// Propagates [`SimError`] from the controller.
    pub fn step(&mut self, now: Timeslot) -> Result<StepResult, SimError> {
        let timestep_min = self.config.timestep_min as f32;
        let offset = self.controller.params().utc_offset;

        // 1. Finish last tick's charging
        let done = self.scheduler.complete(&mut self.fleet);
        self.account.settle(&done);
        self.charged_regular_kwh += done.regular_kwh;

        // 2. Returns and rentals
        let returned = self.fleet.return_due(now);
        if !returned.is_empty() {
            debug!(count = returned.len(), "vehicles returned");
        }

        let mut rentals_started = 0;
        for request in self.rentals.sample(now, offset, &self.fleet) {
            if !self.controller.accepts_rental(&self.fleet) {
                info!(
                    vehicle = %request.vehicle,
                    lost_eur = request.revenue_eur,
                    "Refused rental to keep committed capacity"
                );
                self.account.book_refusal(request.revenue_eur);
                continue;
            }
            if self
                .fleet
                .rent(request.vehicle, request.return_at(now), request.energy_kwh)
            {
                self.account.book_rental(request.revenue_eur);
                rentals_started += 1;
            }
        }

        // 3. Dispatch and bidding
        let report =
            self.controller
                .charge_fleet(now, timestep_min, &mut self.fleet, &mut self.scheduler)?;

        // 4. Settlement
        let state = *self.controller.state();
        self.account.book_imbalance(state.imbalance_kwh);

        Ok(StepResult {
            timestamp: now,
            available_evs: report.ranked,
            balancing_evs: report.balancing_evs,
            intraday_evs: report.intraday_evs,
            regular_evs: report.regular_evs,
            rentals_started,
            committed_capacity_kw: report.committed_capacity_kw,
            imbalance_kwh: state.imbalance_kwh,
            total_charged_kwh: state.total_charged_kwh,
            charged_regular_kwh: self.charged_regular_kwh,
            bids_submitted: report.bids_submitted,
            bids_accepted: report.bids_accepted,
            profit_eur: self.account.profit_eur(),
            lost_rentals_eur: self.account.lost_rentals_eur,
            refused_rentals: self.account.refused_rentals,
            mean_soc_pct: self.fleet.mean_level(),
        })
    }

    /// Executes all ticks and returns the complete step record vector.
    ///
    /// # Errors
    ///
    /// Stops at the first tick that fails.
    pub fn run(&mut self) -> Result<Vec<StepResult>, SimError> {
        let total = self.config.total_steps();
        let mut clock = Clock::new(self.config.start, self.config.step_secs(), total);
        let mut results = Vec::with_capacity(total);
        while let Some(now) = clock.tick() {
            results.push(self.step(now)?);
        }
        Ok(results)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller<M> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller<M> {
        &mut self.controller
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}
