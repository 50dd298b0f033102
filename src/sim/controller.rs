//! Fleet controller: per-tick dispatch against the consumption plans and the
//! bid decision that fills those plans.

use chrono::{FixedOffset, Offset, Utc};
use tracing::{debug, info, info_span, warn};

use super::dispatch::DispatchOrder;
use super::error::{BidError, PredictionError, SimError};
use super::plan::ConsumptionPlan;
use super::scheduler::{ChargeJob, ChargeSource, Scheduler};
use super::strategy::Strategy;
use super::timeslot::{Timeslot, block_start, format_local};
use super::types::TickReport;
use crate::fleet::{Fleet, VehicleId};
use crate::forecast::CapacityForecast;
use crate::market::{Commitment, Market, MarketKind};

/// How much capacity a bid offers for a quarter-hour contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BidCapacity {
    /// Predicted capacity at the first 5-minute slot of the contract.
    #[default]
    SlotStart,
    /// Minimum predicted capacity over the three slots of the contract.
    BlockMinimum,
}

/// Fixed parameters of a controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerParams {
    /// Power of one charger (kW). Every connected vehicle has one.
    pub charger_kw: f32,
    /// Flat fallback price (EUR/MWh).
    pub industry_tariff_eur_mwh: f32,
    /// Refuse rentals that would break the current commitment.
    pub refuse_rentals: bool,
    /// Time zone the markets operate in.
    pub utc_offset: FixedOffset,
    pub bid_capacity: BidCapacity,
}

impl ControllerParams {
    /// Creates parameters with rentals always accepted, UTC market time and
    /// slot-start bid capacity.
    ///
    /// # Panics
    ///
    /// Panics if `charger_kw` is not positive.
    pub fn new(charger_kw: f32, industry_tariff_eur_mwh: f32) -> Self {
        assert!(charger_kw > 0.0);
        Self {
            charger_kw,
            industry_tariff_eur_mwh,
            refuse_rentals: false,
            utc_offset: Utc.fix(),
            bid_capacity: BidCapacity::SlotStart,
        }
    }
}

/// Running accumulators of the virtual power plant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VppState {
    /// Energy promised to a market but not deliverable (kWh). Never decreases.
    pub imbalance_kwh: f32,
    /// Energy dispatched against market commitments (kWh).
    pub total_charged_kwh: f32,
    /// Charger capacity tied up by market commitments this tick (kW).
    pub committed_capacity_kw: f32,
    pub bids_submitted: u32,
    pub bids_accepted: u32,
}

/// Why a bid was not placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbstainReason {
    /// The predicted clearing price is above the industry tariff.
    TariffCheaper { predicted: f32, tariff: f32 },
    /// The fleet is predicted to have no spare capacity.
    NoCapacity,
}

/// Result of one bid decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BidOutcome {
    Abstained(AbstainReason),
    Rejected,
    Accepted(Commitment),
}

/// Vehicles one plan received this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDispatch {
    pub dispatched: Vec<VehicleId>,
    /// Committed vehicles that could not be served.
    pub shortfall: usize,
}

/// Allocation of the ranked vehicles within one tick.
#[derive(Debug, Clone, Default)]
pub struct TickLedger {
    /// Ranked vehicles not yet allocated.
    pub pool: Vec<VehicleId>,
    pub ranked: usize,
    pub balancing: PlanDispatch,
    pub intraday: PlanDispatch,
    pub regular: Vec<VehicleId>,
}

impl TickLedger {
    pub fn new(ranked: Vec<VehicleId>) -> Self {
        Self {
            ranked: ranked.len(),
            pool: ranked,
            ..Self::default()
        }
    }

    pub fn plan(&self, kind: MarketKind) -> &PlanDispatch {
        match kind {
            MarketKind::Balancing => &self.balancing,
            MarketKind::Intraday => &self.intraday,
        }
    }

    fn plan_mut(&mut self, kind: MarketKind) -> &mut PlanDispatch {
        match kind {
            MarketKind::Balancing => &mut self.balancing,
            MarketKind::Intraday => &mut self.intraday,
        }
    }
}

/// Owns both markets, both consumption plans, the capacity forecast and the
/// VPP accumulators.
///
/// Generic over `M: Market` for static dispatch.
pub struct Controller<M: Market> {
    strategy: Strategy,
    params: ControllerParams,
    order: DispatchOrder,
    balancing: M,
    balancing_plan: ConsumptionPlan,
    intraday: M,
    intraday_plan: ConsumptionPlan,
    capacity: CapacityForecast,
    state: VppState,
}

impl<M: Market> Controller<M> {
    /// Creates a controller with empty consumption plans.
    ///
    /// # Arguments
    ///
    /// * `strategy` - Bidding strategy run at the end of every tick
    /// * `params` - Charger power, tariff and market settings
    /// * `balancing` - Day-ahead balancing market
    /// * `intraday` - Intraday market
    /// * `capacity` - Fleet-capacity forecast backing bid sizes
    pub fn new(
        strategy: Strategy,
        params: ControllerParams,
        balancing: M,
        intraday: M,
        capacity: CapacityForecast,
    ) -> Self {
        let balancing_plan = ConsumptionPlan::new(balancing.name());
        let intraday_plan = ConsumptionPlan::new(intraday.name());
        Self {
            strategy,
            params,
            order: DispatchOrder::default(),
            balancing,
            balancing_plan,
            intraday,
            intraday_plan,
            capacity,
            state: VppState::default(),
        }
    }

    /// Replaces the dispatch order.
    pub fn with_dispatch_order(mut self, order: DispatchOrder) -> Self {
        self.order = order;
        self
    }

    /// Runs the dispatch procedure for the tick at `now`.
    ///
    /// Steps, in order: rank available vehicles, serve the balancing plan,
    /// serve the intraday plan, recompute committed capacity, charge the rest
    /// at the tariff, then run the bidding strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PlanViolation`] if the strategy hit a duplicate
    /// commitment. The current tick's dispatch has already been issued.
    pub fn charge_fleet(
        &mut self,
        now: Timeslot,
        timestep_min: f32,
        fleet: &mut Fleet,
        scheduler: &mut Scheduler,
    ) -> Result<TickReport, SimError> {
        let span = info_span!(
            "tick",
            time = %format_local(now, self.params.utc_offset),
            strategy = self.strategy.name()
        );
        let _enter = span.enter();

        let before = self.state;
        let mut ledger = TickLedger::new(self.order.rank(fleet));

        ledger.balancing = self.charge_plan(
            now,
            MarketKind::Balancing,
            &mut ledger.pool,
            0,
            timestep_min,
            fleet,
            scheduler,
        );
        ledger.intraday = self.charge_plan(
            now,
            MarketKind::Intraday,
            &mut ledger.pool,
            0,
            timestep_min,
            fleet,
            scheduler,
        );

        let committed = fleet.connected_count().saturating_sub(ledger.pool.len());
        self.state.committed_capacity_kw = committed as f32 * self.params.charger_kw;

        let regular = std::mem::take(&mut ledger.pool);
        self.dispatch(&regular, ChargeSource::Regular, now, timestep_min, fleet, scheduler);
        info!(
            "Charging {}/{} EVs regularly.",
            regular.len(),
            fleet.connected_count()
        );
        ledger.regular = regular;

        let strategy = self.strategy;
        let outcome = strategy.on_tick(now, self, &mut ledger, fleet, scheduler, timestep_min);

        let report = TickReport {
            ranked: ledger.ranked,
            balancing_evs: ledger.balancing.dispatched.len(),
            intraday_evs: ledger.intraday.dispatched.len(),
            regular_evs: ledger.regular.len(),
            shortfall_evs: ledger.balancing.shortfall + ledger.intraday.shortfall,
            committed_capacity_kw: self.state.committed_capacity_kw,
            bids_submitted: self.state.bids_submitted - before.bids_submitted,
            bids_accepted: self.state.bids_accepted - before.bids_accepted,
        };
        outcome.map(|()| report)
    }

    /// Serves the consumption plan of `kind` at `now` from the front of
    /// `pool`.
    ///
    /// `already_served` vehicles count towards the commitment without being
    /// dispatched again. A commitment larger than the pool is clamped and the
    /// missing energy is booked as imbalance.
    #[allow(clippy::too_many_arguments)]
    pub fn charge_plan(
        &mut self,
        now: Timeslot,
        kind: MarketKind,
        pool: &mut Vec<VehicleId>,
        already_served: usize,
        timestep_min: f32,
        fleet: &mut Fleet,
        scheduler: &mut Scheduler,
    ) -> PlanDispatch {
        let charger_kw = self.params.charger_kw;
        let planned_kw = self.plan(kind).get(now);
        let required = ((planned_kw / charger_kw).floor().max(0.0) as usize)
            .saturating_sub(already_served);
        debug!(
            plan = %kind,
            planned_kwh = planned_kw * timestep_min / 60.0,
            required,
            "consumption plan"
        );

        let mut shortfall = 0;
        if required > pool.len() {
            shortfall = required - pool.len();
            let imbalance_kwh = shortfall as f32 * charger_kw * timestep_min / 60.0;
            self.state.imbalance_kwh += imbalance_kwh;
            warn!(
                plan = %kind,
                committed = required,
                available = pool.len(),
                imbalance_kwh,
                "Committed more EVs than available, accounting for imbalance costs"
            );
        }

        let count = required.min(pool.len());
        let dispatched: Vec<VehicleId> = pool.drain(..count).collect();
        let source = match kind {
            MarketKind::Balancing => ChargeSource::Balancing,
            MarketKind::Intraday => ChargeSource::Intraday,
        };
        self.dispatch(&dispatched, source, now, timestep_min, fleet, scheduler);
        self.state.total_charged_kwh += count as f32 * charger_kw * timestep_min / 60.0;
        if count > 0 {
            info!(
                "Charging {}/{} EVs from {} plan.",
                count,
                fleet.connected_count(),
                kind
            );
        }

        PlanDispatch {
            dispatched,
            shortfall,
        }
    }

    /// Starts a one-timestep charge operation for each vehicle.
    ///
    /// Vehicles that already hold an operation are skipped by the scheduler.
    /// Returns the number of operations started.
    pub fn dispatch(
        &self,
        vehicles: &[VehicleId],
        source: ChargeSource,
        now: Timeslot,
        timestep_min: f32,
        fleet: &mut Fleet,
        scheduler: &mut Scheduler,
    ) -> usize {
        let price_eur_mwh = self.energy_price(source, now);
        vehicles
            .iter()
            .filter(|&&vehicle| {
                scheduler.start(
                    fleet,
                    ChargeJob {
                        vehicle,
                        source,
                        power_kw: self.params.charger_kw,
                        minutes: timestep_min,
                        price_eur_mwh,
                    },
                )
            })
            .count()
    }

    /// Runs the bid decision for the contract starting at `timeslot`.
    ///
    /// Abstains when the tariff is cheaper than the predicted clearing price
    /// or when no capacity is predicted. Otherwise bids the predicted
    /// capacity at exactly the predicted price and, on acceptance, records
    /// the award in the market's consumption plan.
    ///
    /// # Errors
    ///
    /// * [`BidError::Prediction`] if the price or capacity lookup has no data
    /// * [`BidError::Plan`] if the award overlaps an existing plan entry
    pub fn update_consumption_plan(
        &mut self,
        kind: MarketKind,
        timeslot: Timeslot,
        tariff_eur_mwh: f32,
    ) -> Result<BidOutcome, BidError> {
        let predicted = self.predict_clearing_price(kind, timeslot)?;
        if predicted > tariff_eur_mwh {
            info!(
                market = %kind,
                predicted,
                tariff = tariff_eur_mwh,
                "The industry tariff is cheaper."
            );
            return Ok(BidOutcome::Abstained(AbstainReason::TariffCheaper {
                predicted,
                tariff: tariff_eur_mwh,
            }));
        }

        let capacity_kw = match self.params.bid_capacity {
            BidCapacity::SlotStart => self.predict_capacity(timeslot)?,
            BidCapacity::BlockMinimum => self.predict_min_capacity(timeslot)?,
        };
        if capacity_kw <= 0.0 {
            info!(market = %kind, "No available capacity predicted.");
            return Ok(BidOutcome::Abstained(AbstainReason::NoCapacity));
        }

        self.state.bids_submitted += 1;
        let Some(commitment) = self.market_mut(kind).bid(timeslot, predicted, capacity_kw) else {
            debug!(market = %kind, predicted, capacity_kw, "Bid unsuccessful.");
            return Ok(BidOutcome::Rejected);
        };

        self.plan_mut(kind).commit(&commitment)?;
        self.state.bids_accepted += 1;
        info!(
            "Bought {:.2} kW for {:.2} EUR/MWh for 15-min timeslot {}",
            commitment.capacity_kw,
            commitment.price_eur_mwh,
            format_local(commitment.timeslot, self.params.utc_offset)
        );
        Ok(BidOutcome::Accepted(commitment))
    }

    /// Predicted fleet capacity at `timeslot` (kW).
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::CapacityUnavailable`] if the forecast has no
    /// data point there.
    pub fn predict_capacity(&self, timeslot: Timeslot) -> Result<f32, PredictionError> {
        self.capacity.predict_capacity(timeslot)
    }

    /// Minimum predicted fleet capacity over the quarter hour at `timeslot`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::CapacityUnavailable`] if none of the three
    /// slots has data.
    pub fn predict_min_capacity(&self, timeslot: Timeslot) -> Result<f32, PredictionError> {
        self.capacity.predict_min_capacity(timeslot)
    }

    /// Clearing price the market reports for `timeslot`, used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`PredictionError::PriceUnavailable`] if the market has no
    /// price for that contract.
    pub fn predict_clearing_price(
        &self,
        kind: MarketKind,
        timeslot: Timeslot,
    ) -> Result<f32, PredictionError> {
        let market = self.market(kind);
        market
            .clearing_price(timeslot)
            .ok_or_else(|| PredictionError::PriceUnavailable {
                market: market.name().to_string(),
                timeslot,
            })
    }

    /// Whether one more vehicle may leave on a rental.
    ///
    /// Always `true` unless rental refusal is enabled, in which case the
    /// remaining connected chargers must still cover the committed capacity.
    pub fn accepts_rental(&self, fleet: &Fleet) -> bool {
        if !self.params.refuse_rentals {
            return true;
        }
        let remaining = fleet.connected_count().saturating_sub(1) as f32 * self.params.charger_kw;
        remaining >= self.state.committed_capacity_kw
    }

    /// Price of energy drawn from `source` during the tick at `now`.
    ///
    /// Market energy is settled at the contract's clearing price, falling
    /// back to the tariff when the market has none.
    pub fn energy_price(&self, source: ChargeSource, now: Timeslot) -> f32 {
        let tariff = self.params.industry_tariff_eur_mwh;
        let kind = match source {
            ChargeSource::Regular => return tariff,
            ChargeSource::Balancing => MarketKind::Balancing,
            ChargeSource::Intraday => MarketKind::Intraday,
        };
        self.market(kind)
            .clearing_price(block_start(now))
            .unwrap_or(tariff)
    }

    pub fn plan(&self, kind: MarketKind) -> &ConsumptionPlan {
        match kind {
            MarketKind::Balancing => &self.balancing_plan,
            MarketKind::Intraday => &self.intraday_plan,
        }
    }

    pub fn plan_mut(&mut self, kind: MarketKind) -> &mut ConsumptionPlan {
        match kind {
            MarketKind::Balancing => &mut self.balancing_plan,
            MarketKind::Intraday => &mut self.intraday_plan,
        }
    }

    pub fn market(&self, kind: MarketKind) -> &M {
        match kind {
            MarketKind::Balancing => &self.balancing,
            MarketKind::Intraday => &self.intraday,
        }
    }

    pub fn market_mut(&mut self, kind: MarketKind) -> &mut M {
        match kind {
            MarketKind::Balancing => &mut self.balancing,
            MarketKind::Intraday => &mut self.intraday,
        }
    }

    pub fn state(&self) -> &VppState {
        &self.state
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    pub fn dispatch_order(&self) -> DispatchOrder {
        self.order
    }

    /// Tops up the commitment of `kind` from the tick's leftover pool.
    ///
    /// Vehicles the controller already dispatched for this plan, and any
    /// shortfall it already booked, count as served.
    pub(crate) fn top_up_plan(
        &mut self,
        now: Timeslot,
        kind: MarketKind,
        ledger: &mut TickLedger,
        timestep_min: f32,
        fleet: &mut Fleet,
        scheduler: &mut Scheduler,
    ) {
        let served = ledger.plan(kind).dispatched.len() + ledger.plan(kind).shortfall;
        let extra = self.charge_plan(
            now,
            kind,
            &mut ledger.pool,
            served,
            timestep_min,
            fleet,
            scheduler,
        );
        let entry = ledger.plan_mut(kind);
        entry.dispatched.extend(extra.dispatched);
        entry.shortfall += extra.shortfall;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::fleet::VehicleStatus;
    use crate::market::PriceTableMarket;

    const T: Timeslot = 1_483_315_200;

    fn controller(strategy: Strategy, capacity: &[(Timeslot, f32)]) -> Controller<PriceTableMarket> {
        let prices = BTreeMap::from([(T, 30.0), (T + 900, 50.0)]);
        Controller::new(
            strategy,
            ControllerParams::new(5.0, 40.0),
            PriceTableMarket::new("Balancing", prices.clone()),
            PriceTableMarket::new("Intraday", prices),
            CapacityForecast::new(capacity.iter().copied().collect()),
        )
    }

    #[test]
    fn plans_are_named_after_markets() {
        let c = controller(Strategy::Balancing, &[]);
        assert_eq!(c.plan(MarketKind::Balancing).name(), "Balancing");
        assert_eq!(c.plan(MarketKind::Intraday).name(), "Intraday");
    }

    #[test]
    fn price_abstain_reports_both_prices() {
        let mut c = controller(Strategy::Intraday, &[(T + 900, 20.0)]);
        let outcome = c.update_consumption_plan(MarketKind::Intraday, T + 900, 40.0);
        assert_eq!(
            outcome,
            Ok(BidOutcome::Abstained(AbstainReason::TariffCheaper {
                predicted: 50.0,
                tariff: 40.0,
            }))
        );
        assert_eq!(c.state().bids_submitted, 0);
    }

    #[test]
    fn missing_price_is_a_prediction_error() {
        let mut c = controller(Strategy::Intraday, &[]);
        let err = c
            .update_consumption_plan(MarketKind::Intraday, T + 1_800, 40.0)
            .unwrap_err();
        assert!(matches!(
            err,
            BidError::Prediction(PredictionError::PriceUnavailable { .. })
        ));
    }

    #[test]
    fn block_minimum_bids_smallest_slot() {
        let mut c = controller(Strategy::Balancing, &[(T, 20.0), (T + 300, 10.0), (T + 600, 15.0)]);
        c.params.bid_capacity = BidCapacity::BlockMinimum;
        let outcome = c.update_consumption_plan(MarketKind::Balancing, T, 40.0).unwrap();
        let BidOutcome::Accepted(commitment) = outcome else {
            panic!("expected acceptance, got {outcome:?}");
        };
        assert_eq!(commitment.capacity_kw, 10.0);
        assert_eq!(commitment.price_eur_mwh, 30.0);
        assert_eq!(c.state().bids_accepted, 1);
    }

    #[test]
    fn rentals_refused_only_when_commitment_at_risk() {
        let mut c = controller(Strategy::Balancing, &[]);
        let fleet = Fleet::seeded(4, 10.0, 1.0, 50.0, 50.0, 0);
        c.state.committed_capacity_kw = 20.0;
        assert!(c.accepts_rental(&fleet));

        c.params.refuse_rentals = true;
        assert!(!c.accepts_rental(&fleet));
        c.state.committed_capacity_kw = 15.0;
        assert!(c.accepts_rental(&fleet));
    }

    #[test]
    fn market_energy_is_priced_at_block_clearing_price() {
        let c = controller(Strategy::Balancing, &[]);
        assert_eq!(c.energy_price(ChargeSource::Balancing, T + 600), 30.0);
        assert_eq!(c.energy_price(ChargeSource::Regular, T + 600), 40.0);
        assert_eq!(c.energy_price(ChargeSource::Intraday, T + 3_600), 40.0);
    }

    #[test]
    fn charge_plan_counts_already_served() {
        let mut c = controller(Strategy::Balancing, &[]);
        c.plan_mut(MarketKind::Balancing).add(T, 15.0).unwrap();
        let mut fleet = Fleet::seeded(5, 10.0, 1.0, 50.0, 50.0, 0);
        let mut scheduler = Scheduler::new();
        let mut pool: Vec<VehicleId> = fleet.iter().map(|v| v.id).collect();

        let served = c.charge_plan(T, MarketKind::Balancing, &mut pool, 2, 5.0, &mut fleet, &mut scheduler);
        assert_eq!(served.dispatched, vec![VehicleId(0)]);
        assert_eq!(served.shortfall, 0);
        assert_eq!(pool.len(), 4);
        assert_eq!(
            fleet.get(VehicleId(0)).map(|v| v.status),
            Some(VehicleStatus::Charging)
        );
    }
}
