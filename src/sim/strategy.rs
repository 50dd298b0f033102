//! Bidding strategies run at the end of every tick.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{error, info};

use super::controller::{Controller, TickLedger};
use super::error::{BidError, PlanError, SimError};
use super::scheduler::{ChargeSource, Scheduler};
use super::timeslot::{Timeslot, is_block_start, is_time_of_day, next_day_blocks};
use crate::fleet::Fleet;
use crate::market::{Market, MarketKind};

/// Vehicles the regular strategy keeps uncharged as headroom.
pub const REGULAR_RESERVE: usize = 5;

/// Local time at which the day-ahead balancing auction is bid.
pub const BALANCING_GATE: (u32, u32) = (16, 0);

/// Intraday bids target the contract this far ahead.
pub const INTRADAY_LEAD_SECS: i64 = 30 * 60;

/// The bidding policy of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Never bids; charges all connected vehicles but `reserve`.
    Regular { reserve: usize },
    /// Bids every quarter hour of the next day at the daily gate.
    Balancing,
    /// Bids each quarter hour half an hour ahead.
    Intraday,
}

impl Strategy {
    /// Regular charging with the default reserve.
    pub fn regular() -> Self {
        Self::Regular {
            reserve: REGULAR_RESERVE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Regular { .. } => "regular",
            Self::Balancing => "balancing",
            Self::Intraday => "intraday",
        }
    }

    /// Market the strategy trades in, if any.
    pub fn market(&self) -> Option<MarketKind> {
        match self {
            Self::Regular { .. } => None,
            Self::Balancing => Some(MarketKind::Balancing),
            Self::Intraday => Some(MarketKind::Intraday),
        }
    }

    /// Runs the strategy for the tick at `now`, after the controller has
    /// dispatched the current tick.
    ///
    /// Market strategies first try to create commitments for future
    /// contracts, then re-check their own plan for the current slot. Failed
    /// bids are logged and the remaining contracts are still attempted.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PlanViolation`] if any bid of this tick produced a
    /// duplicate commitment.
    pub fn on_tick<M: Market>(
        self,
        now: Timeslot,
        controller: &mut Controller<M>,
        ledger: &mut TickLedger,
        fleet: &mut Fleet,
        scheduler: &mut Scheduler,
        timestep_min: f32,
    ) -> Result<(), SimError> {
        let tariff = controller.params().industry_tariff_eur_mwh;
        let offset = controller.params().utc_offset;

        let slots = match self {
            Self::Regular { reserve } => {
                charge_all_but(reserve, now, controller, ledger, fleet, scheduler, timestep_min);
                return Ok(());
            }
            Self::Balancing => {
                let (hour, minute) = BALANCING_GATE;
                if is_time_of_day(now, offset, hour, minute) {
                    next_day_blocks(now, offset)
                } else {
                    Vec::new()
                }
            }
            Self::Intraday => {
                let target = now + INTRADAY_LEAD_SECS;
                if is_block_start(target) {
                    vec![target]
                } else {
                    Vec::new()
                }
            }
        };
        let Some(kind) = self.market() else {
            return Ok(());
        };

        let mut violation: Option<PlanError> = None;
        for slot in slots {
            match controller.update_consumption_plan(kind, slot, tariff) {
                Ok(_) => {}
                Err(BidError::Prediction(e)) => {
                    error!(market = %kind, slot, "Could not update consumption plan: {e}");
                }
                Err(BidError::Plan(e)) => {
                    error!(market = %kind, slot, "Could not update consumption plan: {e}");
                    violation.get_or_insert(e);
                }
            }
        }

        controller.top_up_plan(now, kind, ledger, timestep_min, fleet, scheduler);

        match violation {
            Some(source) => Err(SimError::PlanViolation {
                timeslot: now,
                source,
            }),
            None => Ok(()),
        }
    }
}

/// Makes sure `connected - reserve` vehicles are charging, drawing any
/// missing ones from the tick's leftover pool at the tariff.
#[allow(clippy::too_many_arguments)]
fn charge_all_but<M: Market>(
    reserve: usize,
    now: Timeslot,
    controller: &Controller<M>,
    ledger: &mut TickLedger,
    fleet: &mut Fleet,
    scheduler: &mut Scheduler,
    timestep_min: f32,
) {
    let target = fleet.connected_count().saturating_sub(reserve);
    let charging = fleet.connected_count() - fleet.available_count();
    let missing = target.saturating_sub(charging).min(ledger.pool.len());

    let extra: Vec<_> = ledger.pool.drain(..missing).collect();
    controller.dispatch(&extra, ChargeSource::Regular, now, timestep_min, fleet, scheduler);
    ledger.regular.extend(extra);
    info!("Charging {} EVs.", fleet.connected_count() - fleet.available_count());
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A strategy name that is not one of the known policies.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown strategy \"{0}\", expected regular, balancing or intraday")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Self::regular()),
            "balancing" => Ok(Self::Balancing),
            "intraday" => Ok(Self::Intraday),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}
