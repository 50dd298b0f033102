//! Wholesale electricity markets the fleet sells its flexibility into.

/// Historical clearing-price table acting as a market.
pub mod price_table;

pub use price_table::PriceTableMarket;

use std::fmt;

use crate::sim::timeslot::Timeslot;

/// An accepted bid: capacity bought for one quarter-hour contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commitment {
    /// Start of the quarter-hour contract.
    pub timeslot: Timeslot,
    /// Awarded capacity (kW).
    pub capacity_kw: f32,
    /// Clearing price (EUR/MWh).
    pub price_eur_mwh: f32,
}

/// A market that prices quarter-hour contracts and matches bids.
///
/// Prices are in EUR/MWh, capacities in kW.
pub trait Market {
    /// Human-readable market name used in logs and plan names.
    fn name(&self) -> &str;

    /// Clearing price of the contract starting at `timeslot`, if known.
    fn clearing_price(&self, timeslot: Timeslot) -> Option<f32>;

    /// Submits a bid and returns the resulting commitment, or `None` if the
    /// market rejects it.
    fn bid(&mut self, timeslot: Timeslot, price_eur_mwh: f32, capacity_kw: f32)
    -> Option<Commitment>;
}

/// The two markets a controller trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketKind {
    /// Day-ahead reserve market, bid once per day for the next day.
    Balancing,
    /// Near-real-time market, bid 30 minutes ahead of each contract.
    Intraday,
}

impl MarketKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Balancing => "Balancing",
            Self::Intraday => "Intraday",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
