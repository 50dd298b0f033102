use std::collections::BTreeMap;

use super::{Commitment, Market};
use crate::sim::timeslot::Timeslot;

/// A market replaying historical clearing prices.
///
/// A bid clears when its price reaches the recorded clearing price of the
/// contract. Capacity is unlimited: the fleet is a price taker and never
/// moves the market.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use fleet_vpp_sim::market::{Market, PriceTableMarket};
///
/// let mut market = PriceTableMarket::new("Intraday", BTreeMap::from([(900, 31.5)]));
/// assert!(market.bid(900, 31.5, 9.2).is_some());
/// assert!(market.bid(900, 30.0, 9.2).is_none());
/// assert!(market.bid(1_800, 99.0, 9.2).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PriceTableMarket {
    name: String,
    prices: BTreeMap<Timeslot, f32>,
}

impl PriceTableMarket {
    /// Creates a market from a contract-start → clearing-price table (EUR/MWh).
    pub fn new(name: impl Into<String>, prices: BTreeMap<Timeslot, f32>) -> Self {
        Self {
            name: name.into(),
            prices,
        }
    }

    /// Number of priced contracts.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Market for PriceTableMarket {
    fn name(&self) -> &str {
        &self.name
    }

    fn clearing_price(&self, timeslot: Timeslot) -> Option<f32> {
        self.prices.get(&timeslot).copied()
    }

    fn bid(
        &mut self,
        timeslot: Timeslot,
        price_eur_mwh: f32,
        capacity_kw: f32,
    ) -> Option<Commitment> {
        let clearing = self.clearing_price(timeslot)?;
        if capacity_kw <= 0.0 || price_eur_mwh < clearing {
            return None;
        }

        Some(Commitment {
            timeslot,
            capacity_kw,
            price_eur_mwh: clearing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> PriceTableMarket {
        PriceTableMarket::new("Balancing", BTreeMap::from([(0, -12.0), (900, 45.0)]))
    }

    #[test]
    fn settles_at_clearing_price() {
        let mut m = market();
        let c = m.bid(900, 60.0, 4.6).unwrap();
        assert_eq!(c.price_eur_mwh, 45.0);
        assert_eq!(c.capacity_kw, 4.6);
        assert_eq!(c.timeslot, 900);
    }

    #[test]
    fn negative_prices_clear() {
        let mut m = market();
        assert!(m.bid(0, -12.0, 4.6).is_some());
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut m = market();
        assert!(m.bid(900, 45.0, 0.0).is_none());
    }

    #[test]
    fn unknown_contract_has_no_price() {
        let m = market();
        assert_eq!(m.clearing_price(1_800), None);
        assert_eq!(m.len(), 2);
    }
}
