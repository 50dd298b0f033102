//! Operator account: what charging cost, what the markets saved, and what
//! rental refusals gave up.

use super::scheduler::CompletedCharges;

/// Running financial totals of one simulation run (EUR).
///
/// Profit is measured against a baseline that buys every kWh at the
/// industry tariff and never refuses a rental.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    /// Flat tariff used as the baseline price (EUR/MWh).
    pub tariff_eur_mwh: f32,
    /// Penalty per MWh of undelivered commitment (EUR/MWh).
    pub imbalance_price_eur_mwh: f32,
    /// Money actually paid for charging energy.
    pub energy_cost_eur: f32,
    /// Tariff cost of the same energy minus what was actually paid.
    pub savings_eur: f32,
    pub imbalance_cost_eur: f32,
    pub rental_revenue_eur: f32,
    pub lost_rentals_eur: f32,
    pub refused_rentals: u32,
    booked_imbalance_kwh: f32,
}

impl Account {
    pub fn new(tariff_eur_mwh: f32, imbalance_price_eur_mwh: f32) -> Self {
        Self {
            tariff_eur_mwh,
            imbalance_price_eur_mwh,
            ..Self::default()
        }
    }

    /// Books the energy of completed charge operations.
    pub fn settle(&mut self, charges: &CompletedCharges) {
        let baseline = charges.total_kwh() * self.tariff_eur_mwh / 1000.0;
        self.energy_cost_eur += charges.cost_eur;
        self.savings_eur += baseline - charges.cost_eur;
    }

    /// Books imbalance up to the running total `imbalance_kwh`.
    ///
    /// Only the increase since the previous call is charged.
    pub fn book_imbalance(&mut self, imbalance_kwh: f32) {
        let new_kwh = (imbalance_kwh - self.booked_imbalance_kwh).max(0.0);
        self.imbalance_cost_eur += new_kwh * self.imbalance_price_eur_mwh / 1000.0;
        self.booked_imbalance_kwh = self.booked_imbalance_kwh.max(imbalance_kwh);
    }

    pub fn book_rental(&mut self, revenue_eur: f32) {
        self.rental_revenue_eur += revenue_eur;
    }

    pub fn book_refusal(&mut self, revenue_eur: f32) {
        self.lost_rentals_eur += revenue_eur;
        self.refused_rentals += 1;
    }

    /// Net gain of the strategy over the tariff baseline.
    pub fn profit_eur(&self) -> f32 {
        self.savings_eur - self.imbalance_cost_eur - self.lost_rentals_eur
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_energy_below_tariff_is_a_saving() {
        let mut account = Account::new(40.0, 100.0);
        account.settle(&CompletedCharges {
            balancing_kwh: 10.0,
            regular_kwh: 10.0,
            cost_eur: 10.0 * 30.0 / 1000.0 + 10.0 * 40.0 / 1000.0,
            jobs: 4,
            ..CompletedCharges::default()
        });
        assert!((account.savings_eur - 0.1).abs() < 1e-6);
        assert!((account.energy_cost_eur - 0.7).abs() < 1e-6);
    }

    #[test]
    fn imbalance_is_charged_once() {
        let mut account = Account::new(40.0, 100.0);
        account.book_imbalance(5.0);
        account.book_imbalance(5.0);
        account.book_imbalance(7.5);
        assert!((account.imbalance_cost_eur - 0.75).abs() < 1e-6);
    }

    #[test]
    fn refusals_reduce_profit() {
        let mut account = Account::new(40.0, 100.0);
        account.book_refusal(3.6);
        account.book_rental(2.4);
        assert_eq!(account.refused_rentals, 1);
        assert!((account.profit_eur() + 3.6).abs() < 1e-6);
        assert!((account.rental_revenue_eur - 2.4).abs() < 1e-6);
    }
}
