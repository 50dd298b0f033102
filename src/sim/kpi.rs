//! Post-hoc KPI computation from simulation results.

use std::fmt;

use super::types::StepResult;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiReport {
    /// Ticks simulated.
    pub steps: usize,
    /// Nominal energy dispatched against market commitments (kWh), counted
    /// as vehicles times charger power times tick length.
    pub charged_vpp_kwh: f32,
    /// Energy actually drawn at the industry tariff (kWh).
    pub charged_regular_kwh: f32,
    /// Undeliverable commitment at the end of the run (kWh).
    pub imbalance_kwh: f32,
    /// Profit over the tariff baseline (EUR).
    pub profit_eur: f32,
    /// Revenue given up by refusing rentals (EUR).
    pub lost_rentals_eur: f32,
    pub refused_rentals: u32,
    pub rentals_started: usize,
    pub bids_submitted: u32,
    pub bids_accepted: u32,
    /// Highest per-tick committed capacity (kW).
    pub peak_committed_kw: f32,
    /// Ticks in which at least one committed vehicle was missing.
    pub shortfall_steps: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    ///
    /// # Returns
    ///
    /// A `KpiReport` with all fields populated, all zero for an empty run.
    pub fn from_results(results: &[StepResult]) -> Self {
        let Some(last) = results.last() else {
            return Self::default();
        };

        let mut report = Self {
            steps: results.len(),
            charged_vpp_kwh: last.total_charged_kwh,
            charged_regular_kwh: last.charged_regular_kwh,
            imbalance_kwh: last.imbalance_kwh,
            profit_eur: last.profit_eur,
            lost_rentals_eur: last.lost_rentals_eur,
            refused_rentals: last.refused_rentals,
            ..Self::default()
        };

        let mut prev_imbalance = 0.0_f32;
        for r in results {
            report.rentals_started += r.rentals_started;
            report.bids_submitted += r.bids_submitted;
            report.bids_accepted += r.bids_accepted;
            report.peak_committed_kw = report.peak_committed_kw.max(r.committed_capacity_kw);
            if r.imbalance_kwh > prev_imbalance {
                report.shortfall_steps += 1;
            }
            prev_imbalance = r.imbalance_kwh;
        }

        report
    }

    /// Share of submitted bids the markets accepted (%).
    pub fn acceptance_pct(&self) -> f32 {
        if self.bids_submitted == 0 {
            0.0
        } else {
            100.0 * self.bids_accepted as f32 / self.bids_submitted as f32
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Steps simulated:       {}", self.steps)?;
        writeln!(f, "VPP (nominal):         {:.2} kWh", self.charged_vpp_kwh)?;
        writeln!(f, "Charged regularly:     {:.2} kWh drawn", self.charged_regular_kwh)?;
        writeln!(
            f,
            "Imbalance:             {:.2} kWh ({} ticks short)",
            self.imbalance_kwh, self.shortfall_steps
        )?;
        writeln!(
            f,
            "Bids accepted:         {}/{} ({:.1}%)",
            self.bids_accepted,
            self.bids_submitted,
            self.acceptance_pct()
        )?;
        writeln!(f, "Peak committed:        {:.2} kW", self.peak_committed_kw)?;
        writeln!(
            f,
            "Rentals:               {} started, {} refused ({:.2} EUR lost)",
            self.rentals_started, self.refused_rentals, self.lost_rentals_eur
        )?;
        write!(f, "Profit:                {:.2} EUR", self.profit_eur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(imbalance_kwh: f32, committed_capacity_kw: f32, bids: u32) -> StepResult {
        StepResult {
            timestamp: 0,
            available_evs: 10,
            balancing_evs: 0,
            intraday_evs: 0,
            regular_evs: 10,
            rentals_started: 1,
            committed_capacity_kw,
            imbalance_kwh,
            total_charged_kwh: 4.0,
            charged_regular_kwh: 8.0,
            bids_submitted: bids,
            bids_accepted: bids / 2,
            profit_eur: 1.5,
            lost_rentals_eur: 0.5,
            refused_rentals: 2,
            mean_soc_pct: 50.0,
        }
    }

    #[test]
    fn empty_results_are_zero() {
        assert_eq!(KpiReport::from_results(&[]), KpiReport::default());
    }

    #[test]
    fn sums_and_peaks() {
        let results = vec![
            make_result(0.0, 10.0, 2),
            make_result(0.8, 25.0, 4),
            make_result(0.8, 5.0, 0),
            make_result(1.6, 0.0, 0),
        ];
        let kpi = KpiReport::from_results(&results);
        assert_eq!(kpi.steps, 4);
        assert_eq!(kpi.bids_submitted, 6);
        assert_eq!(kpi.bids_accepted, 3);
        assert_eq!(kpi.peak_committed_kw, 25.0);
        assert_eq!(kpi.shortfall_steps, 2);
        assert_eq!(kpi.rentals_started, 4);
        assert_eq!(kpi.imbalance_kwh, 1.6);
        assert_eq!(kpi.refused_rentals, 2);
        assert!((kpi.acceptance_pct() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn display_does_not_panic() {
        let kpi = KpiReport::from_results(&[make_result(0.0, 0.0, 0)]);
        assert!(format!("{kpi}").contains("KPI Report"));
    }

    #[test]
    fn display_marks_vpp_energy_as_nominal() {
        let kpi = KpiReport::from_results(&[make_result(0.0, 0.0, 0)]);
        let text = format!("{kpi}");
        assert!(text.contains("VPP (nominal):         4.00 kWh"));
        assert!(text.contains("Charged regularly:     8.00 kWh drawn"));
    }
}
