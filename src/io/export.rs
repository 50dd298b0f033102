//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header of the step log.
const HEADER: &str = "timestamp,available_evs,balancing_evs,intraday_evs,regular_evs,\
                      rentals_started,committed_capacity_kw,imbalance_kwh,total_charged_kwh,\
                      charged_regular_kwh,bids_submitted,bids_accepted,profit_eur,\
                      lost_rentals_eur,refused_rentals,mean_soc_pct";

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per tick. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.timestamp.to_string(),
            r.available_evs.to_string(),
            r.balancing_evs.to_string(),
            r.intraday_evs.to_string(),
            r.regular_evs.to_string(),
            r.rentals_started.to_string(),
            format!("{:.3}", r.committed_capacity_kw),
            format!("{:.4}", r.imbalance_kwh),
            format!("{:.4}", r.total_charged_kwh),
            format!("{:.4}", r.charged_regular_kwh),
            r.bids_submitted.to_string(),
            r.bids_accepted.to_string(),
            format!("{:.4}", r.profit_eur),
            format!("{:.2}", r.lost_rentals_eur),
            r.refused_rentals.to_string(),
            format!("{:.2}", r.mean_soc_pct),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
