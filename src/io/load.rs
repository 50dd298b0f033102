//! CSV loaders for market clearing prices and fleet-capacity series.
//!
//! Price tables have the columns `timestamp,clearing_price_eur_mwh`, one row
//! per quarter-hour contract. Capacity series have the columns
//! `timestamp,vpp_capacity_kw`, one row per 5-minute slot. Timestamps are
//! POSIX seconds.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::sim::timeslot::{BLOCK_SECS, SLOT_SECS, Timeslot};

/// Failure while reading an input series.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin}: timestamp {timestamp} is not a multiple of {grid_secs} s")]
    OffGrid {
        origin: String,
        timestamp: Timeslot,
        grid_secs: i64,
    },

    #[error("{origin}: timestamp {timestamp} appears more than once")]
    Duplicate { origin: String, timestamp: Timeslot },

    #[error("{origin}: negative capacity {value} at {timestamp}")]
    NegativeCapacity {
        origin: String,
        timestamp: Timeslot,
        value: f32,
    },
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    timestamp: Timeslot,
    clearing_price_eur_mwh: f32,
}

#[derive(Debug, Deserialize)]
struct CapacityRow {
    timestamp: Timeslot,
    vpp_capacity_kw: f32,
}

/// Loads a clearing-price table from a CSV file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be opened, a row does not
/// parse, a timestamp is off the quarter-hour grid or repeats.
pub fn load_prices(path: &Path) -> Result<BTreeMap<Timeslot, f32>, LoadError> {
    let origin = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::Io {
        origin: origin.clone(),
        source,
    })?;
    read_prices(file, &origin)
}

/// Reads a clearing-price table from any reader; `origin` names it in errors.
///
/// # Errors
///
/// See [`load_prices`].
pub fn read_prices(reader: impl Read, origin: &str) -> Result<BTreeMap<Timeslot, f32>, LoadError> {
    read_series::<PriceRow, _>(reader, origin, BLOCK_SECS, |row| {
        Ok((row.timestamp, row.clearing_price_eur_mwh))
    })
}

/// Loads a fleet-capacity series from a CSV file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be opened, a row does not
/// parse, a timestamp is off the 5-minute grid or repeats, or a capacity is
/// negative.
pub fn load_capacity(path: &Path) -> Result<BTreeMap<Timeslot, f32>, LoadError> {
    let origin = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::Io {
        origin: origin.clone(),
        source,
    })?;
    read_capacity(file, &origin)
}

/// Reads a fleet-capacity series from any reader.
///
/// # Errors
///
/// See [`load_capacity`].
pub fn read_capacity(
    reader: impl Read,
    origin: &str,
) -> Result<BTreeMap<Timeslot, f32>, LoadError> {
    read_series::<CapacityRow, _>(reader, origin, SLOT_SECS, |row| {
        if row.vpp_capacity_kw < 0.0 {
            return Err(LoadError::NegativeCapacity {
                origin: origin.to_string(),
                timestamp: row.timestamp,
                value: row.vpp_capacity_kw,
            });
        }
        Ok((row.timestamp, row.vpp_capacity_kw))
    })
}

fn read_series<T, F>(
    reader: impl Read,
    origin: &str,
    grid_secs: i64,
    mut to_point: F,
) -> Result<BTreeMap<Timeslot, f32>, LoadError>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(T) -> Result<(Timeslot, f32), LoadError>,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut series = BTreeMap::new();
    for row in rdr.deserialize::<T>() {
        let row = row.map_err(|source| LoadError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        let (timestamp, value) = to_point(row)?;
        if timestamp.rem_euclid(grid_secs) != 0 {
            return Err(LoadError::OffGrid {
                origin: origin.to_string(),
                timestamp,
                grid_secs,
            });
        }
        if series.insert(timestamp, value).is_some() {
            return Err(LoadError::Duplicate {
                origin: origin.to_string(),
                timestamp,
            });
        }
    }
    Ok(series)
}
