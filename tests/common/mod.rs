//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use chrono::FixedOffset;
use fleet_vpp_sim::config::ScenarioConfig;
use fleet_vpp_sim::fleet::{Battery, Fleet, Vehicle, VehicleId};
use fleet_vpp_sim::forecast::CapacityForecast;
use fleet_vpp_sim::market::{Commitment, Market};
use fleet_vpp_sim::sim::controller::{Controller, ControllerParams};
use fleet_vpp_sim::sim::strategy::Strategy;
use fleet_vpp_sim::sim::timeslot::{BLOCK_SECS, SLOT_SECS, Timeslot};
use tracing_subscriber::fmt::MakeWriter;

/// 2017-01-02T00:00:00Z, a Monday.
pub const MONDAY: Timeslot = 1_483_315_200;

/// Industry tariff used by the controller fixtures (EUR/MWh).
pub const TARIFF: f32 = 40.0;

/// Charger power used by the controller fixtures (kW).
pub const CHARGER_KW: f32 = 5.0;

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// A market that clears at a fixed price table and records every bid.
///
/// With `accept` unset every bid is rejected regardless of price.
#[derive(Debug, Clone)]
pub struct RecordingMarket {
    pub name: String,
    pub prices: BTreeMap<Timeslot, f32>,
    pub accept: bool,
    /// `(timeslot, price_eur_mwh, capacity_kw)` in submission order.
    pub bids: Vec<(Timeslot, f32, f32)>,
}

impl RecordingMarket {
    pub fn new(name: &str, prices: BTreeMap<Timeslot, f32>) -> Self {
        Self {
            name: name.to_string(),
            prices,
            accept: true,
            bids: Vec::new(),
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.accept = false;
        self
    }
}

impl Market for RecordingMarket {
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
        self.bids.push((timeslot, price_eur_mwh, capacity_kw));
        self.accept.then_some(Commitment {
            timeslot,
            capacity_kw,
            price_eur_mwh,
        })
    }
}

/// `blocks` quarter-hour prices starting at `start`, all equal to `price`.
pub fn flat_prices(start: Timeslot, blocks: usize, price: f32) -> BTreeMap<Timeslot, f32> {
    (0..blocks as i64)
        .map(|i| (start + i * BLOCK_SECS, price))
        .collect()
}

/// `slots` five-minute capacity points starting at `start`, all equal to `kw`.
pub fn flat_capacity(start: Timeslot, slots: usize, kw: f32) -> CapacityForecast {
    CapacityForecast::new(
        (0..slots as i64)
            .map(|i| (start + i * SLOT_SECS, kw))
            .collect(),
    )
}

/// Fleet of `count` vehicles, all at `level` percent.
pub fn uniform_fleet(count: u32, level: f32) -> Fleet {
    Fleet::seeded(count, 17.6, 1.0, level, level, 0)
}

/// Fleet whose vehicle `i` is at `levels[i]` percent.
pub fn fleet_with_levels(levels: &[f32]) -> Fleet {
    Fleet::new(
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| Vehicle::new(VehicleId(i as u32), Battery::new(17.6, level, 1.0))),
    )
}

/// Controller over two recording markets sharing `prices`, UTC market time.
pub fn controller(
    strategy: Strategy,
    prices: BTreeMap<Timeslot, f32>,
    capacity: CapacityForecast,
) -> Controller<RecordingMarket> {
    let params = ControllerParams {
        utc_offset: utc(),
        ..ControllerParams::new(CHARGER_KW, TARIFF)
    };
    Controller::new(
        strategy,
        params,
        RecordingMarket::new("Balancing", prices.clone()),
        RecordingMarket::new("Intraday", prices),
        capacity,
    )
}

/// A short scenario with a small fleet, for end-to-end runs.
pub fn small_scenario(preset: &str) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::from_preset(preset).unwrap();
    cfg.simulation.days = 2;
    cfg.fleet.vehicles = 12;
    cfg.capacity.base_kw = 30.0;
    cfg.capacity.amp_kw = 10.0;
    cfg
}

/// Collects formatted log lines emitted while a closure runs.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Runs `f` with a thread-local subscriber writing into this buffer.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .without_time()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines containing `needle`.
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.text()
            .lines()
            .filter(|l| l.contains(needle))
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
