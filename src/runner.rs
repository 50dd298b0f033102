//! Config-driven engine construction and scenario execution.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, PriceCurveConfig, ScenarioConfig};
use crate::fleet::{Fleet, RentalModel};
use crate::forecast::CapacityForecast;
use crate::io::load::{self, LoadError};
use crate::market::{MarketKind, PriceTableMarket};
use crate::profile::DailyProfile;
use crate::sim::account::Account;
use crate::sim::controller::{Controller, ControllerParams};
use crate::sim::engine::Engine;
use crate::sim::error::SimError;
use crate::sim::kpi::KpiReport;
use crate::sim::timeslot::{BLOCK_SECS, BLOCKS_PER_DAY, SLOT_SECS, Timeslot, block_start};
use crate::sim::types::{SimConfig, StepResult};

/// Seed offsets so the random streams do not correlate.
const RENTAL_SEED_OFFSET: u64 = 1;
const BALANCING_SEED_OFFSET: u64 = 2;
const INTRADAY_SEED_OFFSET: u64 = 3;
const CAPACITY_SEED_OFFSET: u64 = 4;

/// Failure to build or run a scenario.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid scenario: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ConfigError>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Outcome of a complete run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub results: Vec<StepResult>,
    pub kpi: KpiReport,
}

/// Builds an engine from a validated scenario.
///
/// Price tables and the capacity series come from CSV files when the
/// scenario names them, otherwise from seeded synthetic daily curves
/// covering the run plus one day of look-ahead.
///
/// # Errors
///
/// Returns [`RunError::Invalid`] with every validation error, or a
/// [`RunError::Load`] if an input file cannot be read.
pub fn build_engine(cfg: &ScenarioConfig) -> Result<Engine<PriceTableMarket>, RunError> {
    let errors = cfg.validate();
    if !errors.is_empty() {
        return Err(RunError::Invalid(errors));
    }

    let s = &cfg.simulation;
    let start = cfg.start_timestamp()?;
    let sim = SimConfig::new(start, s.days, s.timestep_min, s.seed);
    let horizon_days = s.days + 1;

    let balancing = PriceTableMarket::new(
        MarketKind::Balancing.label(),
        price_table(
            cfg.market.balancing_prices.as_deref(),
            &cfg.market.balancing_curve,
            start,
            horizon_days,
            s.seed.wrapping_add(BALANCING_SEED_OFFSET),
        )?,
    );
    let intraday = PriceTableMarket::new(
        MarketKind::Intraday.label(),
        price_table(
            cfg.market.intraday_prices.as_deref(),
            &cfg.market.intraday_curve,
            start,
            horizon_days,
            s.seed.wrapping_add(INTRADAY_SEED_OFFSET),
        )?,
    );
    let capacity = capacity_forecast(cfg, start, horizon_days)?;
    info!(
        balancing_prices = balancing.len(),
        intraday_prices = intraday.len(),
        capacity_points = capacity.len(),
        "Inputs ready"
    );

    let f = &cfg.fleet;
    let params = ControllerParams {
        refuse_rentals: cfg.rentals.refuse_rentals,
        utc_offset: cfg.utc_offset()?,
        bid_capacity: cfg.bid_capacity()?,
        ..ControllerParams::new(f.charger_kw, cfg.market.industry_tariff_eur_mwh)
    };
    let controller = Controller::new(cfg.strategy()?, params, balancing, intraday, capacity)
        .with_dispatch_order(cfg.dispatch_order()?);

    let fleet = Fleet::seeded(
        f.vehicles,
        f.battery_kwh,
        f.eta_charge,
        f.initial_soc_min,
        f.initial_soc_max,
        s.seed,
    );

    let r = &cfg.rentals;
    let rentals = if r.enabled {
        RentalModel::new(
            r.request_prob,
            r.trip_minutes_min,
            r.trip_minutes_max,
            r.consumption_kw,
            r.revenue_eur_per_min,
            r.min_soc_pct,
            s.seed.wrapping_add(RENTAL_SEED_OFFSET),
        )
    } else {
        RentalModel::disabled()
    };

    let account = Account::new(
        cfg.market.industry_tariff_eur_mwh,
        s.imbalance_price_eur_mwh,
    );

    Ok(Engine::new(sim, controller, fleet, rentals, account))
}

/// Builds the engine, runs every tick and computes the KPI report.
///
/// # Errors
///
/// Returns a [`RunError`] if the scenario is invalid, an input cannot be
/// loaded, or a tick fails.
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<ScenarioRun, RunError> {
    let mut engine = build_engine(cfg)?;
    info!(
        strategy = %engine.controller().strategy(),
        vehicles = engine.fleet().len(),
        steps = engine.config().total_steps(),
        "Starting run"
    );
    let results = engine.run()?;
    let kpi = KpiReport::from_results(&results);
    Ok(ScenarioRun { results, kpi })
}

fn price_table(
    path: Option<&Path>,
    curve: &PriceCurveConfig,
    start: Timeslot,
    days: usize,
    seed: u64,
) -> Result<BTreeMap<Timeslot, f32>, LoadError> {
    if let Some(path) = path {
        return load::load_prices(path);
    }
    let mut profile = DailyProfile::new(curve.base, curve.amp, curve.phase_rad, curve.noise_std, seed);
    Ok(profile.series(block_start(start), BLOCK_SECS, days * BLOCKS_PER_DAY + 1))
}

fn capacity_forecast(
    cfg: &ScenarioConfig,
    start: Timeslot,
    days: usize,
) -> Result<CapacityForecast, LoadError> {
    let c = &cfg.capacity;
    if let Some(path) = c.file.as_deref() {
        return load::load_capacity(path).map(CapacityForecast::new);
    }
    let max_kw = cfg.fleet.vehicles as f32 * cfg.fleet.charger_kw;
    let slots_per_day = (86_400 / SLOT_SECS) as usize;
    let mut profile = DailyProfile::new(
        c.base_kw,
        c.amp_kw,
        c.phase_rad,
        c.noise_std,
        cfg.simulation.seed.wrapping_add(CAPACITY_SEED_OFFSET),
    )
    .clamped(0.0, max_kw);
    Ok(CapacityForecast::new(profile.series(
        block_start(start),
        SLOT_SECS,
        days * slots_per_day + 3,
    )))
}
