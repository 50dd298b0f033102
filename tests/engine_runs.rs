//! End-to-end runs of the simulation engine.

mod common;

use common::MONDAY;
use fleet_vpp_sim::config::PriceCurveConfig;
use fleet_vpp_sim::fleet::RentalModel;
use fleet_vpp_sim::io::export::write_csv;
use fleet_vpp_sim::market::MarketKind;
use fleet_vpp_sim::runner::{RunError, build_engine, run_scenario};
use fleet_vpp_sim::sim::account::Account;
use fleet_vpp_sim::sim::engine::Engine;
use fleet_vpp_sim::sim::error::SimError;
use fleet_vpp_sim::sim::strategy::Strategy;
use fleet_vpp_sim::sim::types::SimConfig;

#[test]
fn full_run_produces_one_record_per_tick() {
    let run = run_scenario(&common::small_scenario("baseline")).unwrap();
    assert_eq!(run.results.len(), 2 * 288);
    assert_eq!(run.kpi.steps, 2 * 288);
    assert!(run.results.windows(2).all(|w| w[1].timestamp - w[0].timestamp == 300));
}

#[test]
fn determinism_two_identical_runs_produce_identical_results() {
    for preset in ["baseline", "balancing", "intraday"] {
        let cfg = common::small_scenario(preset);
        let first = run_scenario(&cfg).unwrap();
        let second = run_scenario(&cfg).unwrap();
        assert_eq!(first.results, second.results, "preset {preset} diverged");
        assert_eq!(first.kpi, second.kpi);
    }
}

#[test]
fn different_seeds_produce_different_runs() {
    let cfg = common::small_scenario("intraday");
    let mut other = cfg.clone();
    other.simulation.seed = cfg.simulation.seed + 1;
    let a = run_scenario(&cfg).unwrap();
    let b = run_scenario(&other).unwrap();
    assert_ne!(a.results, b.results);
}

#[test]
fn every_available_vehicle_gets_exactly_one_source() {
    for preset in ["baseline", "balancing", "intraday"] {
        let run = run_scenario(&common::small_scenario(preset)).unwrap();
        for r in &run.results {
            assert_eq!(
                r.balancing_evs + r.intraday_evs + r.regular_evs,
                r.available_evs,
                "preset {preset} at {}",
                r.timestamp
            );
        }
    }
}

#[test]
fn imbalance_and_charged_energy_never_decrease() {
    for preset in ["balancing", "intraday"] {
        let run = run_scenario(&common::small_scenario(preset)).unwrap();
        for w in run.results.windows(2) {
            assert!(w[1].imbalance_kwh >= w[0].imbalance_kwh);
            assert!(w[1].total_charged_kwh >= w[0].total_charged_kwh);
            assert!(w[1].charged_regular_kwh >= w[0].charged_regular_kwh);
        }
        assert!(run.results.iter().all(|r| r.imbalance_kwh >= 0.0));
    }
}

#[test]
fn baseline_never_bids_and_breaks_even() {
    let run = run_scenario(&common::small_scenario("baseline")).unwrap();
    assert_eq!(run.kpi.bids_submitted, 0);
    assert_eq!(run.kpi.charged_vpp_kwh, 0.0);
    assert_eq!(run.kpi.peak_committed_kw, 0.0);
    assert!(run.kpi.charged_regular_kwh > 0.0);
    assert!(run.kpi.profit_eur.abs() < 1e-3);
}

#[test]
fn market_strategies_buy_energy() {
    for preset in ["balancing", "intraday"] {
        let run = run_scenario(&common::small_scenario(preset)).unwrap();
        assert!(run.kpi.bids_accepted > 0, "preset {preset} bought nothing");
        assert!(run.kpi.charged_vpp_kwh > 0.0);
        assert!(run.kpi.peak_committed_kw > 0.0);
    }
}

#[test]
fn rentals_are_refused_while_the_whole_fleet_is_committed() {
    let mut cfg = common::small_scenario("balancing");
    cfg.fleet.charger_kw = 5.0;
    cfg.market.balancing_curve = PriceCurveConfig {
        base: 10.0,
        amp: 0.0,
        phase_rad: 0.0,
        noise_std: 0.0,
    };
    cfg.capacity.base_kw = 1_000.0;
    cfg.capacity.amp_kw = 0.0;
    cfg.capacity.noise_std = 0.0;
    cfg.rentals.request_prob = 0.2;
    assert!(cfg.rentals.refuse_rentals);

    let run = run_scenario(&cfg).unwrap();

    // Day one is uncommitted, day two is fully committed from the gate bid.
    assert!(run.results[..288].iter().all(|r| r.refused_rentals == 0));
    assert!(run.kpi.refused_rentals > 0);
    assert!(run.kpi.lost_rentals_eur > 0.0);
    assert!(run.kpi.bids_accepted >= 96);
}

#[test]
fn telemetry_csv_has_header_and_one_row_per_tick() {
    let run = run_scenario(&common::small_scenario("intraday")).unwrap();
    let mut buf = Vec::new();
    write_csv(&run.results, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), 1 + run.results.len());
    assert!(text.starts_with("timestamp,"));
}

#[test]
fn built_engine_uses_configured_strategy() {
    let engine = build_engine(&common::small_scenario("intraday")).unwrap();
    assert_eq!(engine.controller().strategy(), Strategy::Intraday);
    assert!(engine.controller().plan(MarketKind::Intraday).is_empty());
    assert!(engine.controller().params().utc_offset.local_minus_utc() == 3_600);
    for kind in [MarketKind::Balancing, MarketKind::Intraday] {
        assert_eq!(engine.controller().plan(kind).name(), kind.label());
    }
}

#[test]
fn plan_violation_stops_the_run() {
    let tuesday = MONDAY + 86_400;
    let gate = MONDAY + 16 * 3_600;
    let mut controller = common::controller(
        Strategy::Balancing,
        common::flat_prices(tuesday, 96, 30.0),
        common::flat_capacity(tuesday, 288, 20.0),
    );
    controller
        .plan_mut(MarketKind::Balancing)
        .add(tuesday + 300, 1.0)
        .unwrap();
    let mut engine = Engine::new(
        SimConfig::new(MONDAY, 1, 5, 0),
        controller,
        common::uniform_fleet(6, 50.0),
        RentalModel::disabled(),
        Account::new(common::TARIFF, 100.0),
    );

    let err = engine.run().unwrap_err();

    assert!(matches!(err, SimError::PlanViolation { timeslot, .. } if timeslot == gate));
    assert_eq!(engine.controller().state().bids_submitted, 96);
}

#[test]
fn market_offset_must_sit_on_the_quarter_hour_grid() {
    let mut cfg = common::small_scenario("balancing");
    cfg.simulation.start = "2017-01-02T00:00:00Z".to_string();
    cfg.market.utc_offset_minutes = 60;
    assert!(run_scenario(&cfg).unwrap().kpi.bids_submitted > 0);

    // A 20 minute offset would put every next-day block off the price grid.
    cfg.market.utc_offset_minutes = 20;
    let err = build_engine(&cfg).map(|_| ()).unwrap_err();
    assert!(matches!(
        err,
        RunError::Invalid(ref errors) if errors.iter().any(|e| e.field == "market.utc_offset_minutes")
    ));
}
