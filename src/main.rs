//! Fleet VPP simulator entry point: CLI wiring and config-driven runs.

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use fleet_vpp_sim::cli::Args;
use fleet_vpp_sim::config::ScenarioConfig;
use fleet_vpp_sim::io::export::export_csv;
use fleet_vpp_sim::runner::run_scenario;
use fleet_vpp_sim::telemetry::init_tracing;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // --scenario takes priority, then --preset, then the baseline default
    let mut scenario = if let Some(path) = &args.scenario {
        ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?
    } else if let Some(name) = &args.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = args.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(strategy) = &args.strategy {
        scenario.simulation.strategy.clone_from(strategy);
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario has {} invalid field(s)", errors.len());
    }

    let run = run_scenario(&scenario).context("simulation failed")?;

    if args.steps {
        for r in &run.results {
            println!("{r}");
        }
        println!();
    }
    println!("{}", run.kpi);

    if let Some(path) = &args.telemetry_out {
        export_csv(&run.results, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        info!(path = %path.display(), rows = run.results.len(), "Telemetry written");
    }

    Ok(())
}
