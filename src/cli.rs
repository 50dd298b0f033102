//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// EV car-sharing fleet simulator selling spare charging capacity into the
/// balancing and intraday markets.
///
/// If no `--scenario` or `--preset` is given, the baseline preset is used.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Load the scenario from a TOML file.
    #[clap(long, env = "FLEET_VPP_SCENARIO", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset: baseline, balancing or intraday.
    #[clap(long)]
    pub preset: Option<String>,

    /// Override the random seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Override the bidding strategy: regular, balancing or intraday.
    #[clap(long)]
    pub strategy: Option<String>,

    /// Export the step log to a CSV file.
    #[clap(long = "telemetry-out")]
    pub telemetry_out: Option<PathBuf>,

    /// Print every step record, not only the KPI report.
    #[clap(long)]
    pub steps: bool,

    /// Raise log verbosity (`-v` debug, `-vv` trace).
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_empty() {
        let args = Args::try_parse_from(["fleet-vpp-sim"]).ok();
        assert!(args.is_some());
        let Some(args) = args else { return };
        assert!(args.scenario.is_none());
        assert!(args.preset.is_none());
        assert_eq!(args.verbose, 0);
        assert!(!args.steps);
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "fleet-vpp-sim",
            "--preset",
            "balancing",
            "--seed",
            "7",
            "--strategy",
            "intraday",
            "--telemetry-out",
            "out.csv",
            "-vv",
        ])
        .ok();
        assert_eq!(args.as_ref().and_then(|a| a.preset.as_deref()), Some("balancing"));
        assert_eq!(args.as_ref().and_then(|a| a.seed), Some(7));
        assert_eq!(args.as_ref().and_then(|a| a.strategy.as_deref()), Some("intraday"));
        assert_eq!(
            args.as_ref().and_then(|a| a.telemetry_out.clone()),
            Some(PathBuf::from("out.csv"))
        );
        assert_eq!(args.as_ref().map(|a| a.verbose), Some(2));
    }

    #[test]
    fn scenario_and_preset_conflict() {
        let args = Args::try_parse_from([
            "fleet-vpp-sim",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
        ]);
        assert!(args.is_err());
    }

    #[test]
    fn bad_seed_is_rejected() {
        assert!(Args::try_parse_from(["fleet-vpp-sim", "--seed", "many"]).is_err());
    }
}
