//! Command-line interface definitions and parsing

use std::path::PathBuf;

use betocq_harness::Fault;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "betocq", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (falls back to BETOCQ_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the built-in scenarios
    List,
    /// Print an annotated example configuration
    ShowConfig {
        /// Print the loaded configuration instead of the example
        #[arg(long)]
        effective: bool,
    },
    /// Run scenarios against two real devices
    Run {
        /// Scenario id, repeatable; every enabled scenario when omitted
        #[arg(short, long = "scenario")]
        scenarios: Vec<String>,
        /// Serial of the discoverer device
        #[arg(long)]
        source: String,
        /// Serial of the advertiser device
        #[arg(long)]
        target: String,
        /// Replace each scenario's planned iteration count
        #[arg(long)]
        iterations: Option<u32>,
    },
    /// Run scenarios against scripted mock devices
    Simulate {
        /// Scenario id, repeatable; every enabled scenario when omitted
        #[arg(short, long = "scenario")]
        scenarios: Vec<String>,
        /// Break one step of the connection life cycle
        #[arg(long)]
        fail_phase: Option<Fault>,
        /// How many times the fault fires; every time when omitted
        #[arg(long, requires = "fail_phase")]
        fault_count: Option<u32>,
        /// Replace each scenario's planned iteration count
        #[arg(long)]
        iterations: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "betocq",
            "simulate",
            "--scenario",
            "bt_performance",
            "--fail-phase",
            "wrong_direction",
            "--iterations",
            "3",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Simulate {
                scenarios,
                fail_phase,
                fault_count,
                iterations,
            } => {
                assert_eq!(scenarios, vec!["bt_performance"]);
                assert_eq!(fail_phase, Some(Fault::WrongDirection));
                assert_eq!(fault_count, None);
                assert_eq!(iterations, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_requires_devices() {
        assert!(Cli::try_parse_from(["betocq", "run", "--source", "A"]).is_err());
        let cli = Cli::try_parse_from(["betocq", "-v", "run", "--source", "A", "--target", "B"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Run { ref scenarios, .. } if scenarios.is_empty()));
    }

    #[test]
    fn test_parse_rejects_unknown_fault() {
        let err = Cli::try_parse_from(["betocq", "simulate", "--fail-phase", "gremlins"]).unwrap_err();
        assert!(err.to_string().contains("gremlins"));
    }

    #[test]
    fn test_fault_count_needs_fault() {
        assert!(Cli::try_parse_from(["betocq", "simulate", "--fault-count", "2"]).is_err());
    }
}
