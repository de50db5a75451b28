//! Command execution
//!
//! Each subcommand gets its own runtime: `simulate` runs on a current-thread
//! runtime with a paused clock so mock timeouts and settle waits elapse
//! instantly, `run` uses the multi-threaded one for real sockets.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use betocq_core::{
    run_scenario, run_suite, DeviceHandle, RunContext, RunIdentifier, ScenarioReport, ScenarioSpec,
    SuiteConfig, TestParameters,
};
use betocq_harness::{with_simulation_defaults, Fault, FaultPlan, MockPair};
use betocq_snippet::{AdbIperfRunner, AndroidDevice};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Dispatch
// ----------------------------------------------------------------------------

pub fn execute(cli: Cli) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::List => print_catalog(&mut out, cli.json),
        Commands::ShowConfig { effective } => {
            if effective {
                let config = SuiteConfig::load(cli.config.as_deref())?;
                print_config(&mut out, &config, cli.json)
            } else {
                writeln!(out, "{}", SuiteConfig::example_toml())?;
                Ok(())
            }
        }
        Commands::Run {
            scenarios,
            source,
            target,
            iterations,
        } => {
            let config = SuiteConfig::load(cli.config.as_deref())?;
            let specs = select_scenarios(&scenarios, &config.parameters)?;
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            let reports = runtime.block_on(run_devices(config, &source, &target, &specs, iterations))?;
            print_reports(&mut out, &reports, cli.json)?;
            check_outcome(&reports)
        }
        Commands::Simulate {
            scenarios,
            fail_phase,
            fault_count,
            iterations,
        } => {
            let config = load_simulation_config(cli.config.as_deref())?;
            let specs = select_scenarios(&scenarios, &config.parameters)?;
            let options = SimulateOptions {
                faults: fault_plan(fail_phase, fault_count),
                iterations,
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()?;
            let reports = runtime.block_on(simulate(config, &specs, options));
            print_reports(&mut out, &reports, cli.json)?;
            check_outcome(&reports)
        }
    }
}

/// Scenarios by id in the given order. Without ids, every scenario the
/// parameters enable.
pub fn select_scenarios(ids: &[String], params: &TestParameters) -> Result<Vec<ScenarioSpec>> {
    if ids.is_empty() {
        return Ok(ScenarioSpec::all()
            .into_iter()
            .filter(|spec| spec.is_enabled_by(params))
            .collect());
    }
    ids.iter()
        .map(|id| ScenarioSpec::by_id(id).map_err(CliError::from))
        .collect()
}

/// FAIL when any scenario failed; skipped scenarios count as passed
pub fn check_outcome(reports: &[ScenarioReport]) -> Result<()> {
    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(CliError::ScenariosFailed {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Catalog and Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    pub id: &'static str,
    pub description: &'static str,
    pub upgrade_medium: String,
    pub iterations: u32,
    pub success_rate_target: f64,
}

impl From<&ScenarioSpec> for ScenarioSummary {
    fn from(spec: &ScenarioSpec) -> Self {
        Self {
            id: spec.id,
            description: spec.description,
            upgrade_medium: spec.upgrade_medium.to_string(),
            iterations: spec.iterations,
            success_rate_target: spec.success_rate_target,
        }
    }
}

pub fn scenario_catalog() -> Vec<ScenarioSummary> {
    ScenarioSpec::all().iter().map(ScenarioSummary::from).collect()
}

fn print_catalog(out: &mut impl Write, json: bool) -> Result<()> {
    let catalog = scenario_catalog();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&catalog)?)?;
        return Ok(());
    }
    let width = catalog.iter().map(|s| s.id.len()).max().unwrap_or(0);
    for summary in &catalog {
        writeln!(
            out,
            "{:<width$}  {:>3}x  {}",
            summary.id,
            summary.iterations,
            summary.description,
            width = width
        )?;
    }
    Ok(())
}

fn print_config(out: &mut impl Write, config: &SuiteConfig, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
    } else {
        writeln!(out, "{}", toml::to_string_pretty(config)?)?;
    }
    Ok(())
}

/// Configured values first, then placeholders for whatever a lab
/// configuration would supply
pub fn load_simulation_config(path: Option<&Path>) -> Result<SuiteConfig> {
    Ok(with_simulation_defaults(SuiteConfig::load(path)?))
}

// ----------------------------------------------------------------------------
// Real Devices
// ----------------------------------------------------------------------------

async fn run_devices(
    config: SuiteConfig,
    source_serial: &str,
    target_serial: &str,
    specs: &[ScenarioSpec],
    iterations: Option<u32>,
) -> Result<Vec<ScenarioReport>> {
    let load_secondary = config.parameters.requires_bt_multiplex;
    info!("Connecting to source {} and target {}", source_serial, target_serial);
    let source = Arc::new(
        AndroidDevice::connect(source_serial, config.devices.source.clone(), load_secondary).await?,
    );
    let target = Arc::new(
        AndroidDevice::connect(target_serial, config.devices.target.clone(), load_secondary).await?,
    );

    let run_id = RunIdentifier::from_target(&config.parameters.target_cuj_name, target.as_ref()).await;
    let mut ctx = RunContext::new(
        config,
        run_id,
        source.clone() as Arc<dyn DeviceHandle>,
        target.clone() as Arc<dyn DeviceHandle>,
    )
    .with_iperf(Arc::new(AdbIperfRunner));
    ctx.iterations_override = iterations;

    let result = run_suite(&ctx, specs).await;
    source.unload().await;
    target.unload().await;
    Ok(result?)
}

// ----------------------------------------------------------------------------
// Simulation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulateOptions {
    pub faults: FaultPlan,
    pub iterations: Option<u32>,
}

pub fn fault_plan(fault: Option<Fault>, count: Option<u32>) -> FaultPlan {
    match (fault, count) {
        (None, _) => FaultPlan::none(),
        (Some(fault), None) => FaultPlan::always(fault),
        (Some(fault), Some(count)) => FaultPlan::times(fault, count),
    }
}

/// Run each scenario on a fresh pair of mock phones. A runner error ends the
/// simulation with the reports gathered so far.
pub async fn simulate(config: SuiteConfig, specs: &[ScenarioSpec], options: SimulateOptions) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(specs.len());
    for spec in specs {
        if let Some(fault) = options.faults.fault() {
            if fault.needs_upgrade() && !spec.upgrade_medium.is_high_quality() {
                warn!("{} never upgrades, fault {} will not fire", spec.id, fault);
            }
        }
        let pair = MockPair::from_config(&config, spec, options.faults);
        let mut ctx = pair.context(config.clone());
        ctx.iterations_override = options.iterations;

        match run_scenario(&ctx, spec).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{} could not run: {}", spec.id, e);
                return reports;
            }
        }
    }
    reports
}

fn print_reports(out: &mut impl Write, reports: &[ScenarioReport], json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(reports)?)?;
        return Ok(());
    }
    for report in reports {
        writeln!(out, "{}", report.render_text())?;
        writeln!(out)?;
    }
    let skipped = reports.iter().filter(|r| r.is_skipped()).count();
    let passed = reports.iter().filter(|r| r.passed).count() - skipped;
    writeln!(
        out,
        "{} passed, {} skipped, {} failed",
        passed,
        skipped,
        reports.len() - passed - skipped
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_options(fault: Option<Fault>) -> SimulateOptions {
        SimulateOptions {
            faults: fault_plan(fault, None),
            iterations: Some(1),
        }
    }

    #[test]
    fn test_select_scenarios() {
        let params = TestParameters::default();
        let enabled = select_scenarios(&[], &params).unwrap();
        assert!(enabled.iter().any(|s| s.id == "bt_performance"));
        assert!(!enabled.iter().any(|s| s.id == "ble_performance"));

        let picked = select_scenarios(
            &["bt_performance".to_string(), "ble_performance".to_string()],
            &params,
        )
        .unwrap();
        assert_eq!(picked[0].id, "bt_performance");
        assert_eq!(picked[1].id, "ble_performance");
        assert!(matches!(
            select_scenarios(&["nope".to_string()], &params),
            Err(CliError::Core(betocq_core::BetocqError::UnknownScenario(_)))
        ));
    }

    #[test]
    fn test_fault_plan() {
        assert_eq!(fault_plan(None, Some(3)), FaultPlan::none());
        assert_eq!(fault_plan(Some(Fault::TransferFailure), None), FaultPlan::always(Fault::TransferFailure));
        assert_eq!(fault_plan(Some(Fault::TransferFailure), Some(2)), FaultPlan::times(Fault::TransferFailure, 2));
    }

    #[test]
    fn test_catalog_json() {
        let mut out = Vec::new();
        print_catalog(&mut out, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), ScenarioSpec::all().len());
        assert!(parsed.as_array().unwrap().iter().any(|s| s["id"] == "bt_performance"));
    }

    #[test]
    fn test_effective_config_is_toml() {
        let mut out = Vec::new();
        print_config(&mut out, &SuiteConfig::default(), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let reparsed = SuiteConfig::from_toml_str(&text).unwrap();
        assert_eq!(reparsed.benchmark, SuiteConfig::default().benchmark);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_pass_and_fail() {
        let config = with_simulation_defaults(SuiteConfig::default());
        let specs = vec![ScenarioSpec::bt_performance()];

        let reports = simulate(config.clone(), &specs, create_test_options(None)).await;
        assert_eq!(reports.len(), 1);
        assert!(check_outcome(&reports).is_ok());

        let reports = simulate(config, &specs, create_test_options(Some(Fault::NoEndpointFound))).await;
        match check_outcome(&reports) {
            Err(CliError::ScenariosFailed { failed, total }) => assert_eq!((failed, total), (1, 1)),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_report_summary() {
        let config = with_simulation_defaults(SuiteConfig::default());
        let reports = simulate(config, &[ScenarioSpec::bt_performance()], create_test_options(None)).await;
        let mut out = Vec::new();
        print_reports(&mut out, &reports, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("test_result: PASS"));
        assert!(text.ends_with("1 passed, 0 skipped, 0 failed\n"));
    }
}
