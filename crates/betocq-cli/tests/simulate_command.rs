//! `simulate` driven through the library entry points

use std::io::Write;

use betocq_cli::commands::{check_outcome, fault_plan, load_simulation_config, simulate, SimulateOptions};
use betocq_cli::CliError;
use betocq_core::{FailureReason, ScenarioSpec};
use betocq_harness::Fault;

fn create_test_config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_values_survive_simulation_defaults() {
    let file = create_test_config_file(
        r#"
[parameters]
wifi_5g_ssid = "lab-5g"
run_iperf_test = "true"

[devices.target]
wifi_chipset = "qca"
"#,
    );
    let config = load_simulation_config(Some(file.path())).unwrap();
    assert_eq!(config.parameters.wifi_5g_ssid, "lab-5g");
    assert!(config.parameters.run_iperf_test);
    assert_eq!(config.parameters.wifi_2g_ssid, "mock-ap-2g");
    assert_eq!(config.devices.target.wifi_chipset, "qca");
}

#[test]
fn test_unknown_capability_is_rejected() {
    let file = create_test_config_file("[devices.source]\nwarp_drive = true\n");
    assert!(matches!(load_simulation_config(Some(file.path())), Err(CliError::Core(_))));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_wfd_fault_fails_the_run() {
    let config = load_simulation_config(None).unwrap();
    let specs = vec![ScenarioSpec::scc_5g_wfd_sta(), ScenarioSpec::bt_performance()];
    let options = SimulateOptions {
        faults: fault_plan(Some(Fault::UpgradeNeverHighQuality), None),
        iterations: Some(1),
    };

    let reports = simulate(config, &specs, options).await;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].final_reason, FailureReason::WifiMediumUpgrade);
    assert!(reports[1].passed, "{}", reports[1].render_text());
    assert!(matches!(
        check_outcome(&reports),
        Err(CliError::ScenariosFailed { failed: 1, total: 2 })
    ));
}
