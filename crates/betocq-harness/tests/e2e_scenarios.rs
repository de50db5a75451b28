//! End-to-end runs of real scenarios against mock phones
//!
//! Time is paused so connection and transfer timeouts elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use betocq_core::constants::{INVALID_INT, TRANSFER_FILE_SIZE_1KB};
use betocq_core::{
    run_scenario, run_suite, ConnectionConfig, ConnectionMedium, ConnectionPhase, DeviceHandle,
    DiscoveryJitter, FailureReason, Medium, NearbyConnection, PayloadType, Peer, ScenarioSpec,
    SnippetSlot, SuiteConfig, TransferRequest,
};
use betocq_harness::{
    simulated_config, Fault, FaultPlan, LinkProfile, MockAir, MockDeviceProfile, MockIperf,
    MockPair, P2pChannel, SOURCE_SERIAL, TARGET_SERIAL,
};

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn create_test_connection(pair: &MockPair, upgrade_medium: Medium) -> NearbyConnection {
    let advertiser = pair.target.snippet(SnippetSlot::Primary).unwrap();
    let discoverer = pair.source.snippet(SnippetSlot::Primary).unwrap();
    NearbyConnection::new(
        Peer::new(TARGET_SERIAL, advertiser),
        Peer::new(SOURCE_SERIAL, discoverer),
        ConnectionConfig {
            upgrade_medium,
            jitter: DiscoveryJitter::none(),
            ..ConnectionConfig::default()
        },
    )
}

/// Both phones support only one slow stream, so the 5G target is 3 MB/s
fn create_test_slow_link_config() -> SuiteConfig {
    let mut config = simulated_config();
    config.benchmark.iperf_to_nc_throughput_ratio = 1.0;
    for caps in [&mut config.devices.source, &mut config.devices.target] {
        caps.max_num_streams = 1;
        caps.max_phy_rate_5g_mbps = 65;
    }
    config
}

fn single_iteration(spec: ScenarioSpec) -> ScenarioSpec {
    ScenarioSpec { iterations: 1, ..spec }
}

/// Both phones join the 5G AP at `frequency`; the target's group sits on `p2p_channel`
fn create_test_ap_pair(config: &SuiteConfig, frequency: i64, speed: i64, p2p_channel: P2pChannel) -> MockPair {
    let profile = |serial: &str, caps| {
        MockDeviceProfile::new(serial, caps).with_access_point(&config.parameters.wifi_5g_ssid, frequency, speed)
    };
    let mut target = profile(TARGET_SERIAL, config.devices.target.clone());
    target.p2p_channel = p2p_channel;
    MockPair::new(
        MockAir::new(FaultPlan::none()),
        profile(SOURCE_SERIAL, config.devices.source.clone()),
        target,
    )
}

fn create_test_bt_spec() -> ScenarioSpec {
    ScenarioSpec {
        file_size_kb: TRANSFER_FILE_SIZE_1KB,
        iterations: 1,
        ..ScenarioSpec::bt_performance()
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_engine_upgrade_transfer_and_disconnect() {
    let pair = MockPair::from_config(&simulated_config(), &ScenarioSpec::scc_5g_wfd_sta(), FaultPlan::none());
    let mut connection = create_test_connection(&pair, Medium::UpgradeToWifiDirect);

    connection.connect().await.unwrap();
    assert_eq!(connection.phase(), &ConnectionPhase::Connected);
    assert_eq!(connection.failure_reason(), FailureReason::Success);
    assert!(connection
        .audit_log()
        .iter()
        .any(|entry| entry.to_phase == "AwaitingBandwidthUpgrade"));
    let quality = connection.quality();
    assert_eq!(quality.upgrade_medium, Some(ConnectionMedium::WifiDirect));
    assert!(quality.discovery_latency.is_some());
    assert!(quality.connection_latency.is_some());

    let kbps = connection
        .transfer_file(TransferRequest {
            file_size_kb: 1024,
            num_files: 3,
            payload_type: PayloadType::File,
            timeout: Duration::from_secs(30),
        })
        .await
        .unwrap();
    assert_eq!(kbps, LinkProfile::default().throughput_kbps);
    assert_eq!(pair.log().count(&format!("{}:transferFilesCleanup", SOURCE_SERIAL)), 1);
    assert_eq!(pair.log().count(&format!("{}:transferFilesCleanup", TARGET_SERIAL)), 1);

    connection.disconnect().await.unwrap();
    assert_eq!(connection.phase(), &ConnectionPhase::Disconnected);
    assert_eq!(pair.air.open_links(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_engine_discovery_failure_cleans_up() {
    let pair = MockPair::from_config(
        &simulated_config(),
        &ScenarioSpec::bt_performance(),
        FaultPlan::always(Fault::NoEndpointFound),
    );
    let mut connection = create_test_connection(&pair, Medium::BtOnly);

    let err = connection.connect().await.unwrap_err();
    assert_eq!(err.reason(), FailureReason::SourceStartDiscovery);
    assert!(!err.is_infrastructure());
    assert!(matches!(
        connection.phase(),
        ConnectionPhase::Failed {
            reason: FailureReason::SourceStartDiscovery
        }
    ));

    let log = pair.log();
    assert!(!log.entries().iter().any(|e| e.ends_with(":requestConnection")));
    assert!(!log.entries().iter().any(|e| e.ends_with(":acceptConnection")));
    assert!(log.contains(&format!("{}:stopDiscovery", SOURCE_SERIAL)));
    assert!(log.contains(&format!("{}:stopAdvertising", TARGET_SERIAL)));
    assert!(!pair.air.is_advertising(pair.target.mock_snippet(SnippetSlot::Primary).station()));
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_bt_scenario_passes_without_upgrade() {
    let config = simulated_config();
    let spec = ScenarioSpec {
        file_size_kb: TRANSFER_FILE_SIZE_1KB,
        iterations: 1,
        ..ScenarioSpec::bt_performance()
    };
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(report.passed, "{}", report.render_text());
    assert_eq!(report.result, "PASS");
    assert_eq!(report.final_reason, FailureReason::Success);
    assert_eq!(report.finished_iterations, 1);
    assert!(report.file_transfer_stats.transfer.median > 0.0);
    assert!(report.wifi_upgrade_stats.is_empty());
    assert!(!pair
        .log()
        .entries()
        .iter()
        .any(|e| e.starts_with("wait:") && e.ends_with(":onBandwidthChanged")));
}

#[tokio::test(start_paused = true)]
async fn test_scc_wfd_scenario_passes() {
    let config = simulated_config();
    let spec = single_iteration(ScenarioSpec::scc_5g_wfd_sta());
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(report.passed, "{}", report.render_text());
    assert_eq!(report.final_reason, FailureReason::Success);
    assert_eq!(report.wifi_upgrade_stats.len(), 1);
    assert_eq!(report.wifi_upgrade_stats[0].medium, ConnectionMedium::WifiDirect.name());
    assert!(report.iterations[0].transfer_info.contains("medium_frequency: 5180"));
    assert_eq!(pair.target.country_code().as_deref(), Some("US"));
    assert!(pair.log().contains(&format!("{}:connectSta", TARGET_SERIAL)));
}

#[tokio::test(start_paused = true)]
async fn test_p2p_off_sta_channel_fails_scc() {
    let config = simulated_config();
    let spec = single_iteration(ScenarioSpec::scc_5g_wfd_sta());
    let pair = create_test_ap_pair(&config, 5180, 866, P2pChannel::Fixed(5745));

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(!report.passed);
    assert_eq!(report.final_reason, FailureReason::WrongP2pFrequency);
}

#[tokio::test(start_paused = true)]
async fn test_sta_disconnect_is_not_masked_by_p2p_check() {
    let config = simulated_config();
    let spec = single_iteration(ScenarioSpec::scc_5g_wfd_sta());
    let pair = create_test_ap_pair(&config, INVALID_INT, INVALID_INT, P2pChannel::Fixed(5180));

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(!report.passed);
    assert_eq!(report.final_reason, FailureReason::DisconnectedFromAp);
    assert!(report.iterations[0].result.contains("DISCONNECTED_FROM_AP"), "{}", report.iterations[0].result);
    assert!(report.iterations[0].transfer_info.contains("medium_frequency: 5180"));
    assert!(report.abort_reason.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_wrong_ap_band_aborts_remaining_iterations() {
    let config = simulated_config();
    let spec = ScenarioSpec {
        iterations: 5,
        ..ScenarioSpec::scc_5g_wfd_sta()
    };
    let pair = create_test_ap_pair(&config, 5500, 866, P2pChannel::FollowSta);

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(!report.passed);
    assert_eq!(report.final_reason, FailureReason::WrongApFrequency);
    assert_eq!(report.finished_iterations, 1);
    assert!(report.abort_reason.as_deref().unwrap().contains("5500"));
    assert!(!report.infrastructure_abort);
}

#[tokio::test(start_paused = true)]
async fn test_hotspot_records_medium_frequency_without_ap() {
    let config = simulated_config();
    let spec = single_iteration(ScenarioSpec::local_only_hotspot());
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(!report.is_skipped(), "{}", report.render_text());
    assert_eq!(report.wifi_upgrade_stats[0].medium, ConnectionMedium::WifiHotspot.name());
    assert!(report.iterations[0].transfer_info.contains("medium_frequency: 5180"));
}

#[tokio::test(start_paused = true)]
async fn test_low_throughput_reports_target() {
    let config = create_test_slow_link_config();
    let spec = single_iteration(ScenarioSpec::scc_5g_wfd_sta());
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());
    pair.set_link_profile(LinkProfile {
        throughput_kbps: 2048.0,
        ..LinkProfile::default()
    });

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(!report.passed);
    assert_eq!(report.final_reason, FailureReason::FileTransferThroughputLow);
    let message = &report.iterations[0].result;
    assert!(message.contains("file speed 2 < target 3 MB/s"), "{}", message);
    assert!(!message.contains("iperf"));
}

#[tokio::test(start_paused = true)]
async fn test_low_throughput_includes_iperf() {
    let config = create_test_slow_link_config();
    let spec = single_iteration(ScenarioSpec::scc_5g_wfd_sta());
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());
    pair.set_link_profile(LinkProfile {
        throughput_kbps: 2048.0,
        ..LinkProfile::default()
    });

    let ctx = pair.context(config).with_iperf(Arc::new(MockIperf { kbps: 4096.0 }));
    let report = run_scenario(&ctx, &spec).await.unwrap();
    assert_eq!(report.final_reason, FailureReason::FileTransferThroughputLow);
    assert!(report.iterations[0].result.contains("while iperf speed (MB/s) = 4"));
    assert!(report.file_transfer_stats.iperf.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_missing_ssid_skips_scenario() {
    let mut config = simulated_config();
    config.parameters.wifi_dfs_5g_ssid.clear();
    let spec = ScenarioSpec::scc_dfs_5g_wfd_sta();
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(report.is_skipped());
    assert_eq!(report.final_reason, FailureReason::Skipped);
    assert!(!pair.log().contains(&format!("{}:startAdvertising", TARGET_SERIAL)));
}

#[tokio::test(start_paused = true)]
async fn test_transient_fault_recovers() {
    let config = simulated_config();
    let spec = ScenarioSpec {
        file_size_kb: TRANSFER_FILE_SIZE_1KB,
        iterations: 3,
        max_consecutive_errors: 3,
        success_rate_target: 0.6,
        ..ScenarioSpec::bt_performance()
    };
    let pair = MockPair::from_config(&config, &spec, FaultPlan::times(Fault::WrongDirection, 1));

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert_eq!(report.finished_iterations, 3);
    assert_eq!(report.failed_iterations, 1);
    assert!(report.passed, "{}", report.render_text());
    assert!(report.failed_iterations_detail[0].contains("SOURCE_REQUEST_CONNECTION"));
}

// ----------------------------------------------------------------------------
// Infrastructure
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_transport_loss_stops_the_suite() {
    let mut config = simulated_config();
    config.parameters.toggle_airplane_mode_target_side = true;
    let specs = [create_test_bt_spec(), single_iteration(ScenarioSpec::scc_5g_wfd_sta())];
    let pair = MockPair::from_config(&config, &specs[0], FaultPlan::none());
    pair.air.break_transport("snippet socket closed");

    let reports = run_suite(&pair.context(config), &specs).await.unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(report.infrastructure_abort);
    assert!(!report.passed);
    assert_eq!(report.final_reason, FailureReason::DeviceConfigError);
    assert!(report.iterations[0].result.contains("DEVICE_CONFIG_ERROR"), "{}", report.iterations[0].result);
    assert!(!pair.log().contains(&format!("{}:startAdvertising", TARGET_SERIAL)));
}

#[tokio::test(start_paused = true)]
async fn test_transport_loss_keeps_the_phase_reason() {
    let config = simulated_config();
    let spec = create_test_bt_spec();
    let pair = MockPair::from_config(&config, &spec, FaultPlan::none());
    pair.air.break_transport("snippet socket closed");

    let report = run_scenario(&pair.context(config), &spec).await.unwrap();
    assert!(report.infrastructure_abort);
    assert_eq!(report.final_reason, FailureReason::TargetStartAdvertising);
    assert_eq!(report.finished_iterations, 1);
}
