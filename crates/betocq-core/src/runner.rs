//! Generic scenario runner
//!
//! Interprets a `ScenarioSpec` against a pair of devices: pre-checks, then
//! repeated iterations of STA setup, optional prior BT connection, main
//! connection, transfer and post-transfer checks, then the success-rate gate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::benchmark::{compute_speed_target, fixed_benchmark, BenchmarkInput, SpeedTarget, ThroughputModes};
use crate::capabilities::check_requirements;
use crate::config::SuiteConfig;
use crate::constants::{ConnectionSetupTimeouts, KeepAlive, INVALID_INT, NEARBY_RESET_WAIT, SUITE_NAME};
use crate::device::{DeviceHandle, IperfRunner, SnippetSlot, StaInfo};
use crate::engine::{ConnectionConfig, DiscoveryJitter, NearbyConnection, Peer};
use crate::errors::{ConnectionError, Result, RpcError};
use crate::failure::FailureReason;
use crate::frequency::{validate_p2p_frequency, validate_sta_frequency, ConcurrencyMode};
use crate::medium::{ConnectionMedium, Medium, MediumUpgradeType};
use crate::results::{PerformanceTestResults, ResultTips, ScenarioReport, SingleTestResult};
use crate::rpc::NearbySnippet;
use crate::scenario::{ScenarioSpec, ThroughputCheck, UpgradeSupport};
use crate::transfer::TransferRequest;

// ----------------------------------------------------------------------------
// Run Context
// ----------------------------------------------------------------------------

/// Names the run in every report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentifier {
    pub suite_name: String,
    pub run_identifier: String,
}

impl RunIdentifier {
    pub fn new(target_cuj_name: &str, manufacturer: &str, model: &str) -> Self {
        Self {
            suite_name: format!("[{}-{}]", SUITE_NAME, target_cuj_name),
            run_identifier: format!("{}-{}", manufacturer, model),
        }
    }

    /// Build from the target device's properties
    pub async fn from_target(target_cuj_name: &str, target: &dyn DeviceHandle) -> Self {
        let manufacturer = target.manufacturer().await.unwrap_or_else(|e| {
            warn!("[{}] could not read manufacturer: {}", target.serial(), e);
            "unknown".to_string()
        });
        let model = target.model().await.unwrap_or_else(|e| {
            warn!("[{}] could not read model: {}", target.serial(), e);
            "unknown".to_string()
        });
        Self::new(target_cuj_name, &manufacturer, &model)
    }
}

/// Everything a scenario run needs, created once per suite run
#[derive(Clone)]
pub struct RunContext {
    pub config: SuiteConfig,
    pub run_id: RunIdentifier,
    /// Discoverer
    pub source: Arc<dyn DeviceHandle>,
    /// Advertiser
    pub target: Arc<dyn DeviceHandle>,
    pub iperf: Option<Arc<dyn IperfRunner>>,
    pub jitter: DiscoveryJitter,
    pub reset_wait: Duration,
    /// Replaces the scenario's planned iteration count
    pub iterations_override: Option<u32>,
}

impl RunContext {
    pub fn new(
        config: SuiteConfig,
        run_id: RunIdentifier,
        source: Arc<dyn DeviceHandle>,
        target: Arc<dyn DeviceHandle>,
    ) -> Self {
        Self {
            config,
            run_id,
            source,
            target,
            iperf: None,
            jitter: DiscoveryJitter::default(),
            reset_wait: NEARBY_RESET_WAIT,
            iterations_override: None,
        }
    }

    pub fn with_iperf(mut self, iperf: Arc<dyn IperfRunner>) -> Self {
        self.iperf = Some(iperf);
        self
    }
}

// ----------------------------------------------------------------------------
// Iteration Control
// ----------------------------------------------------------------------------

/// Why the iteration loop must stop
#[derive(Debug, Clone)]
enum Abort {
    /// A misconfiguration that every later iteration would hit
    Fatal(String),
    /// The RPC transport broke
    Infrastructure(String),
}

impl Abort {
    fn message(&self) -> &str {
        match self {
            Abort::Fatal(m) | Abort::Infrastructure(m) => m,
        }
    }
}

fn infrastructure(err: &RpcError) -> Option<Abort> {
    err.is_infrastructure().then(|| Abort::Infrastructure(err.to_string()))
}

fn connection_abort(err: &ConnectionError) -> Option<Abort> {
    err.is_infrastructure().then(|| Abort::Infrastructure(err.to_string()))
}

fn snippet(device: &dyn DeviceHandle, slot: SnippetSlot) -> std::result::Result<Arc<dyn NearbySnippet>, RpcError> {
    device.snippet(slot).ok_or_else(|| RpcError::SnippetNotLoaded {
        serial: device.serial().to_string(),
        slot: format!("{:?}", slot).to_lowercase(),
    })
}

fn round_mbps(kbps: f64) -> f64 {
    (kbps / 1024.0 * 1000.0).round() / 1000.0
}

// ----------------------------------------------------------------------------
// Runner
// ----------------------------------------------------------------------------

/// Run one scenario to completion and report it
pub async fn run_scenario(ctx: &RunContext, spec: &ScenarioSpec) -> Result<ScenarioReport> {
    ScenarioRunner::new(ctx, spec).run().await
}

/// Run scenarios in order; an infrastructure abort ends the suite
pub async fn run_suite(ctx: &RunContext, specs: &[ScenarioSpec]) -> Result<Vec<ScenarioReport>> {
    let mut reports = Vec::with_capacity(specs.len());
    for spec in specs {
        let report = run_scenario(ctx, spec).await?;
        let stop = report.infrastructure_abort;
        reports.push(report);
        if stop {
            error!("Stopping the suite after an infrastructure failure in {}", spec.id);
            break;
        }
    }
    Ok(reports)
}

/// Drives the iterations of one scenario
pub struct ScenarioRunner<'a> {
    ctx: &'a RunContext,
    spec: &'a ScenarioSpec,
    results: PerformanceTestResults,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(ctx: &'a RunContext, spec: &'a ScenarioSpec) -> Self {
        let iterations = ctx.iterations_override.unwrap_or(spec.iterations);
        Self {
            ctx,
            spec,
            results: PerformanceTestResults::new(iterations, spec.success_rate_target),
        }
    }

    pub async fn run(mut self) -> Result<ScenarioReport> {
        let ctx = self.ctx;
        let params = &ctx.config.parameters;
        let config_info = self.spec.test_config_info(params);

        if let Some(reason) = self.pre_check().await? {
            info!("Skipping {}: {}", self.spec.id, reason);
            return Ok(PerformanceTestResults::skipped_report(
                self.spec.id,
                &self.ctx.run_id.suite_name,
                &self.ctx.run_id.run_identifier,
                config_info,
                &reason,
            ));
        }

        for device in [&self.ctx.source, &self.ctx.target] {
            if let Err(e) = device.set_country_code(self.spec.country_code).await {
                if e.is_infrastructure() {
                    return Err(e.into());
                }
                warn!("[{}] failed to set country code {}: {}", device.serial(), self.spec.country_code, e);
            }
        }

        let abort = self.run_iterations().await;

        if params.disconnect_wifi_after_test && self.spec.sta_band.is_some() {
            for device in [&self.ctx.source, &self.ctx.target] {
                if let Err(e) = device.reset_wifi().await {
                    warn!("[{}] failed to disconnect Wi-Fi: {}", device.serial(), e);
                }
            }
        }

        let mut report = self.results.report(
            self.spec.id,
            &self.ctx.run_id.suite_name,
            &self.ctx.run_id.run_identifier,
            config_info,
            self.spec.upgrade_medium,
        );
        if let Some(abort) = abort {
            report.infrastructure_abort = matches!(abort, Abort::Infrastructure(_));
            report.abort_reason = Some(abort.message().to_string());
        }
        info!("{} {}: {}", report.suite_name, self.spec.id, report.result);
        Ok(report)
    }

    /// Checks that decide whether the scenario applies at all
    async fn pre_check(&self) -> Result<Option<String>> {
        let params = &self.ctx.config.parameters;
        let source = self.ctx.source.as_ref();
        let target = self.ctx.target.as_ref();

        if !self.spec.is_ap_ready(params) {
            return Ok(Some("Wifi AP is not ready for this test.".to_string()));
        }

        let supported = match self.spec.upgrade_support() {
            UpgradeSupport::None => true,
            UpgradeSupport::WifiDirect => {
                snippet(target, SnippetSlot::Primary)?.wifi_is_p2p_supported().await?
                    && snippet(source, SnippetSlot::Primary)?.wifi_is_p2p_supported().await?
            }
            UpgradeSupport::WifiAware => {
                snippet(target, SnippetSlot::Primary)?.wifi_aware_is_available().await?
                    && snippet(source, SnippetSlot::Primary)?.wifi_aware_is_available().await?
            }
        };
        if !supported {
            return Ok(Some(format!("{} is not supported.", self.spec.upgrade_medium)));
        }

        if let Some(detail) = check_requirements(&self.spec.requirements, target.capabilities(), source.capabilities()) {
            return Ok(Some(format!(
                "The test is not required per the device capabilities. {}",
                detail
            )));
        }

        if params.skip_test_if_wifi_chipset_is_empty
            && self.spec.upgrade_medium.is_high_quality()
            && (source.capabilities().wifi_chipset.is_empty() || target.capabilities().wifi_chipset.is_empty())
        {
            return Ok(Some("wifi_chipset is empty in the config file".to_string()));
        }
        Ok(None)
    }

    async fn run_iterations(&mut self) -> Option<Abort> {
        let planned = self.results.iterations_expected();
        let max_consecutive = self.spec.max_consecutive_errors.max(1);
        let mut consecutive_failures = 0;

        for index in 0..planned {
            if index > 0 {
                self.reset_nearby().await;
            }
            info!("{} iteration {}/{}", self.spec.id, index + 1, planned);

            let mut result = SingleTestResult::new(index);
            let outcome = self.run_iteration(&mut result).await;
            if let Err(abort) = &outcome {
                result.abort(abort.message());
            }
            let tips_file = self.spec.file_transfer_tip();
            result.finish(&ResultTips {
                upgrade_medium: self.spec.upgrade_medium,
                file_transfer_tip: &tips_file,
                throughput_low_tip: self.spec.throughput_low_tip,
            });
            info!("{} iteration {}: {}", self.spec.id, index, result.result_message);
            let success = result.is_success();
            self.results.push(result);

            if let Err(abort) = outcome {
                error!("{} aborted: {}", self.spec.id, abort.message());
                return Some(abort);
            }
            if success {
                consecutive_failures = 0;
                continue;
            }
            consecutive_failures += 1;
            if self.ctx.config.parameters.fast_fail_on_any_error {
                warn!("{} stopping on first failure", self.spec.id);
                break;
            }
            if consecutive_failures >= max_consecutive {
                warn!(
                    "{} stopping after {} consecutive failures",
                    self.spec.id, consecutive_failures
                );
                break;
            }
        }
        None
    }

    /// Stop everything Nearby on every loaded snippet, then settle
    async fn reset_nearby(&self) {
        for device in [&self.ctx.source, &self.ctx.target] {
            for slot in [SnippetSlot::Primary, SnippetSlot::Secondary] {
                let Some(snippet) = device.snippet(slot) else {
                    continue;
                };
                let outcomes = [
                    snippet.stop_discovery().await,
                    snippet.stop_advertising().await,
                    snippet.stop_all_endpoints().await,
                ];
                for err in outcomes.into_iter().filter_map(|r| r.err()) {
                    warn!("[{}] nearby reset on {:?} slot failed: {}", device.serial(), slot, err);
                }
            }
        }
        tokio::time::sleep(self.ctx.reset_wait).await;
    }

    // ------------------------------------------------------------------------
    // One Iteration
    // ------------------------------------------------------------------------

    async fn run_iteration(&self, result: &mut SingleTestResult) -> std::result::Result<(), Abort> {
        let params = &self.ctx.config.parameters;
        let source = self.ctx.source.as_ref();
        let target = self.ctx.target.as_ref();

        let mut connection_config = ConnectionConfig {
            advertising_discovery_medium: self.spec.advertising_discovery_medium(params),
            connection_medium: self.spec.connection_medium(params),
            upgrade_medium: self.spec.upgrade_medium,
            upgrade_type: MediumUpgradeType::Disruptive,
            timeouts: ConnectionSetupTimeouts::first(),
            keep_alive: self.spec.keep_alive(params),
            enable_target_discovery: false,
            jitter: self.ctx.jitter,
        };
        if params.enable_instant_connection {
            connection_config.advertising_discovery_medium = self.spec.upgrade_medium;
            connection_config.connection_medium = self.spec.upgrade_medium;
            connection_config.enable_target_discovery = true;
        }

        self.prepare_devices().await?;

        if let Some((ssid, password)) = self.spec.source_credentials(params) {
            if !self
                .connect_sta(result, source, ssid, password, FailureReason::SourceWifiConnection)
                .await?
            {
                return Ok(());
            }
        }

        let mut prior = None;
        if params.requires_bt_multiplex && !self.spec.force_disable_bt_multiplex {
            let mut connection = self.prior_connection()?;
            let outcome = connection.connect().await;
            result.prior_reason = connection.failure_reason();
            result.prior_quality = connection.quality().clone();
            if let Err(err) = outcome {
                if let Some(abort) = connection_abort(&err) {
                    return Err(abort);
                }
                // The main connection never starts
                result.active_reason = result.prior_reason;
                result.failure_detail = Some(err.to_string());
                return Ok(());
            }
            connection_config.timeouts = ConnectionSetupTimeouts::second();
            prior = Some(connection);
        }

        let outcome = self
            .run_main_connection(result, connection_config, prior.is_some())
            .await;

        if let Some(mut connection) = prior {
            if let Err(e) = connection.disconnect().await {
                warn!("Prior BT disconnect failed: {}", e);
            }
        }
        outcome
    }

    async fn prepare_devices(&self) -> std::result::Result<(), Abort> {
        let params = &self.ctx.config.parameters;
        if params.toggle_airplane_mode_target_side && !params.bypass_airplane_mode_toggling {
            if let Err(e) = self.ctx.target.toggle_airplane_mode().await {
                if let Some(abort) = infrastructure(&e) {
                    return Err(abort);
                }
                warn!("[{}] airplane mode toggle failed: {}", self.ctx.target.serial(), e);
            }
        }
        if params.reset_wifi_connection && self.spec.sta_band.is_some() {
            for device in [&self.ctx.source, &self.ctx.target] {
                if let Err(e) = device.reset_wifi().await {
                    if let Some(abort) = infrastructure(&e) {
                        return Err(abort);
                    }
                    warn!("[{}] Wi-Fi reset failed: {}", device.serial(), e);
                }
            }
        }
        Ok(())
    }

    /// Connect one STA; `false` means the iteration failed here
    async fn connect_sta(
        &self,
        result: &mut SingleTestResult,
        device: &dyn DeviceHandle,
        ssid: &str,
        password: &str,
        reason: FailureReason,
    ) -> std::result::Result<bool, Abort> {
        result.active_reason = reason;
        info!("[{}] connecting STA to {}", device.serial(), ssid);
        match device.connect_sta(ssid, password).await {
            Ok(latency) => {
                if reason == FailureReason::SourceWifiConnection {
                    result.discoverer_sta_latency = Some(latency);
                } else {
                    result.advertiser_sta_latency = Some(latency);
                }
                Ok(true)
            }
            Err(e) => {
                if let Some(abort) = infrastructure(&e) {
                    return Err(abort);
                }
                result.sta_rssi = device.scan_rssi(ssid).await.ok();
                result.fail(reason, e.to_string());
                Ok(false)
            }
        }
    }

    /// Connection on the secondary slot with the fixed BT parameters
    fn prior_connection(&self) -> std::result::Result<NearbyConnection, Abort> {
        let advertiser = snippet(self.ctx.target.as_ref(), SnippetSlot::Secondary)
            .map_err(|e| Abort::Infrastructure(e.to_string()))?;
        let discoverer = snippet(self.ctx.source.as_ref(), SnippetSlot::Secondary)
            .map_err(|e| Abort::Infrastructure(e.to_string()))?;
        Ok(NearbyConnection::new(
            Peer::new(self.ctx.target.serial(), advertiser),
            Peer::new(self.ctx.source.serial(), discoverer),
            ConnectionConfig {
                advertising_discovery_medium: Medium::BleOnly,
                connection_medium: Medium::BtOnly,
                upgrade_medium: Medium::BtOnly,
                upgrade_type: MediumUpgradeType::NonDisruptive,
                timeouts: ConnectionSetupTimeouts::first(),
                keep_alive: KeepAlive::BT,
                enable_target_discovery: false,
                jitter: self.ctx.jitter,
            },
        ))
    }

    async fn run_main_connection(
        &self,
        result: &mut SingleTestResult,
        config: ConnectionConfig,
        has_prior: bool,
    ) -> std::result::Result<(), Abort> {
        let params = &self.ctx.config.parameters;
        let target = self.ctx.target.as_ref();

        if let Some((ssid, password)) = self.spec.target_credentials(params) {
            if !self
                .connect_sta(result, target, ssid, password, FailureReason::TargetWifiConnection)
                .await?
            {
                return Ok(());
            }
            let idle = Duration::from_secs(params.target_post_wifi_connection_idle_time_sec);
            debug!("[{}] idling {:?} after STA connection", target.serial(), idle);
            tokio::time::sleep(idle).await;
        }

        let advertiser = snippet(target, SnippetSlot::Primary).map_err(|e| Abort::Infrastructure(e.to_string()))?;
        let discoverer = snippet(self.ctx.source.as_ref(), SnippetSlot::Primary)
            .map_err(|e| Abort::Infrastructure(e.to_string()))?;
        let mut connection = NearbyConnection::new(
            Peer::new(target.serial(), advertiser),
            Peer::new(self.ctx.source.serial(), discoverer),
            config,
        );
        debug!("main connection {} (prior connection: {})", connection.service_id(), has_prior);

        let setup = connection.connect().await;
        result.active_reason = connection.failure_reason();
        result.quality = connection.quality().clone();
        if let Err(err) = setup {
            if let Some(abort) = connection_abort(&err) {
                return Err(abort);
            }
            result.failure_detail = Some(err.to_string());
            return Ok(());
        }

        let transfer = connection
            .transfer_file(TransferRequest {
                file_size_kb: self.spec.file_size_kb,
                num_files: self.spec.num_files,
                payload_type: self.spec.payload_type,
                timeout: self.spec.transfer_timeout,
            })
            .await;
        result.active_reason = connection.failure_reason();
        let mut abort = None;
        match transfer {
            Ok(kbps) => result.file_transfer_throughput_kbps = Some(kbps),
            Err(err) => {
                abort = connection_abort(&err);
                result.failure_detail = Some(err.to_string());
            }
        }

        if abort.is_none() {
            abort = self.check_link(result).await.err();
            if let Some(reason) = result.failure_reason().is_failure().then(|| result.active_reason) {
                connection.set_failure_reason(reason);
            }
        }

        if let Err(e) = connection.disconnect().await {
            warn!("Disconnect of {} failed: {}", connection.service_id(), e);
        }
        abort.map_or(Ok(()), Err)
    }

    // ------------------------------------------------------------------------
    // Post-transfer Checks
    // ------------------------------------------------------------------------

    /// STA and P2P frequency checks, then the throughput assertion.
    ///
    /// Runs even when the transfer failed; a frequency violation overrides
    /// the transfer reason, and an STA violation ends the checks.
    async fn check_link(&self, result: &mut SingleTestResult) -> std::result::Result<(), Abort> {
        let target = self.ctx.target.as_ref();
        let sta = match target.sta_info().await {
            Ok(info) => info,
            Err(e) => {
                if let Some(abort) = infrastructure(&e) {
                    return Err(abort);
                }
                warn!("[{}] could not read STA info: {}", target.serial(), e);
                StaInfo::invalid()
            }
        };
        result.sta_frequency = sta.frequency;
        result.max_sta_link_speed_mbps = sta.max_link_speed_mbps;
        info!(
            "[{}] STA frequency {} MHz, max link speed {} Mbps",
            target.serial(),
            sta.frequency,
            sta.max_link_speed_mbps
        );

        let speed_target = self.speed_target(sta).await;
        info!("Speed target: {:?}", speed_target);

        let p2p = if result.quality.upgrade_medium.is_some_and(ConnectionMedium::is_p2p_group) {
            let frequency = match target.p2p_frequency().await {
                Ok(f) => f,
                Err(e) => {
                    if let Some(abort) = infrastructure(&e) {
                        return Err(abort);
                    }
                    warn!("[{}] could not read P2P frequency: {}", target.serial(), e);
                    INVALID_INT
                }
            };
            result.quality.medium_frequency = frequency;
            Some(frequency)
        } else {
            None
        };

        self.check_frequencies(result, sta, p2p, speed_target.nc_mbps)?;
        if result.active_reason.is_success() && speed_target.is_set() {
            self.check_throughput(result, speed_target).await;
        }
        Ok(())
    }

    /// The first frequency violation is the reported one
    fn check_frequencies(
        &self,
        result: &mut SingleTestResult,
        sta: StaInfo,
        p2p: Option<i64>,
        nc_mbps: f64,
    ) -> std::result::Result<(), Abort> {
        let Some(band) = self.spec.expected_target_band() else {
            return Ok(());
        };
        if let Err(violation) = validate_sta_frequency(sta.frequency, sta.max_link_speed_mbps, band) {
            result.fail(violation.reason, violation.message.clone());
            if violation.is_scenario_fatal() {
                return Err(Abort::Fatal(violation.message));
            }
            return Ok(());
        }
        if let Some(p2p) = p2p {
            let mode = ConcurrencyMode {
                is_mcc: self.spec.is_mcc,
                is_dbs: self.spec.is_dbs,
            };
            if let Err(violation) = validate_p2p_frequency(p2p, sta.frequency, mode, nc_mbps) {
                result.fail(violation.reason, violation.message);
            }
        }
        Ok(())
    }

    async fn speed_target(&self, sta: StaInfo) -> SpeedTarget {
        let constants = &self.ctx.config.benchmark;
        match self.spec.throughput_check {
            ThroughputCheck::Disabled => SpeedTarget::unset(),
            ThroughputCheck::Fixed => {
                fixed_benchmark(constants, self.spec.upgrade_medium).unwrap_or_else(SpeedTarget::unset)
            }
            ThroughputCheck::Derived => {
                let tdls_supported = self.spec.upgrade_medium == Medium::WifiLanOnly && self.tdls_supported().await;
                let input = BenchmarkInput {
                    advertiser: self.ctx.target.capabilities(),
                    discoverer: self.ctx.source.capabilities(),
                    upgrade_medium: self.spec.upgrade_medium,
                    sta_frequency: sta.frequency,
                    sta_max_link_speed_mbps: sta.max_link_speed_mbps,
                    modes: ThroughputModes {
                        is_mcc: self.spec.is_mcc,
                        is_dbs: self.spec.is_dbs,
                        is_2g_medium: self.spec.is_2g_medium,
                        tdls_supported,
                    },
                };
                compute_speed_target(constants, &input)
            }
        }
    }

    async fn tdls_supported(&self) -> bool {
        for device in [&self.ctx.source, &self.ctx.target] {
            let Some(snippet) = device.snippet(SnippetSlot::Primary) else {
                return false;
            };
            match snippet.wifi_is_tdls_supported().await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    warn!("[{}] TDLS query failed: {}", device.serial(), e);
                    return false;
                }
            }
        }
        true
    }

    async fn check_throughput(&self, result: &mut SingleTestResult, target: SpeedTarget) {
        let params = &self.ctx.config.parameters;
        let Some(kbps) = result.file_transfer_throughput_kbps else {
            return;
        };
        let nc_mbps = round_mbps(kbps);
        let medium = result.quality.upgrade_medium;

        let iperf_eligible = !self.spec.is_mcc
            && matches!(
                medium,
                Some(
                    ConnectionMedium::WifiDirect
                        | ConnectionMedium::WifiHotspot
                        | ConnectionMedium::WifiLan
                        | ConnectionMedium::WifiAware
                )
            );
        let wanted = params.run_iperf_test
            || (params.run_iperf_test_if_nc_speed_is_low && nc_mbps < target.nc_mbps)
            || (params.run_iperf_test_wlan && medium == Some(ConnectionMedium::WifiLan));

        let mut iperf_mbps = None;
        if let (true, true, Some(iperf), Some(medium)) = (iperf_eligible, wanted, &self.ctx.iperf, medium) {
            match iperf
                .measure_kbps(self.ctx.target.as_ref(), self.ctx.source.as_ref(), medium)
                .await
            {
                Ok(iperf_kbps) => {
                    result.iperf_throughput_kbps = Some(iperf_kbps);
                    iperf_mbps = Some(round_mbps(iperf_kbps));
                }
                Err(e) => warn!("iperf measurement failed: {}", e),
            }
        }

        if nc_mbps < target.nc_mbps {
            let mut detail = format!(" file speed {} < target {} MB/s", nc_mbps, target.nc_mbps);
            if let Some(iperf) = iperf_mbps {
                detail.push_str(&format!(" while iperf speed (MB/s) = {}", iperf));
            }
            result.fail(FailureReason::FileTransferThroughputLow, detail);
        } else if let Some(iperf) = iperf_mbps.filter(|i| params.check_iperf_speed && *i < target.iperf_mbps) {
            result.fail(
                FailureReason::FileTransferThroughputLow,
                format!(" iperf speed {} < target {} MB/s", iperf, target.iperf_mbps),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identifier_format() {
        let id = RunIdentifier::new("quick_start", "google", "pixel 8");
        assert_eq!(id.suite_name, "[BeToCQ-quick_start]");
        assert_eq!(id.run_identifier, "google-pixel 8");
    }

    #[test]
    fn test_round_mbps() {
        assert_eq!(round_mbps(20480.0), 20.0);
        assert_eq!(round_mbps(1000.0), 0.977);
    }
}
