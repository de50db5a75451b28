//! Test result aggregation and statistics
//!
//! `PerformanceTestResults` owns every iteration of one scenario run, applies
//! the success-rate gate and produces the serializable `ScenarioReport`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{INVALID_INT, INVALID_RSSI, RSSI_HIGH_THRESHOLD};
use crate::failure::{medium_upgrade_failure_tip, FailureReason};
use crate::medium::Medium;
use crate::quality::{latency_secs, SetupQualityInfo};

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// KB/s to MB/s, one decimal
pub fn kbps_to_mbps(kbps: f64) -> f64 {
    round_to(kbps / 1024.0, 1)
}

// ----------------------------------------------------------------------------
// Single Iteration
// ----------------------------------------------------------------------------

/// Everything recorded about one iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleTestResult {
    pub test_iteration: u32,
    pub prior_reason: FailureReason,
    pub active_reason: FailureReason,
    pub result_message: String,
    pub prior_quality: SetupQualityInfo,
    pub quality: SetupQualityInfo,
    pub file_transfer_throughput_kbps: Option<f64>,
    pub iperf_throughput_kbps: Option<f64>,
    pub discoverer_sta_latency: Option<Duration>,
    pub advertiser_sta_latency: Option<Duration>,
    pub sta_frequency: i64,
    pub max_sta_link_speed_mbps: i64,
    /// RSSI observed when a STA connection failed
    pub sta_rssi: Option<i32>,
    /// Detail of the failing check, e.g. measured vs target speed
    pub failure_detail: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SingleTestResult {
    pub fn new(test_iteration: u32) -> Self {
        Self {
            test_iteration,
            prior_reason: FailureReason::Uninitialized,
            active_reason: FailureReason::Uninitialized,
            result_message: String::new(),
            prior_quality: SetupQualityInfo::new(),
            quality: SetupQualityInfo::new(),
            file_transfer_throughput_kbps: None,
            iperf_throughput_kbps: None,
            discoverer_sta_latency: None,
            advertiser_sta_latency: None,
            sta_frequency: INVALID_INT,
            max_sta_link_speed_mbps: INVALID_INT,
            sta_rssi: None,
            failure_detail: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Whether a prior connection was attempted in this iteration
    pub fn used_prior_connection(&self) -> bool {
        self.prior_reason != FailureReason::Uninitialized
    }

    /// The prior connection's reason if it was used and did not succeed
    pub fn failure_reason(&self) -> FailureReason {
        if self.used_prior_connection() && !self.prior_reason.is_success() {
            self.prior_reason
        } else {
            self.active_reason
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_reason().is_success()
    }

    /// Set the active reason, keeping a detail for the result message
    pub fn fail(&mut self, reason: FailureReason, detail: impl Into<String>) {
        self.active_reason = reason;
        self.failure_detail = Some(detail.into());
    }

    /// Mark an iteration cut short by a run abort. A reason already recorded
    /// by the phase in progress is kept.
    pub fn abort(&mut self, detail: impl Into<String>) {
        if !self.failure_reason().is_failure() {
            self.fail(FailureReason::DeviceConfigError, detail);
        }
    }

    /// Freeze the iteration and compose its result message
    pub fn finish(&mut self, tips: &ResultTips<'_>) {
        self.end_time = Some(Utc::now());
        self.result_message = compose_result_message(self, tips);
    }
}

/// Scenario-specific text substituted into result messages
#[derive(Debug, Clone, Copy)]
pub struct ResultTips<'a> {
    pub upgrade_medium: Medium,
    pub file_transfer_tip: &'a str,
    pub throughput_low_tip: &'a str,
}

/// Build the human-readable message of one iteration
pub fn compose_result_message(result: &SingleTestResult, tips: &ResultTips<'_>) -> String {
    if result.used_prior_connection() && !result.prior_reason.is_success() {
        return format!(
            "FAIL (The prior BT connection): {} - {}",
            result.prior_reason,
            result.prior_reason.triage_tip()
        );
    }
    let reason = result.active_reason;
    match reason {
        FailureReason::Success => "PASS".to_string(),
        FailureReason::SourceWifiConnection | FailureReason::TargetWifiConnection => {
            let mut message = format!("FAIL: {} - {}", reason, reason.triage_tip());
            if let Some(rssi) = result.sta_rssi {
                if rssi != INVALID_RSSI && rssi > RSSI_HIGH_THRESHOLD {
                    message.push_str(&format!(
                        "RSSI={} which is too high. Consider to move the device away from the AP",
                        rssi
                    ));
                }
            }
            message
        }
        FailureReason::WifiMediumUpgrade => format!(
            "FAIL: {} - {}",
            reason,
            medium_upgrade_failure_tip(tips.upgrade_medium)
        ),
        FailureReason::FileTransferFail => format!("{} - {}", reason, tips.file_transfer_tip),
        FailureReason::FileTransferThroughputLow => format!(
            "{} - {}. {}",
            reason,
            result.failure_detail.as_deref().unwrap_or("").trim(),
            tips.throughput_low_tip
        ),
        _ => format!("{} - {}", reason, reason.triage_tip()),
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Rollup over one latency or throughput series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResultStats {
    pub count: usize,
    pub zero_count: usize,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl TestResultStats {
    /// Latencies in seconds. The median is the element at `floor(n / 2)` of the
    /// ascending series, not an interpolated median.
    pub fn from_latencies(series: &[Option<Duration>]) -> Self {
        let mut secs: Vec<f64> = series.iter().flatten().map(|d| d.as_secs_f64()).collect();
        if secs.is_empty() {
            return Self::default();
        }
        secs.sort_by(f64::total_cmp);
        // round-half-even puts exactly 0.5 s at zero
        let zero_count = secs.iter().filter(|s| **s <= 0.5).count();
        Self {
            count: secs.len(),
            zero_count,
            min: round_to(secs[0], 1),
            median: round_to(secs[secs.len() / 2], 1),
            max: round_to(secs[secs.len() - 1], 1),
        }
    }

    /// Throughputs in KB/s, reported in MB/s. The series is sorted descending
    /// before taking the `floor(n / 2)` element.
    pub fn from_throughputs_kbps(series: &[Option<f64>]) -> Self {
        let mut kbps: Vec<f64> = series.iter().flatten().copied().collect();
        if kbps.is_empty() {
            return Self::default();
        }
        kbps.sort_by(|a, b| b.total_cmp(a));
        Self {
            count: kbps.len(),
            zero_count: 0,
            min: kbps_to_mbps(kbps[kbps.len() - 1]),
            median: kbps_to_mbps(kbps[kbps.len() / 2]),
            max: kbps_to_mbps(kbps[0]),
        }
    }
}

/// Connection and transfer stats of the main connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTransferStats {
    pub discovery: TestResultStats,
    pub connection: TestResultStats,
    pub transfer: TestResultStats,
    pub iperf: Option<TestResultStats>,
    /// Present only when the upgrade medium is high quality
    pub upgrade: Option<TestResultStats>,
}

impl FileTransferStats {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("discovery_count: {}", self.discovery.count),
            format!("discovery_latency_min: {:.1}", self.discovery.min),
            format!("discovery_latency_med: {:.1}", self.discovery.median),
            format!("discovery_latency_max: {:.1}", self.discovery.max),
            format!("connection_count: {}", self.connection.count),
            format!("connection_latency_min: {:.1}", self.connection.min),
            format!("connection_latency_med: {:.1}", self.connection.median),
            format!("connection_latency_max: {:.1}", self.connection.max),
            format!("transfer_count: {}", self.transfer.count),
            format!("speed_mbps_min: {:.1}", self.transfer.min),
            format!("speed_mbps_med: {:.1}", self.transfer.median),
            format!("speed_mbps_max: {:.1}", self.transfer.max),
        ];
        if let Some(iperf) = &self.iperf {
            lines.push(format!("iperf_count: {}", iperf.count));
            lines.push(format!("iperf_mbps_min: {:.1}", iperf.min));
            lines.push(format!("iperf_mbps_med: {:.1}", iperf.median));
            lines.push(format!("iperf_mbps_max: {:.1}", iperf.max));
        }
        if let Some(upgrade) = &self.upgrade {
            lines.push(format!("upgrade_count: {}", upgrade.count));
            lines.push(format!("instant_connection_count: {}", upgrade.zero_count));
            lines.push(format!("upgrade_latency_min: {:.1}", upgrade.min));
            lines.push(format!("upgrade_latency_med: {:.1}", upgrade.median));
            lines.push(format!("upgrade_latency_max: {:.1}", upgrade.max));
        }
        lines
    }
}

/// Stats of the prior BT connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorConnectionStats {
    pub discovery: TestResultStats,
    pub connection: TestResultStats,
}

impl PriorConnectionStats {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("discovery_count: {}", self.discovery.count),
            format!("discovery_latency_min: {:.2}", self.discovery.min),
            format!("discovery_latency_med: {:.2}", self.discovery.median),
            format!("discovery_latency_max: {:.2}", self.discovery.max),
            format!("connection_count: {}", self.connection.count),
            format!("connection_latency_min: {:.2}", self.connection.min),
            format!("connection_latency_med: {:.2}", self.connection.median),
            format!("connection_latency_max: {:.2}", self.connection.max),
        ]
    }
}

/// How often each medium was negotiated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediumCount {
    pub medium: String,
    pub count: usize,
}

// ----------------------------------------------------------------------------
// Reports
// ----------------------------------------------------------------------------

/// Per-iteration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub iteration: u32,
    pub result: String,
    pub prior_connection: String,
    pub transfer_info: String,
    pub wlan_connection_latency: String,
}

impl IterationReport {
    pub fn from_result(result: &SingleTestResult) -> Self {
        let prior_connection = if result.used_prior_connection() {
            [
                ("discovery_latency", result.prior_quality.discovery_latency),
                ("connection_latency", result.prior_quality.connection_latency),
            ]
            .iter()
            .map(|(k, v)| format!("{}: {}", k, format_secs(*v)))
            .collect::<Vec<_>>()
            .join("\n")
        } else {
            String::new()
        };

        let mut transfer = vec![
            format!("discovery_latency: {}", format_secs(result.quality.discovery_latency)),
            format!("connection_latency: {}", format_secs(result.quality.connection_latency)),
            format!("upgrade_latency: {}", format_secs(result.quality.medium_upgrade_latency)),
            format!("upgrade_medium: {}", result.quality.medium_name()),
            format!("medium_frequency: {}", result.quality.medium_frequency),
            format!(
                "speed_mbps: {}",
                result
                    .file_transfer_throughput_kbps
                    .map(|k| format!("{:.1}", k / 1024.0))
                    .unwrap_or_else(|| "na".to_string())
            ),
        ];
        if let Some(iperf) = result.iperf_throughput_kbps.filter(|k| *k > 0.0) {
            transfer.push(format!("speed_mbps_iperf: {:.1}", iperf / 1024.0));
        }

        let mut wlan = Vec::new();
        if let Some(latency) = result.discoverer_sta_latency {
            wlan.push(format!("source: {}s", latency_secs(latency)));
        }
        if let Some(latency) = result.advertiser_sta_latency {
            wlan.push(format!("target: {}s", latency_secs(latency)));
        }

        Self {
            iteration: result.test_iteration,
            result: result.result_message.clone(),
            prior_connection,
            transfer_info: transfer.join("\n"),
            wlan_connection_latency: wlan.join("\n"),
        }
    }
}

fn format_secs(latency: Option<Duration>) -> String {
    latency
        .map(|l| format!("{:.1}", latency_secs(l)))
        .unwrap_or_else(|| "na".to_string())
}

/// Declared scenario configuration echoed in the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConfigInfo {
    pub country_code: String,
    pub advertising_discovery_medium: String,
    pub connection_medium: String,
    pub upgrade_medium: String,
    pub is_2g_only: bool,
    pub is_dbs_mode: bool,
    pub is_mcc_mode: bool,
    pub discoverer_wifi_ssid: String,
    pub advertiser_wifi_ssid: String,
}

impl TestConfigInfo {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("country_code: {}", self.country_code),
            format!("advertising_discovery_medium: {}", self.advertising_discovery_medium),
            format!("connection_medium: {}", self.connection_medium),
            format!("upgrade_medium: {}", self.upgrade_medium),
            format!("is_2g_only: {}", self.is_2g_only),
            format!("is_dbs_mode: {}", self.is_dbs_mode),
            format!("is_mcc_mode: {}", self.is_mcc_mode),
            format!("discoverer_wifi_ssid: {}", self.discoverer_wifi_ssid),
            format!("advertiser_wifi_ssid: {}", self.advertiser_wifi_ssid),
        ]
    }
}

/// Final report of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub suite_name: String,
    pub run_identifier: String,
    pub passed: bool,
    pub result: String,
    pub final_reason: FailureReason,
    /// Why iterations stopped before the planned count, if they did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    /// The RPC transport broke; later scenarios cannot run either
    #[serde(default)]
    pub infrastructure_abort: bool,
    pub test_config: TestConfigInfo,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub required_iterations: u32,
    pub finished_iterations: usize,
    pub failed_iterations: usize,
    pub failed_iterations_detail: Vec<String>,
    pub file_transfer_stats: FileTransferStats,
    pub wifi_upgrade_stats: Vec<MediumCount>,
    pub prior_bt_connection_stats: Option<PriorConnectionStats>,
    pub iterations: Vec<IterationReport>,
}

impl ScenarioReport {
    pub fn is_skipped(&self) -> bool {
        self.final_reason == FailureReason::Skipped
    }

    /// Multi-line text rendering
    pub fn render_text(&self) -> String {
        let mut out = Vec::new();
        out.push(format!("{} {} {}", self.suite_name, self.run_identifier, self.scenario));
        out.push(format!("test_result: {}", self.result));
        if let Some(reason) = &self.abort_reason {
            out.push(format!("aborted: {}", reason));
        }
        out.push("test_config:".to_string());
        out.extend(self.test_config.lines().into_iter().map(|l| format!("  {}", l)));
        out.push("test_stats:".to_string());
        out.push(format!("  start_time: {}", self.start_time));
        out.push(format!("  end_time: {}", self.end_time));
        out.push(format!("  required_iterations: {}", self.required_iterations));
        out.push(format!("  finished_iterations: {}", self.finished_iterations));
        out.push(format!("  failed_iterations: {}", self.failed_iterations));
        out.push("  failed_iterations_detail:".to_string());
        if self.failed_iterations_detail.is_empty() {
            out.push("   NA".to_string());
        } else {
            out.extend(self.failed_iterations_detail.iter().map(|l| format!("   {}", l)));
        }
        out.push("file_transfer_stats:".to_string());
        out.extend(self.file_transfer_stats.lines().into_iter().map(|l| format!("  {}", l)));
        out.push("wifi_upgrade_stats:".to_string());
        if self.wifi_upgrade_stats.is_empty() {
            out.push("  NA".to_string());
        } else {
            out.extend(
                self.wifi_upgrade_stats
                    .iter()
                    .map(|m| format!("  {}: {}", m.medium, m.count)),
            );
        }
        out.push("prior_bt_connection_stats:".to_string());
        match &self.prior_bt_connection_stats {
            Some(stats) => out.extend(stats.lines().into_iter().map(|l| format!("  {}", l))),
            None => out.push("  NA".to_string()),
        }
        out.join("\n")
    }
}

// ----------------------------------------------------------------------------
// Aggregator
// ----------------------------------------------------------------------------

/// All iterations of one scenario run
#[derive(Debug, Clone)]
pub struct PerformanceTestResults {
    results: Vec<SingleTestResult>,
    iterations_expected: u32,
    success_rate_target: f64,
    start_time: DateTime<Utc>,
}

impl PerformanceTestResults {
    pub fn new(iterations_expected: u32, success_rate_target: f64) -> Self {
        Self {
            results: Vec::new(),
            iterations_expected,
            success_rate_target,
            start_time: Utc::now(),
        }
    }

    pub fn iterations_expected(&self) -> u32 {
        self.iterations_expected
    }

    pub fn success_rate_target(&self) -> f64 {
        self.success_rate_target
    }

    /// Append a fresh iteration and hand it out for population
    pub fn start_new_iteration(&mut self) -> &mut SingleTestResult {
        let iteration = self.results.len() as u32;
        self.results.push(SingleTestResult::new(iteration));
        let last = self.results.len() - 1;
        &mut self.results[last]
    }

    /// Append an iteration populated elsewhere
    pub fn push(&mut self, result: SingleTestResult) {
        self.results.push(result);
    }

    pub fn current(&self) -> Option<&SingleTestResult> {
        self.results.last()
    }

    pub fn results(&self) -> &[SingleTestResult] {
        &self.results
    }

    pub fn is_any_iteration_executed(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Success count measured against the planned iteration count
    pub fn is_passed(&self) -> bool {
        let required = round_to(self.iterations_expected as f64 * self.success_rate_target, 2);
        self.success_count() as f64 >= required
    }

    pub fn success_rate(&self) -> f64 {
        if self.iterations_expected == 0 {
            return 0.0;
        }
        self.success_count() as f64 / self.iterations_expected as f64
    }

    pub fn result_message(&self) -> String {
        if self.is_passed() {
            return "PASS".to_string();
        }
        format!(
            "FAIL: low success rate: {:.2}% < target {:.2}%",
            self.success_rate() * 100.0,
            self.success_rate_target * 100.0
        )
    }

    pub fn failed_iteration_messages(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| {
                format!(
                    "- Iter: {}: {} {}\n sta freq: {}, sta max link speed: {}, used medium: {}, medium freq: {}.",
                    r.test_iteration,
                    r.start_time.format("%Y-%m-%d %H:%M:%S%.3f"),
                    r.result_message,
                    r.sta_frequency,
                    r.max_sta_link_speed_mbps,
                    r.quality.medium_name(),
                    r.quality.medium_frequency
                )
            })
            .collect()
    }

    pub fn file_transfer_stats(&self, upgrade_medium: Medium) -> FileTransferStats {
        let discovery: Vec<_> = self.results.iter().map(|r| r.quality.discovery_latency).collect();
        let connection: Vec<_> = self.results.iter().map(|r| r.quality.connection_latency).collect();
        let transfer: Vec<_> = self.results.iter().map(|r| r.file_transfer_throughput_kbps).collect();
        let iperf: Vec<_> = self
            .results
            .iter()
            .map(|r| r.iperf_throughput_kbps.filter(|k| *k > 0.0))
            .collect();
        let iperf_ran = iperf.iter().any(Option::is_some);

        let upgrade = upgrade_medium.is_high_quality().then(|| {
            let series: Vec<_> = self.results.iter().map(|r| r.quality.medium_upgrade_latency).collect();
            TestResultStats::from_latencies(&series)
        });

        FileTransferStats {
            discovery: TestResultStats::from_latencies(&discovery),
            connection: TestResultStats::from_latencies(&connection),
            transfer: TestResultStats::from_throughputs_kbps(&transfer),
            iperf: iperf_ran.then(|| TestResultStats::from_throughputs_kbps(&iperf)),
            upgrade,
        }
    }

    /// Negotiated mediums in first-seen order
    pub fn upgraded_medium_histogram(&self) -> Vec<MediumCount> {
        let mut counts: Vec<MediumCount> = Vec::new();
        for medium in self.results.iter().filter_map(|r| r.quality.upgrade_medium) {
            match counts.iter_mut().find(|c| c.medium == medium.name()) {
                Some(entry) => entry.count += 1,
                None => counts.push(MediumCount {
                    medium: medium.name().to_string(),
                    count: 1,
                }),
            }
        }
        counts
    }

    pub fn prior_connection_stats(&self) -> Option<PriorConnectionStats> {
        let used: Vec<&SingleTestResult> = self
            .results
            .iter()
            .filter(|r| r.prior_quality.discovery_latency.is_some())
            .collect();
        if used.is_empty() {
            return None;
        }
        let discovery: Vec<_> = used.iter().map(|r| r.prior_quality.discovery_latency).collect();
        let connection: Vec<_> = used.iter().map(|r| r.prior_quality.connection_latency).collect();
        Some(PriorConnectionStats {
            discovery: TestResultStats::from_latencies(&discovery),
            connection: TestResultStats::from_latencies(&connection),
        })
    }

    /// Summarize the run
    pub fn report(
        &self,
        scenario: &str,
        suite_name: &str,
        run_identifier: &str,
        test_config: TestConfigInfo,
        upgrade_medium: Medium,
    ) -> ScenarioReport {
        let passed = self.is_passed();
        ScenarioReport {
            scenario: scenario.to_string(),
            suite_name: suite_name.to_string(),
            run_identifier: run_identifier.to_string(),
            passed,
            result: self.result_message(),
            final_reason: if passed {
                FailureReason::Success
            } else {
                self.results
                    .iter()
                    .rev()
                    .map(SingleTestResult::failure_reason)
                    .find(|r| r.is_failure())
                    .unwrap_or(FailureReason::Uninitialized)
            },
            abort_reason: None,
            infrastructure_abort: false,
            test_config,
            start_time: self.start_time,
            end_time: Utc::now(),
            required_iterations: self.iterations_expected,
            finished_iterations: self.results.len(),
            failed_iterations: self.failed_count(),
            failed_iterations_detail: self.failed_iteration_messages(),
            file_transfer_stats: self.file_transfer_stats(upgrade_medium),
            wifi_upgrade_stats: self.upgraded_medium_histogram(),
            prior_bt_connection_stats: self.prior_connection_stats(),
            iterations: self.results.iter().map(IterationReport::from_result).collect(),
        }
    }

    /// Report for a scenario whose pre-checks declined to run it
    pub fn skipped_report(
        scenario: &str,
        suite_name: &str,
        run_identifier: &str,
        test_config: TestConfigInfo,
        skip_reason: &str,
    ) -> ScenarioReport {
        let now = Utc::now();
        ScenarioReport {
            scenario: scenario.to_string(),
            suite_name: suite_name.to_string(),
            run_identifier: run_identifier.to_string(),
            passed: true,
            result: format!("SKIPPED: {}", skip_reason),
            final_reason: FailureReason::Skipped,
            abort_reason: None,
            infrastructure_abort: false,
            test_config,
            start_time: now,
            end_time: now,
            required_iterations: 0,
            finished_iterations: 0,
            failed_iterations: 0,
            failed_iterations_detail: Vec::new(),
            file_transfer_stats: FileTransferStats::default(),
            wifi_upgrade_stats: Vec::new(),
            prior_bt_connection_stats: None,
            iterations: Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::ConnectionMedium;

    fn create_test_tips() -> ResultTips<'static> {
        ResultTips {
            upgrade_medium: Medium::UpgradeToWifiDirect,
            file_transfer_tip: "The Wifi Direct connection might be broken",
            throughput_low_tip: "Check the channel width.",
        }
    }

    fn secs(s: f64) -> Option<Duration> {
        Some(Duration::from_secs_f64(s))
    }

    #[test]
    fn test_latency_stats_positional_median() {
        let stats = TestResultStats::from_latencies(&[secs(4.0), None, secs(1.04), secs(2.0), secs(3.0), secs(0.2)]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.zero_count, 1);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.max, 4.0);

        // Even length: index n / 2 of the ascending series
        let stats = TestResultStats::from_latencies(&[secs(1.0), secs(2.0), secs(3.0), secs(4.0)]);
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn test_throughput_stats_descending() {
        let stats = TestResultStats::from_throughputs_kbps(&[Some(10240.0), Some(20480.0), None, Some(30720.0), Some(40960.0)]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.min, 10.0);
        // Descending [40, 30, 20, 10], index 2
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.zero_count, 0);
    }

    #[test]
    fn test_all_unset_yields_zero_stats() {
        assert_eq!(TestResultStats::from_latencies(&[None, None]), TestResultStats::default());
        assert_eq!(TestResultStats::from_throughputs_kbps(&[None]), TestResultStats::default());
    }

    #[test]
    fn test_prior_failure_takes_precedence() {
        let mut result = SingleTestResult::new(0);
        result.prior_reason = FailureReason::SourceStartDiscovery;
        result.active_reason = FailureReason::Success;
        assert_eq!(result.failure_reason(), FailureReason::SourceStartDiscovery);
        result.finish(&create_test_tips());
        assert!(result
            .result_message
            .starts_with("FAIL (The prior BT connection): SOURCE_START_DISCOVERY - "));
    }

    #[test]
    fn test_abort_keeps_phase_reason_or_marks_device_config_error() {
        let mut result = SingleTestResult::new(0);
        result.abort("snippet socket closed");
        result.finish(&create_test_tips());
        assert_eq!(result.failure_reason(), FailureReason::DeviceConfigError);
        assert_eq!(result.failure_detail.as_deref(), Some("snippet socket closed"));
        assert!(!result.result_message.starts_with("SKIPPED"));

        let mut result = SingleTestResult::new(1);
        result.fail(FailureReason::WrongApFrequency, "AP on a DFS channel");
        result.abort("AP on a DFS channel");
        assert_eq!(result.failure_reason(), FailureReason::WrongApFrequency);

        let mut result = SingleTestResult::new(2);
        result.active_reason = FailureReason::Success;
        result.abort("snippet socket closed");
        assert_eq!(result.failure_reason(), FailureReason::DeviceConfigError);

        let mut result = SingleTestResult::new(3);
        result.prior_reason = FailureReason::TargetAcceptConnection;
        result.abort("snippet socket closed");
        assert_eq!(result.active_reason, FailureReason::Uninitialized);
        assert_eq!(result.failure_reason(), FailureReason::TargetAcceptConnection);
    }

    #[test]
    fn test_result_messages() {
        let tips = create_test_tips();
        let mut result = SingleTestResult::new(0);
        result.active_reason = FailureReason::Success;
        result.finish(&tips);
        assert_eq!(result.result_message, "PASS");

        let mut result = SingleTestResult::new(1);
        result.fail(FailureReason::FileTransferThroughputLow, " file speed 2 < target 3 MB/s");
        result.finish(&tips);
        assert_eq!(
            result.result_message,
            "FILE_TRANSFER_THROUGHPUT_LOW - file speed 2 < target 3 MB/s. Check the channel width."
        );

        let mut result = SingleTestResult::new(2);
        result.active_reason = FailureReason::WifiMediumUpgrade;
        result.finish(&tips);
        assert!(result.result_message.starts_with("FAIL: WIFI_MEDIUM_UPGRADE -  WFD"));

        let mut result = SingleTestResult::new(3);
        result.active_reason = FailureReason::TargetWifiConnection;
        result.sta_rssi = Some(-10);
        result.finish(&tips);
        assert!(result.result_message.ends_with("RSSI=-10 which is too high. Consider to move the device away from the AP"));
    }

    #[test]
    fn test_success_rate_gate() {
        let mut results = PerformanceTestResults::new(20, 0.90);
        for i in 0..20 {
            let r = results.start_new_iteration();
            r.active_reason = if i < 18 { FailureReason::Success } else { FailureReason::SourceStartDiscovery };
        }
        assert!(results.is_passed());
        assert_eq!(results.result_message(), "PASS");

        let mut results = PerformanceTestResults::new(20, 0.90);
        for i in 0..20 {
            let r = results.start_new_iteration();
            r.active_reason = if i < 17 { FailureReason::Success } else { FailureReason::SourceStartDiscovery };
        }
        assert!(!results.is_passed());
        assert_eq!(results.result_message(), "FAIL: low success rate: 85.00% < target 90.00%");
    }

    #[test]
    fn test_early_exit_counts_against_plan() {
        let mut results = PerformanceTestResults::new(10, 0.98);
        for _ in 0..5 {
            results.start_new_iteration().active_reason = FailureReason::Success;
        }
        assert!(!results.is_passed());
        assert!(results.result_message().contains("50.00%"));
    }

    #[test]
    fn test_report_histogram_and_upgrade_stats() {
        let mut results = PerformanceTestResults::new(3, 0.5);
        for medium in [ConnectionMedium::WifiDirect, ConnectionMedium::WifiHotspot, ConnectionMedium::WifiDirect] {
            let r = results.start_new_iteration();
            r.active_reason = FailureReason::Success;
            r.quality.upgrade_medium = Some(medium);
            r.quality.medium_upgrade_latency = secs(0.3);
            r.file_transfer_throughput_kbps = Some(30_000.0);
        }
        let report = results.report("scc_5g_wfd_sta", "[BeToCQ-quick_start]", "google-pixel", TestConfigInfo::default(), Medium::UpgradeToWifiDirect);
        assert!(report.passed);
        assert_eq!(report.wifi_upgrade_stats[0], MediumCount { medium: "WIFI_DIRECT".to_string(), count: 2 });
        let upgrade = report.file_transfer_stats.upgrade.unwrap();
        assert_eq!(upgrade.zero_count, 3);
        assert!(report.file_transfer_stats.iperf.is_none());
        assert!(report.prior_bt_connection_stats.is_none());
        let text = report.render_text();
        assert!(text.contains("instant_connection_count: 3"));
        assert!(text.contains("WIFI_HOTSPOT: 1"));
        assert!(serde_json::to_string(&report).is_ok());
    }
}
