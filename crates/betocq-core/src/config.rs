//! Suite configuration
//!
//! A single TOML document carries the test parameters, the capabilities of both
//! devices and the benchmark calibration. Loading order is defaults, then the
//! file given on the command line or in `BETOCQ_CONFIG`, then `validate()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::benchmark::BenchmarkConstants;
use crate::capabilities::DeviceCapabilities;
use crate::constants::{KeepAlive, TARGET_CUJ_QUICK_START, TARGET_POST_WIFI_CONNECTION_IDLE_TIME_SEC};
use crate::errors::{BetocqError, Result};
use crate::medium::{Medium, PayloadType};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "BETOCQ_CONFIG";

// ----------------------------------------------------------------------------
// Test Parameters
// ----------------------------------------------------------------------------

/// Knobs of a test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    pub target_cuj_name: String,
    pub requires_bt_multiplex: bool,
    pub requires_3p_api_test: bool,
    pub abort_all_tests_on_function_tests_fail: bool,
    pub fast_fail_on_any_error: bool,

    pub use_auto_controlled_wifi_ap: bool,
    pub wifi_2g_ssid: String,
    pub wifi_2g_password: String,
    pub wifi_5g_ssid: String,
    pub wifi_5g_password: String,
    pub wifi_dfs_5g_ssid: String,
    pub wifi_dfs_5g_password: String,
    pub wifi_ssid: String,
    pub wifi_password: String,

    pub advertising_discovery_medium: Medium,
    pub connection_medium: Medium,
    pub payload_type: PayloadType,

    pub toggle_airplane_mode_target_side: bool,
    pub reset_wifi_connection: bool,
    pub disconnect_bt_after_test: bool,
    pub disconnect_wifi_after_test: bool,
    pub allow_unrooted_device: bool,

    pub keep_alive_timeout_ms: u64,
    pub keep_alive_interval_ms: u64,
    pub enable_2g_ble_scan_throttling: bool,
    pub enable_instant_connection: bool,
    pub target_post_wifi_connection_idle_time_sec: u64,

    pub run_function_tests_with_performance_tests: bool,
    pub run_bt_performance_test: bool,
    pub run_ble_performance_test: bool,
    pub run_bt_coex_test: bool,
    pub run_directed_test: bool,
    pub run_compound_test: bool,
    pub run_aware_test: bool,
    pub run_nearby_connections_function_tests: bool,

    pub run_iperf_test: bool,
    pub run_iperf_test_if_nc_speed_is_low: bool,
    pub run_iperf_test_wlan: bool,
    pub check_iperf_speed: bool,
    pub skip_test_if_wifi_chipset_is_empty: bool,

    pub skip_bug_report: bool,
    pub force_telephony_cc: bool,
    pub bypass_airplane_mode_toggling: bool,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            target_cuj_name: "unspecified".to_string(),
            requires_bt_multiplex: false,
            requires_3p_api_test: false,
            abort_all_tests_on_function_tests_fail: true,
            fast_fail_on_any_error: false,

            use_auto_controlled_wifi_ap: false,
            wifi_2g_ssid: String::new(),
            wifi_2g_password: String::new(),
            wifi_5g_ssid: String::new(),
            wifi_5g_password: String::new(),
            wifi_dfs_5g_ssid: String::new(),
            wifi_dfs_5g_password: String::new(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),

            advertising_discovery_medium: Medium::BleOnly,
            connection_medium: Medium::BtOnly,
            payload_type: PayloadType::File,

            toggle_airplane_mode_target_side: false,
            reset_wifi_connection: true,
            disconnect_bt_after_test: false,
            disconnect_wifi_after_test: false,
            allow_unrooted_device: false,

            keep_alive_timeout_ms: KeepAlive::WIFI.timeout_ms,
            keep_alive_interval_ms: KeepAlive::WIFI.interval_ms,
            enable_2g_ble_scan_throttling: true,
            enable_instant_connection: false,
            target_post_wifi_connection_idle_time_sec: TARGET_POST_WIFI_CONNECTION_IDLE_TIME_SEC,

            run_function_tests_with_performance_tests: true,
            run_bt_performance_test: true,
            run_ble_performance_test: false,
            run_bt_coex_test: true,
            run_directed_test: true,
            run_compound_test: true,
            run_aware_test: false,
            run_nearby_connections_function_tests: false,

            run_iperf_test: false,
            run_iperf_test_if_nc_speed_is_low: true,
            run_iperf_test_wlan: true,
            check_iperf_speed: true,
            skip_test_if_wifi_chipset_is_empty: true,

            skip_bug_report: false,
            force_telephony_cc: false,
            bypass_airplane_mode_toggling: false,
        }
    }
}

impl TestParameters {
    /// Keep-alive values the parameters ask for
    pub fn keep_alive(&self) -> KeepAlive {
        KeepAlive {
            timeout_ms: self.keep_alive_timeout_ms,
            interval_ms: self.keep_alive_interval_ms,
        }
    }

    /// Apply settings implied by other settings
    fn apply_implied(&mut self) {
        if self.target_cuj_name == TARGET_CUJ_QUICK_START {
            self.requires_bt_multiplex = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.keep_alive_interval_ms == 0 || self.keep_alive_timeout_ms <= self.keep_alive_interval_ms {
            return Err(BetocqError::Config(format!(
                "keep_alive_timeout_ms ({}) must exceed a non-zero keep_alive_interval_ms ({})",
                self.keep_alive_timeout_ms, self.keep_alive_interval_ms
            )));
        }
        for (name, ssid, password) in [
            ("wifi_2g", &self.wifi_2g_ssid, &self.wifi_2g_password),
            ("wifi_5g", &self.wifi_5g_ssid, &self.wifi_5g_password),
            ("wifi_dfs_5g", &self.wifi_dfs_5g_ssid, &self.wifi_dfs_5g_password),
            ("wifi", &self.wifi_ssid, &self.wifi_password),
        ] {
            if ssid.is_empty() && !password.is_empty() {
                return Err(BetocqError::Config(format!("{}_password is set without {}_ssid", name, name)));
            }
        }
        Ok(())
    }
}

/// Convert string-typed booleans and integers in a parameters table to the
/// type their default has. Test beds pass every user parameter as a string.
fn normalize_parameters(table: &mut toml::Table) -> Result<()> {
    let defaults = match toml::Value::try_from(TestParameters::default()) {
        Ok(toml::Value::Table(defaults)) => defaults,
        Ok(_) => toml::Table::new(),
        Err(e) => {
            return Err(BetocqError::Config(format!(
                "failed to serialize parameter defaults: {}",
                e
            )))
        }
    };
    for (key, value) in table.iter_mut() {
        let text = match value {
            toml::Value::String(s) => s.trim().to_string(),
            _ => continue,
        };
        match defaults.get(key) {
            Some(toml::Value::Boolean(_)) => match text.to_ascii_lowercase().as_str() {
                "true" => *value = toml::Value::Boolean(true),
                "false" => *value = toml::Value::Boolean(false),
                _ => {
                    return Err(BetocqError::Config(format!(
                        "parameter {} expects a boolean, got {:?}",
                        key, text
                    )))
                }
            },
            Some(toml::Value::Integer(_)) => {
                let parsed = text.parse::<i64>().map_err(|_| {
                    BetocqError::Config(format!("parameter {} expects an integer, got {:?}", key, text))
                })?;
                *value = toml::Value::Integer(parsed);
            }
            _ => {}
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Suite Configuration
// ----------------------------------------------------------------------------

/// Capabilities of the two devices under test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Discoverer side
    pub source: DeviceCapabilities,
    /// Advertiser side
    pub target: DeviceCapabilities,
}

/// Complete suite configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub parameters: TestParameters,
    pub devices: DevicesConfig,
    pub benchmark: BenchmarkConstants,
}

impl SuiteConfig {
    /// Load from `path`, or from `BETOCQ_CONFIG` when no path is given.
    /// Without either, the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };
        let config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml_str(&content)?
            }
            None => {
                debug!("No configuration file given, using defaults");
                let mut config = Self::default();
                config.parameters.apply_implied();
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut document: toml::Table = toml::from_str(content)?;
        if let Some(toml::Value::Table(parameters)) = document.get_mut("parameters") {
            normalize_parameters(parameters)?;
        }
        let mut config: SuiteConfig = toml::Value::Table(document).try_into()?;
        config.parameters.apply_implied();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        self.devices.source.validate()?;
        self.devices.target.validate()?;
        self.benchmark.validate()?;
        Ok(())
    }

    /// An annotated example document
    pub fn example_toml() -> &'static str {
        EXAMPLE_CONFIG
    }
}

const EXAMPLE_CONFIG: &str = r#"# BeToCQ suite configuration

[parameters]
target_cuj_name = "quick_start"
wifi_5g_ssid = "BeToCQ-5G"
wifi_5g_password = "password"
wifi_2g_ssid = "BeToCQ-2G"
wifi_2g_password = "password"
wifi_dfs_5g_ssid = "BeToCQ-DFS"
wifi_dfs_5g_password = "password"
# Test beds may pass values as strings
run_iperf_test = "false"
fast_fail_on_any_error = false

[devices.source]
wifi_chipset = "wcn6740"
supports_5g = true
supports_dbs_sta_wfd = true
max_num_streams = 2
max_num_streams_dbs = 1

[devices.target]
wifi_chipset = "wcn6740"
supports_5g = true
supports_dbs_sta_wfd = true
enable_sta_dfs_channel_for_peer_network = false
enable_sta_indoor_channel_for_peer_network = false

[benchmark]
mcc_throughput_multiplier = 0.25
wlan_medium_throughput_cap_mbps = 15.0
"#;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let params = TestParameters::default();
        assert_eq!(params.target_cuj_name, "unspecified");
        assert_eq!(params.advertising_discovery_medium, Medium::BleOnly);
        assert_eq!(params.connection_medium, Medium::BtOnly);
        assert_eq!(params.keep_alive_timeout_ms, 10_000);
        assert_eq!(params.keep_alive_interval_ms, 3_000);
        assert!(params.reset_wifi_connection);
        assert!(!params.run_aware_test);
        assert!(SuiteConfig::default().validate().is_ok());
    }

    #[test]
    fn test_string_typed_values_are_converted() {
        let config = SuiteConfig::from_toml_str(
            r#"
            [parameters]
            run_iperf_test = "true"
            keep_alive_timeout_ms = "20000"
            wifi_5g_ssid = "12345"
            connection_medium = "UPGRADE_TO_WIFIDIRECT"
            advertising_discovery_medium = 1
            "#,
        )
        .unwrap();
        assert!(config.parameters.run_iperf_test);
        assert_eq!(config.parameters.keep_alive_timeout_ms, 20_000);
        assert_eq!(config.parameters.wifi_5g_ssid, "12345");
        assert_eq!(config.parameters.connection_medium, Medium::UpgradeToWifiDirect);
        assert_eq!(config.parameters.advertising_discovery_medium, Medium::BtOnly);
    }

    #[test]
    fn test_bad_string_bool_rejected() {
        let err = SuiteConfig::from_toml_str("[parameters]\nrun_iperf_test = \"yes\"").unwrap_err();
        assert!(err.to_string().contains("run_iperf_test"));
    }

    #[test]
    fn test_quick_start_requires_multiplex() {
        let config = SuiteConfig::from_toml_str("[parameters]\ntarget_cuj_name = \"quick_start\"").unwrap();
        assert!(config.parameters.requires_bt_multiplex);
    }

    #[test]
    fn test_unknown_capability_is_config_error() {
        let err = SuiteConfig::from_toml_str("[devices.source]\nsupports_6g = true").unwrap_err();
        assert!(matches!(err, BetocqError::TomlParsing(_)));
    }

    #[test]
    fn test_example_parses_and_validates() {
        let config = SuiteConfig::from_toml_str(SuiteConfig::example_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.parameters.requires_bt_multiplex);
        assert!(config.devices.target.supports_dbs_sta_wfd);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parameters]\nwifi_ssid = \"lab\"\nwifi_password = \"pw\"").unwrap();
        let config = SuiteConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.parameters.wifi_ssid, "lab");
    }

    #[test]
    fn test_password_without_ssid_fails_validation() {
        let config = SuiteConfig::from_toml_str("[parameters]\nwifi_5g_password = \"pw\"").unwrap();
        assert!(config.validate().is_err());
    }
}
