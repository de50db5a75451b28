//! Scenario catalog
//!
//! A `ScenarioSpec` is plain data: mediums, AP band, concurrency mode,
//! capability requirements, payload and gate settings. The generic runner
//! interprets it, so adding a scenario means adding a constructor here.

use std::time::Duration;

use serde::Serialize;

use crate::capabilities::{Capability, CapabilityRequirement, Role};
use crate::config::TestParameters;
use crate::constants::*;
use crate::errors::{BetocqError, Result};
use crate::frequency::WifiBand;
use crate::medium::{Medium, PayloadType};
use crate::results::TestConfigInfo;

/// How the throughput target of an iteration is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputCheck {
    /// Computed from capabilities and the STA link
    Derived,
    /// Flat benchmark of the upgrade medium
    Fixed,
    /// No throughput assertion
    Disabled,
}

/// Which optional radio feature the upgrade medium needs on both devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeSupport {
    None,
    WifiDirect,
    WifiAware,
}

/// Declarative description of one test scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub country_code: &'static str,
    pub upgrade_medium: Medium,
    /// `None` uses the configured parameter
    pub advertising_discovery_medium: Option<Medium>,
    /// `None` uses the configured parameter
    pub connection_medium: Option<Medium>,
    /// Band of the AP both devices join; `None` means no STA connection
    pub sta_band: Option<WifiBand>,
    /// Band of a second AP for the target, when it differs
    pub target_sta_band: Option<WifiBand>,
    pub is_mcc: bool,
    pub is_dbs: bool,
    pub is_2g_medium: bool,
    pub requirements: Vec<CapabilityRequirement>,
    pub payload_type: PayloadType,
    pub file_size_kb: u64,
    pub num_files: u32,
    pub transfer_timeout: Duration,
    pub iterations: u32,
    pub max_consecutive_errors: u32,
    pub success_rate_target: f64,
    /// `None` uses the configured parameters
    pub keep_alive: Option<KeepAlive>,
    pub force_disable_bt_multiplex: bool,
    pub throughput_check: ThroughputCheck,
    pub throughput_low_tip: &'static str,
    /// Prefix of the file transfer failure tip; the throughput tip follows it
    pub file_transfer_fail_tip: &'static str,
}

const BOTH_SUPPORT_5G: [CapabilityRequirement; 2] = [
    CapabilityRequirement::new(Role::Discoverer, Capability::Supports5g, true),
    CapabilityRequirement::new(Role::Advertiser, Capability::Supports5g, true),
];

const WFD_BROKEN_TIP: &str = "The Wifi Direct connection might be broken, check related logs, ";

impl ScenarioSpec {
    /// Same-channel 5G Wi-Fi scenario; the other constructors start from it
    fn wifi_scc(id: &'static str, description: &'static str, upgrade_medium: Medium, sta_band: WifiBand) -> Self {
        Self {
            id,
            description,
            country_code: "US",
            upgrade_medium,
            advertising_discovery_medium: None,
            connection_medium: None,
            sta_band: Some(sta_band),
            target_sta_band: None,
            is_mcc: false,
            is_dbs: false,
            is_2g_medium: false,
            requirements: BOTH_SUPPORT_5G.to_vec(),
            payload_type: PayloadType::File,
            file_size_kb: TRANSFER_FILE_SIZE_500MB,
            num_files: TRANSFER_FILE_NUM_DEFAULT,
            transfer_timeout: WIFI_500M_PAYLOAD_TRANSFER_TIMEOUT,
            iterations: SCC_PERFORMANCE_TEST_COUNT,
            max_consecutive_errors: SCC_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR,
            success_rate_target: SUCCESS_RATE_TARGET,
            keep_alive: None,
            force_disable_bt_multiplex: false,
            throughput_check: ThroughputCheck::Derived,
            throughput_low_tip: "",
            file_transfer_fail_tip: WFD_BROKEN_TIP,
        }
    }

    fn wifi_mcc(id: &'static str, description: &'static str, upgrade_medium: Medium, sta_band: WifiBand) -> Self {
        Self {
            is_mcc: true,
            iterations: MCC_PERFORMANCE_TEST_COUNT,
            max_consecutive_errors: MCC_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR,
            ..Self::wifi_scc(id, description, upgrade_medium, sta_band)
        }
    }

    pub fn scc_5g_wfd_sta() -> Self {
        Self {
            throughput_low_tip: concat!(
                "This is a SCC 5G test case with WFD and STA operating at the same 5G channel.",
                " Check STA and WFD GO frequencies in the target logs (dumpsys wifip2p) and",
                " ensure they have the same value. Check with the wifi chip vendor about the",
                " possible firmware Tx/Rx issues in this mode. Also check if the AP channel is",
                " set correctly and is supported by the used wifi medium."
            ),
            ..Self::wifi_scc(
                "scc_5g_wfd_sta",
                "WFD and STA share one 5G channel",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band5g,
            )
        }
    }

    pub fn scc_5g_wfd_dbs_2g_sta() -> Self {
        let mut requirements = BOTH_SUPPORT_5G.to_vec();
        requirements.push(CapabilityRequirement::new(
            Role::Advertiser,
            Capability::SupportsDbsStaWfd,
            true,
        ));
        Self {
            is_dbs: true,
            requirements,
            throughput_low_tip: concat!(
                "This is a SCC 5G test case with WFD medium operating at 5G and STA operating",
                " at 2G. In the configuration file, DBS support is set to true. Check if the",
                " device does support DBS with STA + WFD concurrency. Check with the wifi chip",
                " vendor about the possible firmware Tx/Rx issues in this mode."
            ),
            ..Self::wifi_scc(
                "scc_5g_wfd_dbs_2g_sta",
                "WFD on 5G while the STA is on 2G, relying on DBS",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band2g,
            )
        }
    }

    pub fn scc_dfs_5g_wfd_sta() -> Self {
        Self {
            country_code: "GB",
            requirements: vec![
                CapabilityRequirement::new(Role::Discoverer, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Discoverer, Capability::EnableStaDfsChannelForPeerNetwork, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::EnableStaDfsChannelForPeerNetwork, true),
            ],
            throughput_low_tip: concat!(
                "This is 5G SCC DFS WFD test case. Check STA and WFD GO frequencies in the",
                " target logs (dumpsys wifip2p) and ensure they have the same value. In the",
                " configuration file, enable_sta_dfs_channel_for_peer_network is set to true on",
                " both source and target sides. Check if both device do support WFD group owner",
                " in the STA-associated DFS channel. Check if",
                " config_wifiEnableStaDfsChannelForPeerNetwork is set to true and has the",
                " correct driver/FW implementation."
            ),
            ..Self::wifi_scc(
                "scc_dfs_5g_wfd_sta",
                "WFD group owner on the STA's DFS channel",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band5gDfs,
            )
        }
    }

    pub fn scc_indoor_5g_wfd_sta() -> Self {
        let mut requirements = BOTH_SUPPORT_5G.to_vec();
        requirements.push(CapabilityRequirement::new(
            Role::Advertiser,
            Capability::EnableStaIndoorChannelForPeerNetwork,
            true,
        ));
        Self {
            country_code: "JP",
            requirements,
            throughput_low_tip: concat!(
                "This is 5G SCC indoor WFD test case. Check STA and WFD GO frequencies in the",
                " target logs (dumpsys wifip2p) and ensure they have the same value. In the",
                " configuration file, enable_sta_indoor_channel_for_peer_network is set to true.",
                " Check if the target device does support WFD group owner in the",
                " STA-associated indoor channel. Check if",
                " config_wifiEnableStaIndoorChannelForPeerNetwork is set to true and has the",
                " correct driver/FW implementation."
            ),
            ..Self::wifi_scc(
                "scc_indoor_5g_wfd_sta",
                "WFD group owner on the STA's indoor channel",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band5g,
            )
        }
    }

    pub fn scc_5g_wlan_sta() -> Self {
        Self {
            throughput_low_tip: concat!(
                "This is 5G WLAN test case. Check with the wifi chip vendor if TDLS is",
                " supported correctly. Also check if the AP has the firewall which could block",
                " the mDNS traffic."
            ),
            file_transfer_fail_tip: "The WLAN connection might be broken, check related logs, ",
            ..Self::wifi_scc(
                "scc_5g_wlan_sta",
                "Nearby over the shared 5G WLAN",
                Medium::WifiLanOnly,
                WifiBand::Band5g,
            )
        }
    }

    pub fn scc_5g_aware_sta() -> Self {
        Self {
            force_disable_bt_multiplex: true,
            throughput_low_tip: concat!(
                "This is a SCC 5G test case with Aware and STA operating at the same 5G channel.",
                " Check STA and Aware frequencies in the target logs and ensure they have the",
                " same value. Check with the wifi chip vendor about the possible firmware Tx/Rx",
                " issues in this mode. Also check if the AP channel is set correctly and is",
                " supported by the used wifi medium."
            ),
            file_transfer_fail_tip: "The Wifi Aware connection might be broken, check related logs, ",
            ..Self::wifi_scc(
                "scc_5g_aware_sta",
                "Wi-Fi Aware and STA share one 5G channel",
                Medium::WifiAwareOnly,
                WifiBand::Band5g,
            )
        }
    }

    pub fn mcc_5g_wfd_dfs_5g_sta() -> Self {
        Self {
            country_code: "GB",
            requirements: vec![
                CapabilityRequirement::new(Role::Discoverer, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::EnableStaDfsChannelForPeerNetwork, false),
            ],
            throughput_low_tip: concat!(
                "This is a MCC test case where WFD uses a 5G non-DFS channel and STA uses a 5G",
                " DFS channel. Check with the wifi chip vendor about the possible firmware Tx/Rx",
                " issues in MCC mode."
            ),
            file_transfer_fail_tip: "The Wifi Direct connection might be broken, check the related log, ",
            ..Self::wifi_mcc(
                "mcc_5g_wfd_dfs_5g_sta",
                "WFD on a non-DFS 5G channel while the STA is on DFS",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band5gDfs,
            )
        }
    }

    pub fn mcc_2g_wfd_indoor_5g_sta() -> Self {
        let mut requirements = BOTH_SUPPORT_5G.to_vec();
        requirements.push(CapabilityRequirement::new(
            Role::Advertiser,
            Capability::EnableStaIndoorChannelForPeerNetwork,
            false,
        ));
        Self {
            country_code: "JP",
            is_2g_medium: true,
            requirements,
            file_size_kb: TRANSFER_FILE_SIZE_20MB,
            transfer_timeout: WIFI_2G_20M_PAYLOAD_TRANSFER_TIMEOUT,
            iterations: SCC_PERFORMANCE_TEST_COUNT,
            max_consecutive_errors: SCC_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR,
            throughput_low_tip: concat!(
                "This is a MCC test case where WFD uses a 2G channel and the STA uses a 5G",
                " indoor channel. Check with the wifi chip vendor about the possible firmware",
                " Tx/Rx issues in MCC mode."
            ),
            ..Self::wifi_mcc(
                "mcc_2g_wfd_indoor_5g_sta",
                "WFD falls back to 2G while the STA is on an indoor 5G channel",
                Medium::UpgradeToWifiDirect,
                WifiBand::Band5g,
            )
        }
    }

    pub fn mcc_5g_hotspot_dfs_5g_sta() -> Self {
        Self {
            country_code: "GB",
            requirements: vec![
                CapabilityRequirement::new(Role::Discoverer, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::Supports5g, true),
                CapabilityRequirement::new(Role::Advertiser, Capability::EnableStaDfsChannelForPeerNetwork, false),
            ],
            file_size_kb: TRANSFER_FILE_SIZE_100MB,
            transfer_timeout: WIFI_100M_PAYLOAD_TRANSFER_TIMEOUT,
            success_rate_target: MCC_HOTSPOT_SUCCESS_RATE_TARGET,
            throughput_low_tip: concat!(
                "This is a MCC test case where hotspot uses a 5G non-DFS channel and STA uses a",
                " 5G DFS channel. Note that in hotspot mode, the target acts as a WFD GO while",
                " the source device acts as the legacy STA. Check with the wifi chip vendor",
                " about the possible firmware Tx/Rx issues in MCC mode."
            ),
            file_transfer_fail_tip: "The hotspot connection might be broken, check the related log, ",
            ..Self::wifi_mcc(
                "mcc_5g_hotspot_dfs_5g_sta",
                "Hotspot on a non-DFS 5G channel while the STA is on DFS",
                Medium::UpgradeToWifiHotspot,
                WifiBand::Band5gDfs,
            )
        }
    }

    pub fn mcc_aware_sta() -> Self {
        Self {
            target_sta_band: Some(WifiBand::Band5gDfs),
            force_disable_bt_multiplex: true,
            throughput_low_tip: concat!(
                "This is a MCC 5G test case with Aware and STA operating at different 5G",
                " channels. Check with the wifi chip vendor about the possible firmware Tx/Rx",
                " issues in this mode. Also check if the AP channel is set correctly and is",
                " supported by the used wifi medium."
            ),
            file_transfer_fail_tip: "The Wifi Aware connection might be broken, check related logs, ",
            ..Self::wifi_mcc(
                "mcc_aware_sta",
                "Wi-Fi Aware while the two STAs sit on different 5G channels",
                Medium::WifiAwareOnly,
                WifiBand::Band5g,
            )
        }
    }

    pub fn local_only_hotspot() -> Self {
        Self {
            sta_band: None,
            throughput_low_tip: concat!(
                "This is local only hotspot test case. Check if the local only hotspot enabled",
                " 5G channel properly."
            ),
            file_transfer_fail_tip: "The Wifi Hotspot connection might be broken, check related logs, ",
            ..Self::wifi_scc(
                "local_only_hotspot",
                "Hotspot upgrade without any AP",
                Medium::UpgradeToWifiHotspot,
                WifiBand::Band5g,
            )
        }
    }

    pub fn ble_performance() -> Self {
        Self {
            id: "ble_performance",
            description: "BLE connection throughput",
            country_code: "US",
            upgrade_medium: Medium::BleOnly,
            advertising_discovery_medium: None,
            connection_medium: Some(Medium::BleOnly),
            sta_band: None,
            target_sta_band: None,
            is_mcc: false,
            is_dbs: false,
            is_2g_medium: false,
            requirements: Vec::new(),
            payload_type: PayloadType::File,
            file_size_kb: TRANSFER_FILE_SIZE_20KB,
            num_files: TRANSFER_FILE_NUM_DEFAULT,
            transfer_timeout: BLE_20K_PAYLOAD_TRANSFER_TIMEOUT,
            iterations: BT_PERFORMANCE_TEST_COUNT,
            max_consecutive_errors: BT_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR,
            success_rate_target: BLE_PERFORMANCE_SUCCESS_RATE_TARGET,
            keep_alive: Some(KeepAlive::BT),
            force_disable_bt_multiplex: true,
            throughput_check: ThroughputCheck::Fixed,
            throughput_low_tip: "Check with the chip vendor if there is any BT firmware issue.",
            file_transfer_fail_tip: "The BLE connection might be broken, check the related logs, ",
        }
    }

    pub fn bt_performance() -> Self {
        Self {
            id: "bt_performance",
            description: "Classic Bluetooth connection throughput",
            connection_medium: Some(Medium::BtOnly),
            upgrade_medium: Medium::BtOnly,
            file_size_kb: TRANSFER_FILE_SIZE_500KB,
            transfer_timeout: BT_500K_PAYLOAD_TRANSFER_TIMEOUT,
            success_rate_target: SUCCESS_RATE_TARGET,
            force_disable_bt_multiplex: false,
            file_transfer_fail_tip: "The classic Bluetooth connection might be broken, check related logs. ",
            ..Self::ble_performance()
        }
    }

    pub fn nearby_connections_function() -> Self {
        Self {
            id: "nearby_connections_function",
            description: "Many small payloads over Bluetooth",
            connection_medium: Some(Medium::BtOnly),
            upgrade_medium: Medium::BtOnly,
            file_size_kb: TRANSFER_FILE_SIZE_1KB,
            num_files: TRANSFER_FILE_NUM_FUNCTION_TEST,
            transfer_timeout: FUNCTION_TEST_TRANSFER_TIMEOUT,
            iterations: 1,
            max_consecutive_errors: 1,
            success_rate_target: 1.0,
            force_disable_bt_multiplex: true,
            throughput_check: ThroughputCheck::Disabled,
            throughput_low_tip: "",
            file_transfer_fail_tip: "The Bluetooth connection might be broken, check related logs.",
            ..Self::ble_performance()
        }
    }

    /// Every built-in scenario
    pub fn all() -> Vec<ScenarioSpec> {
        vec![
            Self::scc_5g_wfd_sta(),
            Self::scc_5g_wfd_dbs_2g_sta(),
            Self::scc_dfs_5g_wfd_sta(),
            Self::scc_indoor_5g_wfd_sta(),
            Self::scc_5g_wlan_sta(),
            Self::scc_5g_aware_sta(),
            Self::mcc_5g_wfd_dfs_5g_sta(),
            Self::mcc_2g_wfd_indoor_5g_sta(),
            Self::mcc_5g_hotspot_dfs_5g_sta(),
            Self::mcc_aware_sta(),
            Self::local_only_hotspot(),
            Self::ble_performance(),
            Self::bt_performance(),
            Self::nearby_connections_function(),
        ]
    }

    pub fn by_id(id: &str) -> Result<ScenarioSpec> {
        Self::all()
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| BetocqError::UnknownScenario(id.to_string()))
    }

    // ------------------------------------------------------------------------
    // Interpretation
    // ------------------------------------------------------------------------

    pub fn upgrade_support(&self) -> UpgradeSupport {
        match self.upgrade_medium {
            Medium::UpgradeToWifiDirect | Medium::UpgradeToWifiHotspot => UpgradeSupport::WifiDirect,
            Medium::WifiAwareOnly => UpgradeSupport::WifiAware,
            _ => UpgradeSupport::None,
        }
    }

    /// SSID and password of the discoverer's AP
    pub fn source_credentials<'a>(&self, params: &'a TestParameters) -> Option<(&'a str, &'a str)> {
        self.sta_band.map(|band| credentials(params, band))
    }

    /// SSID and password of the advertiser's AP
    pub fn target_credentials<'a>(&self, params: &'a TestParameters) -> Option<(&'a str, &'a str)> {
        self.target_sta_band
            .or(self.sta_band)
            .map(|band| credentials(params, band))
    }

    /// Band the target STA must report after a transfer
    pub fn expected_target_band(&self) -> Option<WifiBand> {
        self.target_sta_band.or(self.sta_band)
    }

    /// Whether every AP the scenario needs has an SSID
    pub fn is_ap_ready(&self, params: &TestParameters) -> bool {
        [self.sta_band, self.target_sta_band]
            .into_iter()
            .flatten()
            .all(|band| !credentials(params, band).0.is_empty())
    }

    /// Whether the parameters select this scenario for a suite run
    pub fn is_enabled_by(&self, params: &TestParameters) -> bool {
        match self.id {
            "ble_performance" => params.run_ble_performance_test,
            "bt_performance" => params.run_bt_performance_test,
            "nearby_connections_function" => params.run_nearby_connections_function_tests,
            _ if self.upgrade_support() == UpgradeSupport::WifiAware => {
                params.run_directed_test && params.run_aware_test
            }
            _ => params.run_directed_test,
        }
    }

    pub fn advertising_discovery_medium(&self, params: &TestParameters) -> Medium {
        self.advertising_discovery_medium
            .unwrap_or(params.advertising_discovery_medium)
    }

    pub fn connection_medium(&self, params: &TestParameters) -> Medium {
        self.connection_medium.unwrap_or(params.connection_medium)
    }

    pub fn keep_alive(&self, params: &TestParameters) -> KeepAlive {
        self.keep_alive.unwrap_or_else(|| params.keep_alive())
    }

    /// Full file transfer failure tip
    pub fn file_transfer_tip(&self) -> String {
        format!("{}{}", self.file_transfer_fail_tip, self.throughput_low_tip)
    }

    pub fn test_config_info(&self, params: &TestParameters) -> TestConfigInfo {
        TestConfigInfo {
            country_code: self.country_code.to_string(),
            advertising_discovery_medium: self.advertising_discovery_medium(params).to_string(),
            connection_medium: self.connection_medium(params).to_string(),
            upgrade_medium: self.upgrade_medium.to_string(),
            is_2g_only: self.is_2g_medium,
            is_dbs_mode: self.is_dbs,
            is_mcc_mode: self.is_mcc,
            discoverer_wifi_ssid: self
                .source_credentials(params)
                .map(|(ssid, _)| ssid.to_string())
                .unwrap_or_default(),
            advertiser_wifi_ssid: self
                .target_credentials(params)
                .map(|(ssid, _)| ssid.to_string())
                .unwrap_or_default(),
        }
    }
}

fn credentials(params: &TestParameters, band: WifiBand) -> (&str, &str) {
    match band {
        WifiBand::Band2g => (params.wifi_2g_ssid.as_str(), params.wifi_2g_password.as_str()),
        WifiBand::Band5g => (params.wifi_5g_ssid.as_str(), params.wifi_5g_password.as_str()),
        WifiBand::Band5gDfs => (params.wifi_dfs_5g_ssid.as_str(), params.wifi_dfs_5g_password.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_params() -> TestParameters {
        TestParameters {
            wifi_5g_ssid: "ap-5g".to_string(),
            wifi_5g_password: "pw".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_catalog_ids_unique() {
        let all = ScenarioSpec::all();
        assert_eq!(all.len(), 14);
        let mut ids: Vec<_> = all.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 14);
    }

    #[test]
    fn test_by_id() {
        let spec = ScenarioSpec::by_id("mcc_5g_hotspot_dfs_5g_sta").unwrap();
        assert!(spec.is_mcc);
        assert_eq!(spec.success_rate_target, MCC_HOTSPOT_SUCCESS_RATE_TARGET);
        assert_eq!(spec.file_size_kb, TRANSFER_FILE_SIZE_100MB);
        assert!(matches!(
            ScenarioSpec::by_id("nope"),
            Err(BetocqError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_ap_readiness() {
        let params = create_test_params();
        assert!(ScenarioSpec::scc_5g_wfd_sta().is_ap_ready(&params));
        assert!(!ScenarioSpec::scc_dfs_5g_wfd_sta().is_ap_ready(&params));
        // Needs both the 5G and DFS SSIDs
        assert!(!ScenarioSpec::mcc_aware_sta().is_ap_ready(&params));
        assert!(ScenarioSpec::local_only_hotspot().is_ap_ready(&TestParameters::default()));
    }

    #[test]
    fn test_target_uses_second_ap() {
        let params = TestParameters {
            wifi_dfs_5g_ssid: "ap-dfs".to_string(),
            ..create_test_params()
        };
        let spec = ScenarioSpec::mcc_aware_sta();
        assert_eq!(spec.source_credentials(&params), Some(("ap-5g", "pw")));
        assert_eq!(spec.target_credentials(&params).map(|c| c.0), Some("ap-dfs"));
        assert_eq!(spec.expected_target_band(), Some(WifiBand::Band5gDfs));
    }

    #[test]
    fn test_mediums_fall_back_to_parameters() {
        let params = create_test_params();
        let spec = ScenarioSpec::scc_5g_wfd_sta();
        assert_eq!(spec.connection_medium(&params), Medium::BtOnly);
        assert_eq!(spec.keep_alive(&params), KeepAlive::WIFI);
        let ble = ScenarioSpec::ble_performance();
        assert_eq!(ble.connection_medium(&params), Medium::BleOnly);
        assert_eq!(ble.keep_alive(&params), KeepAlive::BT);
    }

    #[test]
    fn test_selection_by_parameters() {
        let params = TestParameters::default();
        assert!(ScenarioSpec::scc_5g_wfd_sta().is_enabled_by(&params));
        assert!(!ScenarioSpec::scc_5g_aware_sta().is_enabled_by(&params));
        assert!(!ScenarioSpec::ble_performance().is_enabled_by(&params));
        assert!(ScenarioSpec::bt_performance().is_enabled_by(&params));
    }

    #[test]
    fn test_config_info() {
        let info = ScenarioSpec::scc_5g_wfd_dbs_2g_sta().test_config_info(&create_test_params());
        assert!(info.is_dbs_mode);
        assert_eq!(info.upgrade_medium, "UPGRADE_TO_WIFIDIRECT");
        assert_eq!(info.discoverer_wifi_ssid, "");
    }
}
