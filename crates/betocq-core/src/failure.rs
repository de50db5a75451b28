//! Failure taxonomy and triage tips
//!
//! Every iteration resolves to exactly one `FailureReason`. The static tips
//! below are what an operator sees next to a failed iteration.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::medium::Medium;

// ----------------------------------------------------------------------------
// Failure Reasons
// ----------------------------------------------------------------------------

/// Outcome of one connection attempt or one whole iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Never reached a phase; must not survive into a finished result
    Uninitialized,
    SourceStartDiscovery,
    TargetStartAdvertising,
    SourceRequestConnection,
    TargetAcceptConnection,
    WifiMediumUpgrade,
    FileTransferFail,
    FileTransferThroughputLow,
    SourceWifiConnection,
    TargetWifiConnection,
    ApIsNotConfigured,
    DisconnectedFromAp,
    WrongApFrequency,
    WrongP2pFrequency,
    DeviceConfigError,
    Success,
    Skipped,
}

const WIFI_CONNECTION_CHECKLIST: &str = concat!(
    " 1) Check if the wifi ssid or password is correct;\n",
    " 2) Try to remove any saved wifi network from wifi settings;\n",
    " 3) Check if other device can connect to the same AP\n",
    " 4) Check the wifi connection related log on the device.\n",
    " 5) Check if RSSI is too high and device is too close to the AP.\n",
);

const WFD_GROUP_OWNER_CHECKLIST: &str = concat!(
    "If WFD group owner fails to start, check your factory build to ensure that\n",
    " 1) includes the wpa_supplicant patch to avoid scan before starting GO",
    " https://w1.fi/cgit/hostap/commit/?id=b18d95759375834b6ca6f864c898f27d161b14ca.\n",
    " 2) includes WiFi mainline module 34.11.10.06.0 or later version which fixes",
    " the out-of-order message issue between P2P and tethering modules\n",
    " 3) HAL getUsableChannels() returns the correct channel list. Run \"adb shell cmd",
    " wifi get-allowed-channel\" and ensure it does not include DFS channels unless",
    " config_wifiEnableStaDfsChannelForPeerNetwork is set to true. DFS channels can be",
    " found from https://en.wikipedia.org/wiki/List_of_WLAN_channels.\n",
    "Also check if BT socket is still connected and read/write is normal when the",
    " upgrade failure happens.\n",
    " If WFD group client fails to connect, check if the devices are too close to each",
    " other. The recommended minimum device is 10cm (4 inches).",
);

impl FailureReason {
    /// Upper-case name used in result messages
    pub fn name(self) -> &'static str {
        match self {
            FailureReason::Uninitialized => "UNINITIALIZED",
            FailureReason::SourceStartDiscovery => "SOURCE_START_DISCOVERY",
            FailureReason::TargetStartAdvertising => "TARGET_START_ADVERTISING",
            FailureReason::SourceRequestConnection => "SOURCE_REQUEST_CONNECTION",
            FailureReason::TargetAcceptConnection => "TARGET_ACCEPT_CONNECTION",
            FailureReason::WifiMediumUpgrade => "WIFI_MEDIUM_UPGRADE",
            FailureReason::FileTransferFail => "FILE_TRANSFER_FAIL",
            FailureReason::FileTransferThroughputLow => "FILE_TRANSFER_THROUGHPUT_LOW",
            FailureReason::SourceWifiConnection => "SOURCE_WIFI_CONNECTION",
            FailureReason::TargetWifiConnection => "TARGET_WIFI_CONNECTION",
            FailureReason::ApIsNotConfigured => "AP_IS_NOT_CONFIGURED",
            FailureReason::DisconnectedFromAp => "DISCONNECTED_FROM_AP",
            FailureReason::WrongApFrequency => "WRONG_AP_FREQUENCY",
            FailureReason::WrongP2pFrequency => "WRONG_P2P_FREQUENCY",
            FailureReason::DeviceConfigError => "DEVICE_CONFIG_ERROR",
            FailureReason::Success => "SUCCESS",
            FailureReason::Skipped => "SKIPPED",
        }
    }

    pub fn is_success(self) -> bool {
        self == FailureReason::Success
    }

    /// Whether the reason denotes a finished, failed outcome
    pub fn is_failure(self) -> bool {
        !matches!(
            self,
            FailureReason::Success | FailureReason::Uninitialized | FailureReason::Skipped
        )
    }

    /// Static operator-facing triage tip
    pub fn triage_tip(self) -> String {
        match self {
            FailureReason::Uninitialized => concat!(
                "not executed, the whole test was exited earlier; the devices may be",
                " disconnected from the host, abnormal things, such as system crash,",
                " mobly snippet was killed; Or something wrong with the script, check",
                " the test running log and the corresponding bugreport log."
            )
            .to_string(),
            FailureReason::Success => "success!".to_string(),
            FailureReason::Skipped => "The test was skipped.".to_string(),
            FailureReason::SourceStartDiscovery => {
                "The source device fails to discover the target device.".to_string()
            }
            FailureReason::TargetStartAdvertising => {
                "The target device can not start advertising.".to_string()
            }
            FailureReason::SourceRequestConnection => {
                "The source device fails to connect to the target device".to_string()
            }
            FailureReason::TargetAcceptConnection => {
                "The target device fails to accept the connection.".to_string()
            }
            FailureReason::WifiMediumUpgrade => {
                "The connection fails to upgrade to the high bandwidth medium.".to_string()
            }
            FailureReason::FileTransferFail => {
                "The file transfer fails, check the related Nearby Connections logs.".to_string()
            }
            FailureReason::FileTransferThroughputLow => {
                "The file transfer throughput is lower than the target.".to_string()
            }
            FailureReason::SourceWifiConnection => format!(
                "The source device can not connect to the wifi AP.\n{}",
                WIFI_CONNECTION_CHECKLIST
            ),
            FailureReason::TargetWifiConnection => format!(
                "The target device can not connect to the wifi AP.\n{}",
                WIFI_CONNECTION_CHECKLIST
            ),
            FailureReason::ApIsNotConfigured => {
                "The test AP is not set correctly in the test configuration file.".to_string()
            }
            FailureReason::DisconnectedFromAp => concat!(
                "The STA is disconnected from the AP. Check AP DHCP config. Check if",
                " other devices can connect to the same AP."
            )
            .to_string(),
            FailureReason::WrongApFrequency => {
                "Check if the test AP is set to the expected frequency.".to_string()
            }
            FailureReason::WrongP2pFrequency => [
                "The test P2P frequency is not set to the expected value.",
                " Check if device capabilities are set correctly in the config file.",
                " If it is SCC DBS test case, check if the device does support DBS;",
                " If it is the SCC indoor or DFS test case, check if the device does support indoor/DFS channels in WFD mode;",
                " If it is a MCC test, check if devices actually supports DBS, indoor or DFS feature and set device capabilities correctly.",
            ]
            .join("\n"),
            FailureReason::DeviceConfigError => {
                "Check if device capabilities are set correctly in the config file.".to_string()
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Triage tip for a failed bandwidth upgrade to `medium`
pub fn medium_upgrade_failure_tip(medium: Medium) -> String {
    match medium {
        Medium::WifiLanOnly => concat!(
            " WLAN, check if AP blocks the mDNS traffic. Check if STA is connected",
            " to AP during WiFi upgrade."
        )
        .to_string(),
        Medium::UpgradeToWifiHotspot => format!(
            concat!(
                " HOTSPOT, check the related wifip2p and NearbyConnections logs to see",
                " if the WFD group owner fails to start on the target side or the STA",
                " fails to connect on the source side.\n {}"
            ),
            WFD_GROUP_OWNER_CHECKLIST
        ),
        Medium::UpgradeToWifiDirect => format!(
            concat!(
                " WFD, check the related wifip2p and NearbyConnections logs if the WFD",
                " group owner fails to start on the target side or WFD group client",
                " fails to connect on the source side. \n {}"
            ),
            WFD_GROUP_OWNER_CHECKLIST
        ),
        Medium::UpgradeToAllWifi => concat!(
            " all WiFI mediums, check NearbyConnections logs to see if WFD, WLAN",
            " and HOTSPOT mediums are tried and if the failure is on the target or",
            " source side. Check directed test results to see which medium fails."
        )
        .to_string(),
        other => format!("unexpected upgrade medium - {}", other),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(FailureReason::Success.is_success());
        assert!(!FailureReason::Success.is_failure());
        assert!(!FailureReason::Uninitialized.is_failure());
        assert!(!FailureReason::Skipped.is_failure());
        assert!(FailureReason::WrongP2pFrequency.is_failure());
    }

    #[test]
    fn test_wifi_connection_tip_has_checklist() {
        let tip = FailureReason::TargetWifiConnection.triage_tip();
        assert!(tip.starts_with("The target device can not connect"));
        assert!(tip.contains(" 5) Check if RSSI is too high"));
    }

    #[test]
    fn test_upgrade_tips() {
        let wfd = medium_upgrade_failure_tip(Medium::UpgradeToWifiDirect);
        let hotspot = medium_upgrade_failure_tip(Medium::UpgradeToWifiHotspot);
        assert!(wfd.starts_with(" WFD"));
        assert!(hotspot.starts_with(" HOTSPOT"));
        assert!(wfd.contains("wpa_supplicant") && hotspot.contains("wpa_supplicant"));
        assert_eq!(
            medium_upgrade_failure_tip(Medium::BtOnly),
            "unexpected upgrade medium - BT_ONLY"
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FailureReason::FileTransferThroughputLow).unwrap();
        assert_eq!(json, "\"FILE_TRANSFER_THROUGHPUT_LOW\"");
        assert_eq!(FailureReason::WrongP2pFrequency.to_string(), "WRONG_P2P_FREQUENCY");
    }
}
