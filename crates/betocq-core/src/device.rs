//! Device-side collaborators
//!
//! The runner drives a pair of devices through `DeviceHandle`. Real devices are
//! backed by adb plus the Nearby snippet; tests use scripted mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capabilities::DeviceCapabilities;
use crate::constants::INVALID_INT;
use crate::errors::RpcError;
use crate::medium::ConnectionMedium;
use crate::rpc::NearbySnippet;

/// Which loaded snippet instance to use.
///
/// The secondary slot hosts the prior BT connection when multiplexing is
/// exercised, so both connections have independent callback streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetSlot {
    Primary,
    Secondary,
}

/// Station-mode link facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaInfo {
    pub frequency: i64,
    pub max_link_speed_mbps: i64,
}

impl StaInfo {
    pub fn invalid() -> Self {
        Self {
            frequency: INVALID_INT,
            max_link_speed_mbps: INVALID_INT,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.frequency != INVALID_INT
    }
}

impl Default for StaInfo {
    fn default() -> Self {
        Self::invalid()
    }
}

/// One device under test
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    fn serial(&self) -> &str;

    fn capabilities(&self) -> &DeviceCapabilities;

    /// Snippet loaded in `slot`, if any
    fn snippet(&self, slot: SnippetSlot) -> Option<Arc<dyn NearbySnippet>>;

    async fn manufacturer(&self) -> Result<String, RpcError>;

    async fn model(&self) -> Result<String, RpcError>;

    async fn set_country_code(&self, country_code: &str) -> Result<(), RpcError>;

    /// Associate the STA and return how long it took
    async fn connect_sta(&self, ssid: &str, password: &str) -> Result<Duration, RpcError>;

    /// Forget saved networks and disconnect the STA
    async fn reset_wifi(&self) -> Result<(), RpcError>;

    async fn toggle_airplane_mode(&self) -> Result<(), RpcError>;

    async fn sta_info(&self) -> Result<StaInfo, RpcError>;

    /// Frequency of the Wi-Fi Direct group, `-1` if no group is up
    async fn p2p_frequency(&self) -> Result<i64, RpcError>;

    /// RSSI of `ssid` from the latest scan results
    async fn scan_rssi(&self, ssid: &str) -> Result<i32, RpcError>;
}

/// Cross-checks Nearby throughput with a raw iperf measurement
#[async_trait]
pub trait IperfRunner: Send + Sync {
    /// Measure throughput in KB/s with `server` as the group owner side
    async fn measure_kbps(
        &self,
        server: &dyn DeviceHandle,
        client: &dyn DeviceHandle,
        medium: ConnectionMedium,
    ) -> Result<f64, RpcError>;
}
