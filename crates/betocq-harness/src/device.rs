//! Mock phones and a fixed-rate iperf

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use betocq_core::constants::INVALID_INT;
use betocq_core::{
    ConnectionMedium, DeviceCapabilities, DeviceHandle, IperfRunner, NearbySnippet, RpcError,
    ScenarioSpec, SnippetSlot, StaInfo,
};
use tracing::debug;

use crate::air::MockAir;
use crate::snippet::{MockSnippet, RadioFeatures};
use crate::stream::lock;

const STA_CONNECT_LATENCY: Duration = Duration::from_millis(1_500);
const LOCAL_ONLY_HOTSPOT_FREQ_MHZ: i64 = 5180;
const P2P_2G_FREQ_MHZ: i64 = 2437;
const P2P_5G_OFF_STA_FREQ_MHZ: i64 = 5745;

/// Where the Wi-Fi Direct group lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum P2pChannel {
    /// Same channel as the STA
    FollowSta,
    Fixed(i64),
}

impl P2pChannel {
    /// Channel a well-behaved phone picks for the scenario
    pub fn for_scenario(spec: &ScenarioSpec) -> Self {
        if spec.is_2g_medium {
            P2pChannel::Fixed(P2P_2G_FREQ_MHZ)
        } else if spec.is_mcc || spec.is_dbs {
            P2pChannel::Fixed(P2P_5G_OFF_STA_FREQ_MHZ)
        } else {
            P2pChannel::FollowSta
        }
    }
}

/// Static description of a mock phone
#[derive(Debug, Clone)]
pub struct MockDeviceProfile {
    pub serial: String,
    pub manufacturer: String,
    pub model: String,
    pub capabilities: DeviceCapabilities,
    /// SSID to the link the phone gets when it joins that AP
    pub access_points: BTreeMap<String, StaInfo>,
    pub p2p_channel: P2pChannel,
    pub radio: RadioFeatures,
    pub rssi: i32,
    pub sta_connect_fails: bool,
}

impl MockDeviceProfile {
    pub fn new(serial: impl Into<String>, capabilities: DeviceCapabilities) -> Self {
        Self {
            serial: serial.into(),
            manufacturer: "google".to_string(),
            model: "mock".to_string(),
            capabilities,
            access_points: BTreeMap::new(),
            p2p_channel: P2pChannel::FollowSta,
            radio: RadioFeatures::default(),
            rssi: -45,
            sta_connect_fails: false,
        }
    }

    pub fn with_access_point(mut self, ssid: &str, frequency: i64, max_link_speed_mbps: i64) -> Self {
        self.access_points.insert(
            ssid.to_string(),
            StaInfo {
                frequency,
                max_link_speed_mbps,
            },
        );
        self
    }
}

// ----------------------------------------------------------------------------
// Mock Device
// ----------------------------------------------------------------------------

pub struct MockDevice {
    profile: MockDeviceProfile,
    sta: Arc<Mutex<Option<StaInfo>>>,
    country_code: Mutex<Option<String>>,
    air: Arc<MockAir>,
    primary: Arc<MockSnippet>,
    secondary: Arc<MockSnippet>,
}

impl MockDevice {
    pub fn new(profile: MockDeviceProfile, air: Arc<MockAir>) -> Self {
        let sta = Arc::new(Mutex::new(None));
        let snippet = |slot| {
            Arc::new(MockSnippet::new(
                &profile.serial,
                slot,
                air.clone(),
                profile.radio,
                sta.clone(),
            ))
        };
        let primary = snippet(SnippetSlot::Primary);
        let secondary = snippet(SnippetSlot::Secondary);
        Self {
            profile,
            sta,
            country_code: Mutex::new(None),
            air,
            primary,
            secondary,
        }
    }

    pub fn profile(&self) -> &MockDeviceProfile {
        &self.profile
    }

    pub fn mock_snippet(&self, slot: SnippetSlot) -> &Arc<MockSnippet> {
        match slot {
            SnippetSlot::Primary => &self.primary,
            SnippetSlot::Secondary => &self.secondary,
        }
    }

    pub fn country_code(&self) -> Option<String> {
        lock(&self.country_code).clone()
    }

    pub fn associated(&self) -> Option<StaInfo> {
        *lock(&self.sta)
    }

    fn record(&self, method: &str) {
        self.air.log().record(format!("{}:{}", self.profile.serial, method));
    }

    fn remote(method: &str, message: impl Into<String>) -> RpcError {
        RpcError::Remote {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl DeviceHandle for MockDevice {
    fn serial(&self) -> &str {
        &self.profile.serial
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.profile.capabilities
    }

    fn snippet(&self, slot: SnippetSlot) -> Option<Arc<dyn NearbySnippet>> {
        Some(self.mock_snippet(slot).clone() as Arc<dyn NearbySnippet>)
    }

    async fn manufacturer(&self) -> Result<String, RpcError> {
        Ok(self.profile.manufacturer.clone())
    }

    async fn model(&self) -> Result<String, RpcError> {
        Ok(self.profile.model.clone())
    }

    async fn set_country_code(&self, country_code: &str) -> Result<(), RpcError> {
        self.record("setCountryCode");
        *lock(&self.country_code) = Some(country_code.to_string());
        Ok(())
    }

    async fn connect_sta(&self, ssid: &str, _password: &str) -> Result<Duration, RpcError> {
        self.record("connectSta");
        if self.profile.sta_connect_fails {
            return Err(Self::remote("wifiConnectSimple", format!("Failed to connect to {}", ssid)));
        }
        let info = self
            .profile
            .access_points
            .get(ssid)
            .copied()
            .ok_or_else(|| Self::remote("wifiConnectSimple", format!("Network {} not found", ssid)))?;
        *lock(&self.sta) = Some(info);
        debug!("[{}] associated with {} at {} MHz", self.profile.serial, ssid, info.frequency);
        Ok(STA_CONNECT_LATENCY)
    }

    async fn reset_wifi(&self) -> Result<(), RpcError> {
        self.record("resetWifi");
        self.air.check_transport()?;
        *lock(&self.sta) = None;
        Ok(())
    }

    async fn toggle_airplane_mode(&self) -> Result<(), RpcError> {
        self.record("toggleAirplaneMode");
        self.air.check_transport()?;
        *lock(&self.sta) = None;
        Ok(())
    }

    async fn sta_info(&self) -> Result<StaInfo, RpcError> {
        Ok(self.associated().unwrap_or_else(StaInfo::invalid))
    }

    async fn p2p_frequency(&self) -> Result<i64, RpcError> {
        if self.air.open_links() == 0 {
            return Ok(INVALID_INT);
        }
        Ok(match self.profile.p2p_channel {
            P2pChannel::Fixed(frequency) => frequency,
            P2pChannel::FollowSta => self
                .associated()
                .map_or(LOCAL_ONLY_HOTSPOT_FREQ_MHZ, |info| info.frequency),
        })
    }

    async fn scan_rssi(&self, _ssid: &str) -> Result<i32, RpcError> {
        Ok(self.profile.rssi)
    }
}

// ----------------------------------------------------------------------------
// Mock iperf
// ----------------------------------------------------------------------------

/// iperf that always measures the same rate
#[derive(Debug, Clone, Copy)]
pub struct MockIperf {
    pub kbps: f64,
}

#[async_trait]
impl IperfRunner for MockIperf {
    async fn measure_kbps(
        &self,
        _server: &dyn DeviceHandle,
        _client: &dyn DeviceHandle,
        _medium: ConnectionMedium,
    ) -> Result<f64, RpcError> {
        Ok(self.kbps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultPlan;

    fn create_test_device() -> MockDevice {
        let profile = MockDeviceProfile::new("target", DeviceCapabilities::default())
            .with_access_point("ap-5g", 5180, 866);
        MockDevice::new(profile, MockAir::seeded(FaultPlan::none(), 3))
    }

    #[tokio::test]
    async fn test_sta_association() {
        let device = create_test_device();
        assert!(!device.sta_info().await.unwrap().is_connected());
        assert!(device.connect_sta("missing", "").await.is_err());

        device.connect_sta("ap-5g", "pw").await.unwrap();
        let info = device.sta_info().await.unwrap();
        assert_eq!((info.frequency, info.max_link_speed_mbps), (5180, 866));

        let snippet = device.snippet(SnippetSlot::Primary).unwrap();
        let raw = snippet.wifi_get_connection_info().await.unwrap();
        assert_eq!(raw["mFrequency"], 5180);

        device.reset_wifi().await.unwrap();
        assert!(!device.sta_info().await.unwrap().is_connected());
    }

    #[tokio::test]
    async fn test_snippet_slots_have_distinct_endpoints() {
        let device = create_test_device();
        assert_ne!(
            device.mock_snippet(SnippetSlot::Primary).endpoint_id(),
            device.mock_snippet(SnippetSlot::Secondary).endpoint_id()
        );
    }

    #[tokio::test]
    async fn test_broken_transport_fails_nearby_and_wifi_calls() {
        let air = MockAir::seeded(FaultPlan::none(), 5);
        let profile = MockDeviceProfile::new("target", DeviceCapabilities::default());
        let device = MockDevice::new(profile, air.clone());
        let snippet = device.snippet(SnippetSlot::Primary).unwrap();
        assert!(snippet.start_discovery("svc", betocq_core::Medium::BtOnly).await.is_ok());

        air.break_transport("snippet socket closed");
        let err = snippet.start_discovery("svc", betocq_core::Medium::BtOnly).await.err().unwrap();
        assert!(err.is_infrastructure());
        assert!(device.toggle_airplane_mode().await.unwrap_err().is_infrastructure());
        assert!(device.reset_wifi().await.unwrap_err().is_infrastructure());
        assert!(snippet.wifi_is_p2p_supported().await.is_ok());
        assert_eq!(device.manufacturer().await.unwrap(), device.profile.manufacturer);
    }

    #[test]
    fn test_p2p_channel_per_scenario() {
        assert_eq!(P2pChannel::for_scenario(&ScenarioSpec::scc_5g_wfd_sta()), P2pChannel::FollowSta);
        assert_eq!(
            P2pChannel::for_scenario(&ScenarioSpec::mcc_2g_wfd_indoor_5g_sta()),
            P2pChannel::Fixed(P2P_2G_FREQ_MHZ)
        );
        assert_eq!(
            P2pChannel::for_scenario(&ScenarioSpec::scc_5g_wfd_dbs_2g_sta()),
            P2pChannel::Fixed(P2P_5G_OFF_STA_FREQ_MHZ)
        );
    }
}
