//! `NearbySnippet` backed by the mock air

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use betocq_core::{
    CallbackStream, ConnectionRequest, Medium, NearbySnippet, PayloadType, RpcError, SnippetSlot,
    StaInfo,
};
use serde_json::{json, Value};

use crate::air::{MockAir, Station};
use crate::stream::{lock, StreamHandle};

/// Wi-Fi features a mock phone reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioFeatures {
    pub tdls: bool,
    pub p2p: bool,
    pub aware: bool,
}

impl Default for RadioFeatures {
    fn default() -> Self {
        Self {
            tdls: true,
            p2p: true,
            aware: true,
        }
    }
}

/// One snippet instance on a mock phone
pub struct MockSnippet {
    station: Station,
    air: Arc<MockAir>,
    radio: RadioFeatures,
    /// Association state owned by the device
    sta: Arc<Mutex<Option<StaInfo>>>,
}

impl MockSnippet {
    pub fn new(
        serial: &str,
        slot: SnippetSlot,
        air: Arc<MockAir>,
        radio: RadioFeatures,
        sta: Arc<Mutex<Option<StaInfo>>>,
    ) -> Self {
        let station = Station {
            serial: serial.to_string(),
            endpoint_id: air.new_endpoint_id(),
            slot,
        };
        Self {
            station,
            air,
            radio,
            sta,
        }
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn endpoint_id(&self) -> &str {
        &self.station.endpoint_id
    }

    fn record(&self, method: &str) {
        self.air.log().record(format!("{}:{}", self.station.serial, method));
    }
}

#[async_trait]
impl NearbySnippet for MockSnippet {
    async fn start_advertising(
        &self,
        endpoint_name: &str,
        service_id: &str,
        _advertising_medium: Medium,
        _upgrade_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.air.check_transport()?;
        let stream = self
            .air
            .start_advertising(&self.station, endpoint_name, service_id)?;
        Ok(Box::new(StreamHandle(stream)))
    }

    async fn start_discovery(
        &self,
        service_id: &str,
        _discovery_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.air.check_transport()?;
        Ok(Box::new(StreamHandle(
            self.air.start_discovery(&self.station, service_id),
        )))
    }

    async fn request_connection(
        &self,
        request: &ConnectionRequest,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.air.check_transport()?;
        let stream = self.air.request_connection(&self.station, request)?;
        Ok(Box::new(StreamHandle(stream)))
    }

    async fn accept_connection(&self, endpoint_id: &str) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.air.check_transport()?;
        let stream = self.air.accept_connection(&self.station, endpoint_id)?;
        Ok(Box::new(StreamHandle(stream)))
    }

    async fn disconnect_from_endpoint(&self, endpoint_id: &str) -> Result<(), RpcError> {
        self.air.disconnect(&self.station, endpoint_id)
    }

    async fn stop_advertising(&self) -> Result<(), RpcError> {
        self.air.stop_advertising(&self.station);
        Ok(())
    }

    async fn stop_discovery(&self) -> Result<(), RpcError> {
        self.air.stop_discovery(&self.station);
        Ok(())
    }

    async fn stop_all_endpoints(&self) -> Result<(), RpcError> {
        self.air.stop_all_endpoints(&self.station);
        Ok(())
    }

    async fn send_multiple_payload_with_type(
        &self,
        endpoint_id: &str,
        _name: &str,
        size_kb: u64,
        payload_type: PayloadType,
        count: u32,
    ) -> Result<i64, RpcError> {
        self.air
            .send_payloads(&self.station, endpoint_id, size_kb, payload_type, count)
    }

    async fn transfer_files_cleanup(&self) -> Result<(), RpcError> {
        self.record("transferFilesCleanup");
        Ok(())
    }

    async fn wifi_is_tdls_supported(&self) -> Result<bool, RpcError> {
        Ok(self.radio.tdls)
    }

    async fn wifi_get_connection_info(&self) -> Result<Value, RpcError> {
        let info = (*lock(&self.sta)).unwrap_or_else(StaInfo::invalid);
        Ok(json!({
            "mFrequency": info.frequency,
            "mMaxSupportedTxLinkSpeed": info.max_link_speed_mbps,
        }))
    }

    async fn wifi_aware_is_available(&self) -> Result<bool, RpcError> {
        Ok(self.radio.aware)
    }

    async fn wifi_is_p2p_supported(&self) -> Result<bool, RpcError> {
        Ok(self.radio.p2p)
    }
}
