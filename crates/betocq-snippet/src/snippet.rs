//! `NearbySnippet` over a live snippet client

use std::sync::Arc;

use async_trait::async_trait;
use betocq_core::{
    CallbackStream, ConnectionRequest, Medium, NearbySnippet, PayloadType, RpcError,
};
use serde_json::{json, Value};

use crate::callback::SnippetCallbackStream;
use crate::client::SnippetClient;

/// Nearby snippet instance reached through JSON-RPC
pub struct RemoteNearbySnippet {
    client: Arc<SnippetClient>,
}

impl RemoteNearbySnippet {
    pub fn new(client: Arc<SnippetClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<SnippetClient> {
        &self.client
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        Ok(self.client.call(method, params).await?)
    }

    async fn call_bool(&self, method: &str) -> Result<bool, RpcError> {
        let value = self.call(method, vec![]).await?;
        value.as_bool().ok_or_else(|| RpcError::Protocol {
            reason: format!("{} returned non-boolean {}", method, value),
        })
    }

    async fn stream(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        let callback_id = self.client.call_async(method, params).await?;
        Ok(Box::new(SnippetCallbackStream::new(
            Arc::clone(&self.client),
            callback_id,
        )))
    }

    // Wi-Fi station helpers used by the device adapter

    pub async fn wifi_is_enabled(&self) -> Result<bool, RpcError> {
        self.call_bool("wifiIsEnabled").await
    }

    pub async fn wifi_enable(&self) -> Result<(), RpcError> {
        self.call("wifiEnable", vec![]).await.map(|_| ())
    }

    pub async fn wifi_disable(&self) -> Result<(), RpcError> {
        self.call("wifiDisable", vec![]).await.map(|_| ())
    }

    /// Blocks on the device until the STA is associated
    pub async fn wifi_connect_simple(&self, ssid: &str, password: Option<&str>) -> Result<(), RpcError> {
        self.call("wifiConnectSimple", vec![json!(ssid), json!(password)])
            .await
            .map(|_| ())
    }

    pub async fn wifi_clear_configured_networks(&self) -> Result<(), RpcError> {
        self.call("wifiClearConfiguredNetworks", vec![]).await.map(|_| ())
    }
}

#[async_trait]
impl NearbySnippet for RemoteNearbySnippet {
    async fn start_advertising(
        &self,
        endpoint_name: &str,
        service_id: &str,
        advertising_medium: Medium,
        upgrade_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.stream(
            "startAdvertising",
            vec![
                json!(endpoint_name),
                json!(service_id),
                json!(advertising_medium.value()),
                json!(upgrade_medium.value()),
            ],
        )
        .await
    }

    async fn start_discovery(
        &self,
        service_id: &str,
        discovery_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.stream(
            "startDiscovery",
            vec![json!(service_id), json!(discovery_medium.value())],
        )
        .await
    }

    async fn request_connection(
        &self,
        request: &ConnectionRequest,
    ) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.stream(
            "requestConnection",
            vec![
                json!(request.endpoint_name),
                json!(request.endpoint_id),
                json!(request.connection_medium.value()),
                json!(request.upgrade_medium.value()),
                json!(request.upgrade_type.value()),
                json!(request.keep_alive.timeout_ms),
                json!(request.keep_alive.interval_ms),
            ],
        )
        .await
    }

    async fn accept_connection(&self, endpoint_id: &str) -> Result<Box<dyn CallbackStream>, RpcError> {
        self.stream("acceptConnection", vec![json!(endpoint_id)]).await
    }

    async fn disconnect_from_endpoint(&self, endpoint_id: &str) -> Result<(), RpcError> {
        self.call("disconnectFromEndpoint", vec![json!(endpoint_id)])
            .await
            .map(|_| ())
    }

    async fn stop_advertising(&self) -> Result<(), RpcError> {
        self.call("stopAdvertising", vec![]).await.map(|_| ())
    }

    async fn stop_discovery(&self) -> Result<(), RpcError> {
        self.call("stopDiscovery", vec![]).await.map(|_| ())
    }

    async fn stop_all_endpoints(&self) -> Result<(), RpcError> {
        self.call("stopAllEndpoints", vec![]).await.map(|_| ())
    }

    async fn send_multiple_payload_with_type(
        &self,
        endpoint_id: &str,
        name: &str,
        size_kb: u64,
        payload_type: PayloadType,
        count: u32,
    ) -> Result<i64, RpcError> {
        let value = self
            .call(
                "sendMultiplePayloadWithType",
                vec![
                    json!(endpoint_id),
                    json!(name),
                    json!(size_kb),
                    json!(payload_type.value()),
                    json!(count),
                ],
            )
            .await?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| RpcError::Protocol {
                reason: format!("sendMultiplePayloadWithType returned {}", value),
            })
    }

    async fn transfer_files_cleanup(&self) -> Result<(), RpcError> {
        self.call("transferFilesCleanup", vec![]).await.map(|_| ())
    }

    async fn wifi_is_tdls_supported(&self) -> Result<bool, RpcError> {
        self.call_bool("wifiIsTdlsSupported").await
    }

    async fn wifi_get_connection_info(&self) -> Result<Value, RpcError> {
        self.call("wifiGetConnectionInfo", vec![]).await
    }

    async fn wifi_aware_is_available(&self) -> Result<bool, RpcError> {
        self.call_bool("wifiAwareIsAvailable").await
    }

    async fn wifi_is_p2p_supported(&self) -> Result<bool, RpcError> {
        self.call_bool("wifiIsP2pSupported").await
    }
}
