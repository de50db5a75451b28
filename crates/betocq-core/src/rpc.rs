//! Device RPC collaborator interface
//!
//! The protocol engine talks to each device's Nearby snippet through these
//! traits. Every asynchronous notification arrives on a `CallbackStream`
//! returned by the call that registered it, and every wait on a stream takes
//! an explicit timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::KeepAlive;
use crate::errors::RpcError;
use crate::medium::{Medium, MediumUpgradeType, PayloadType};

// ----------------------------------------------------------------------------
// Event Names
// ----------------------------------------------------------------------------

pub const ON_ENDPOINT_FOUND: &str = "onEndpointFound";
pub const ON_CONNECTION_INITIATED: &str = "onConnectionInitiated";
pub const ON_CONNECTION_RESULT: &str = "onConnectionResult";
pub const ON_DISCONNECTED: &str = "onDisconnected";
pub const ON_BANDWIDTH_CHANGED: &str = "onBandwidthChanged";
pub const ON_PAYLOAD_RECEIVED: &str = "onPayloadReceived";
pub const ON_PAYLOAD_TRANSFER_UPDATE: &str = "onPayloadTransferUpdate";

// ----------------------------------------------------------------------------
// Callback Events
// ----------------------------------------------------------------------------

/// One event delivered by a snippet callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub callback_id: String,
    pub name: String,
    /// Creation time on the device, ms since epoch
    pub creation_time: i64,
    pub data: Value,
}

impl CallbackEvent {
    pub fn new(callback_id: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        Self {
            callback_id: callback_id.into(),
            name: name.into(),
            creation_time: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }

    /// Walk a nested key path in the event data
    pub fn field(&self, path: &[&str]) -> Result<&Value, RpcError> {
        let mut cursor = &self.data;
        for key in path {
            cursor = cursor.get(*key).ok_or_else(|| self.missing(path))?;
        }
        Ok(cursor)
    }

    pub fn str_field(&self, path: &[&str]) -> Result<&str, RpcError> {
        self.field(path)?.as_str().ok_or_else(|| self.missing(path))
    }

    pub fn bool_field(&self, path: &[&str]) -> Result<bool, RpcError> {
        self.field(path)?.as_bool().ok_or_else(|| self.missing(path))
    }

    /// Integer field; snippets sometimes encode longs as strings
    pub fn i64_field(&self, path: &[&str]) -> Result<i64, RpcError> {
        let value = self.field(path)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| self.missing(path))
    }

    /// Nanosecond timing field as a `Duration`
    pub fn duration_ns_field(&self, path: &[&str]) -> Result<Duration, RpcError> {
        let ns = self.i64_field(path)?;
        Ok(Duration::from_nanos(ns.max(0) as u64))
    }

    fn missing(&self, path: &[&str]) -> RpcError {
        RpcError::MissingField {
            event: self.name.clone(),
            field: path.join("."),
        }
    }
}

// ----------------------------------------------------------------------------
// Callback Streams
// ----------------------------------------------------------------------------

/// Event predicate used by `wait_for_event`
pub type EventPredicate<'a> = &'a (dyn Fn(&CallbackEvent) -> bool + Send + Sync);

/// Stream of events registered by one asynchronous snippet call
#[async_trait]
pub trait CallbackStream: Send + Sync {
    fn callback_id(&self) -> &str;

    /// Pop the next event named `event_name`, waiting at most `timeout`
    async fn wait_and_get(
        &self,
        event_name: &str,
        timeout: Duration,
    ) -> Result<CallbackEvent, RpcError>;

    /// Wait for the first event named `event_name` that satisfies `predicate`.
    ///
    /// Non-matching events are consumed. The timeout bounds the whole wait.
    async fn wait_for_event(
        &self,
        event_name: &str,
        predicate: EventPredicate<'_>,
        timeout: Duration,
    ) -> Result<CallbackEvent, RpcError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(RpcError::timeout(event_name, timeout));
            }
            let event = match self.wait_and_get(event_name, remaining).await {
                Ok(event) => event,
                Err(RpcError::Timeout { .. }) => {
                    return Err(RpcError::timeout(event_name, timeout))
                }
                Err(e) => return Err(e),
            };
            if predicate(&event) {
                return Ok(event);
            }
            tracing::debug!("Skipping {} event not matching predicate: {}", event_name, event.data);
        }
    }
}

// ----------------------------------------------------------------------------
// Nearby Snippet
// ----------------------------------------------------------------------------

/// Arguments of `requestConnection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Name the requester advertises itself as (its serial)
    pub endpoint_name: String,
    pub endpoint_id: String,
    pub connection_medium: Medium,
    pub upgrade_medium: Medium,
    pub upgrade_type: MediumUpgradeType,
    pub keep_alive: KeepAlive,
}

/// One Nearby snippet instance loaded on a device
#[async_trait]
pub trait NearbySnippet: Send + Sync {
    async fn start_advertising(
        &self,
        endpoint_name: &str,
        service_id: &str,
        advertising_medium: Medium,
        upgrade_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError>;

    async fn start_discovery(
        &self,
        service_id: &str,
        discovery_medium: Medium,
    ) -> Result<Box<dyn CallbackStream>, RpcError>;

    async fn request_connection(
        &self,
        request: &ConnectionRequest,
    ) -> Result<Box<dyn CallbackStream>, RpcError>;

    /// Accept a pending connection; the returned stream carries payload events
    async fn accept_connection(&self, endpoint_id: &str) -> Result<Box<dyn CallbackStream>, RpcError>;

    async fn disconnect_from_endpoint(&self, endpoint_id: &str) -> Result<(), RpcError>;

    async fn stop_advertising(&self) -> Result<(), RpcError>;

    async fn stop_discovery(&self) -> Result<(), RpcError>;

    async fn stop_all_endpoints(&self) -> Result<(), RpcError>;

    /// Send `count` payloads and return the id of the last one
    async fn send_multiple_payload_with_type(
        &self,
        endpoint_id: &str,
        name: &str,
        size_kb: u64,
        payload_type: PayloadType,
        count: u32,
    ) -> Result<i64, RpcError>;

    async fn transfer_files_cleanup(&self) -> Result<(), RpcError>;

    async fn wifi_is_tdls_supported(&self) -> Result<bool, RpcError>;

    /// Raw `WifiInfo` dictionary (`mFrequency`, `mMaxSupportedTxLinkSpeed`, ...)
    async fn wifi_get_connection_info(&self) -> Result<Value, RpcError>;

    async fn wifi_aware_is_available(&self) -> Result<bool, RpcError>;

    async fn wifi_is_p2p_supported(&self) -> Result<bool, RpcError>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
