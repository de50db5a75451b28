//! Callback streams backed by `eventWaitAndGet`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use betocq_core::{CallbackEvent, CallbackStream, RpcError};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::SnippetClient;
use crate::error::SnippetError;

/// Marker the snippet puts in the error of a timed-out event wait
const EVENT_TIMEOUT_MARKER: &str = "EventSnippetException: timeout.";

/// Extra socket read time on top of the on-device wait
const READ_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    callback_id: String,
    name: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    data: Value,
}

impl From<RawEvent> for CallbackEvent {
    fn from(raw: RawEvent) -> Self {
        CallbackEvent {
            callback_id: raw.callback_id,
            name: raw.name,
            creation_time: raw.time,
            data: raw.data,
        }
    }
}

/// Events registered under one callback id of one snippet
pub struct SnippetCallbackStream {
    client: Arc<SnippetClient>,
    callback_id: String,
}

impl SnippetCallbackStream {
    pub fn new(client: Arc<SnippetClient>, callback_id: String) -> Self {
        Self { client, callback_id }
    }
}

#[async_trait]
impl CallbackStream for SnippetCallbackStream {
    fn callback_id(&self) -> &str {
        &self.callback_id
    }

    async fn wait_and_get(
        &self,
        event_name: &str,
        timeout: Duration,
    ) -> Result<CallbackEvent, RpcError> {
        let params = vec![
            json!(self.callback_id),
            json!(event_name),
            json!(timeout.as_millis() as u64),
        ];
        let result = self
            .client
            .call_with_timeout("eventWaitAndGet", params, timeout + READ_MARGIN)
            .await;
        match result {
            Ok((value, _)) => {
                let raw: RawEvent = serde_json::from_value(value).map_err(|e| RpcError::Protocol {
                    reason: format!("bad {} event: {}", event_name, e),
                })?;
                Ok(raw.into())
            }
            Err(SnippetError::Remote { message, .. }) if message.contains(EVENT_TIMEOUT_MARKER) => {
                Err(RpcError::timeout(event_name, timeout))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_conversion() {
        let raw: RawEvent = serde_json::from_value(json!({
            "callbackId": "3-1",
            "name": "onEndpointFound",
            "time": 1_700_000_000_000i64,
            "data": {"endpointId": "ABCD", "discoveredEndpointInfo": {"endpointName": "serial-a"}}
        }))
        .unwrap();
        let event: CallbackEvent = raw.into();
        assert_eq!(event.callback_id, "3-1");
        assert_eq!(event.str_field(&["endpointId"]).unwrap(), "ABCD");
        assert_eq!(event.creation_time, 1_700_000_000_000);
    }
}
