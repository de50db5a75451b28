//! In-memory callback streams and the shared call log

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use betocq_core::{CallbackEvent, CallbackStream, RpcError};
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Call Log
// ----------------------------------------------------------------------------

/// Ordered record of snippet calls and event waits, shared by a mock pair
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Whether any entry starts with `prefix`
    pub fn contains(&self, prefix: &str) -> bool {
        lock(&self.entries).iter().any(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.entries).iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

// ----------------------------------------------------------------------------
// Mock Streams
// ----------------------------------------------------------------------------

/// Event queue behind one callback id
#[derive(Debug)]
pub struct MockCallbackStream {
    callback_id: String,
    queue: Mutex<VecDeque<CallbackEvent>>,
    notify: Notify,
    log: CallLog,
}

impl MockCallbackStream {
    pub fn new(callback_id: impl Into<String>, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            callback_id: callback_id.into(),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            log,
        })
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    /// Queue an event and wake any waiter
    pub fn push(&self, name: &str, data: Value) {
        lock(&self.queue).push_back(CallbackEvent::new(self.callback_id.clone(), name, data));
        self.notify.notify_waiters();
    }

    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    fn take(&self, name: &str) -> Option<CallbackEvent> {
        let mut queue = lock(&self.queue);
        let idx = queue.iter().position(|e| e.name == name)?;
        queue.remove(idx)
    }
}

/// Boxed view handed to the engine; the mock keeps its own `Arc`
pub struct StreamHandle(pub Arc<MockCallbackStream>);

#[async_trait]
impl CallbackStream for StreamHandle {
    fn callback_id(&self) -> &str {
        self.0.callback_id()
    }

    async fn wait_and_get(
        &self,
        event_name: &str,
        timeout: Duration,
    ) -> Result<CallbackEvent, RpcError> {
        let stream = &self.0;
        stream.log.record(format!("wait:{}:{}", stream.callback_id, event_name));
        let deadline = Instant::now() + timeout;
        loop {
            let notified = stream.notify.notified();
            if let Some(event) = stream.take(event_name) {
                return Ok(event);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(RpcError::timeout(event_name, timeout));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_wait_pops_matching_event_only() {
        let log = CallLog::new();
        let stream = MockCallbackStream::new("cb-1", log.clone());
        stream.push("onConnectionInitiated", json!({"endpointId": "A"}));
        stream.push("onConnectionResult", json!({"endpointId": "A", "isSuccess": true}));

        let handle = StreamHandle(stream.clone());
        let event = handle
            .wait_and_get("onConnectionResult", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(event.bool_field(&["isSuccess"]).unwrap());
        assert_eq!(stream.pending(), 1);
        assert!(log.contains("wait:cb-1:onConnectionResult"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_and_wakes_on_push() {
        let stream = MockCallbackStream::new("cb-2", CallLog::new());
        let handle = StreamHandle(stream.clone());
        let err = handle
            .wait_and_get("onEndpointFound", Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let pusher = stream.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            pusher.push("onEndpointFound", json!({"endpointId": "B"}));
        });
        let event = handle
            .wait_and_get("onEndpointFound", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(event.str_field(&["endpointId"]).unwrap(), "B");
    }
}
