//! Payload transfer over an established connection
//!
//! The discoverer sends, the advertiser receives. Throughput is derived only
//! from the transfer time the sender reports for the last payload.

use std::time::Duration;

use tracing::{info, warn};

use crate::engine::{random_ascii, ConnectionPhase, NearbyConnection};
use crate::errors::ConnectionError;
use crate::failure::FailureReason;
use crate::medium::PayloadType;
use crate::rpc::{CallbackEvent, ON_PAYLOAD_RECEIVED, ON_PAYLOAD_TRANSFER_UPDATE};

/// What to send in one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub file_size_kb: u64,
    pub num_files: u32,
    pub payload_type: PayloadType,
    /// Bound on each individual payload event wait
    pub timeout: Duration,
}

impl NearbyConnection {
    /// Send payloads and return the transfer speed in KB/s.
    ///
    /// Temporary files are removed on both devices whether or not the transfer
    /// succeeds.
    pub async fn transfer_file(&mut self, request: TransferRequest) -> Result<f64, ConnectionError> {
        self.failure_reason = FailureReason::FileTransferFail;
        info!(
            "[{}] sending {} payloads with type: {}",
            self.discoverer.serial, request.num_files, request.payload_type
        );

        let result = self.run_transfer(&request).await;

        for peer in [&self.discoverer, &self.advertiser] {
            if let Err(e) = peer.snippet.transfer_files_cleanup().await {
                warn!("[{}] transfer files cleanup failed: {}", peer.serial, e);
            }
        }

        match result {
            Ok(speed_kbps) => {
                info!("[{}] {} payloads received", self.advertiser.serial, request.num_files);
                self.failure_reason = FailureReason::Success;
                Ok(speed_kbps)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn run_transfer(&self, request: &TransferRequest) -> Result<f64, ConnectionError> {
        let (Some(advertiser_id), Some(discoverer_id)) =
            (self.advertiser_endpoint_id.as_deref(), self.discoverer_endpoint_id.as_deref())
        else {
            return Err(ConnectionError::phase(
                self.failure_reason,
                "No nearby connection is set up, endpoint ids are unknown.",
            ));
        };
        let Some(rx_stream) = self.advertiser_payload.as_ref() else {
            return Err(ConnectionError::phase(
                self.failure_reason,
                "No nearby connection is set up, advertiser payload cb is none.",
            ));
        };
        let Some(tx_stream) = self.discoverer_payload.as_ref() else {
            return Err(ConnectionError::phase(
                self.failure_reason,
                "No nearby connection is set up, discoverer payload cb is none.",
            ));
        };

        let file_name = random_ascii(8);
        let last_payload_id = self
            .discoverer
            .snippet
            .send_multiple_payload_with_type(
                advertiser_id,
                &file_name,
                request.file_size_kb,
                request.payload_type,
                request.num_files,
            )
            .await
            .map_err(|e| self.rpc_error(e))?;

        let from_discoverer = |event: &CallbackEvent| {
            event
                .str_field(&["endpointId"])
                .map(|id| id == discoverer_id)
                .unwrap_or(false)
        };
        let update_succeeded = |event: &CallbackEvent| {
            event.bool_field(&["update", "isSuccess"]).unwrap_or(false)
        };

        let mut transfer_time = Duration::ZERO;
        for _ in 0..request.num_files {
            let rx_received = rx_stream
                .wait_for_event(ON_PAYLOAD_RECEIVED, &from_discoverer, request.timeout)
                .await
                .map_err(|e| self.rpc_error(e))?;
            let rx_update = rx_stream
                .wait_for_event(ON_PAYLOAD_TRANSFER_UPDATE, &update_succeeded, request.timeout)
                .await
                .map_err(|e| self.rpc_error(e))?;
            let tx_update = tx_stream
                .wait_for_event(ON_PAYLOAD_TRANSFER_UPDATE, &update_succeeded, request.timeout)
                .await
                .map_err(|e| self.rpc_error(e))?;

            let tx_id = tx_update
                .i64_field(&["update", "payloadId"])
                .map_err(|e| self.rpc_error(e))?;
            if request.payload_type == PayloadType::File {
                let rx_received_id = rx_received
                    .i64_field(&["payload", "id"])
                    .map_err(|e| self.rpc_error(e))?;
                let rx_update_id = rx_update
                    .i64_field(&["update", "payloadId"])
                    .map_err(|e| self.rpc_error(e))?;
                self.ensure(tx_id == rx_received_id && tx_id == rx_update_id, || {
                    format!(
                        "payload id mismatch: sent {}, received {}, updated {}",
                        tx_id, rx_received_id, rx_update_id
                    )
                })?;
            }
            if tx_id == last_payload_id {
                transfer_time = tx_update
                    .duration_ns_field(&["transferTimeNs"])
                    .map_err(|e| self.rpc_error(e))?;
            }
        }

        self.ensure(!transfer_time.is_zero(), || "Transfer time is 0".to_string())?;
        Ok(throughput_kbps(request.file_size_kb, request.num_files, transfer_time))
    }

    /// Mark the machine failed after a post-setup check rejected the attempt
    pub fn record_failure(&mut self, reason: FailureReason, detail: impl Into<String>) {
        let _ = self.fail(ConnectionError::phase(reason, detail));
    }

    /// Record the latest reason without touching the machine
    pub fn set_failure_reason(&mut self, reason: FailureReason) {
        self.failure_reason = reason;
    }

    /// Whether the machine reached `Connected` and nothing failed since
    pub fn is_connected(&self) -> bool {
        matches!(self.phase(), ConnectionPhase::Connected)
    }
}

/// `size_kb * num_files / seconds`, rounded to a whole KB/s
pub fn throughput_kbps(file_size_kb: u64, num_files: u32, transfer_time: Duration) -> f64 {
    let secs = transfer_time.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (file_size_kb as f64 * num_files as f64 / secs).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PhaseEvent;

    #[test]
    fn test_throughput_from_last_payload() {
        assert_eq!(throughput_kbps(1024, 1, Duration::from_millis(500)), 2048.0);
        assert_eq!(throughput_kbps(20, 3, Duration::from_secs(7)), 9.0);
        assert_eq!(throughput_kbps(1, 1, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_transfer_failure_fails_connected_machine() {
        let phase = ConnectionPhase::Connected;
        let next = phase
            .transition(
                PhaseEvent::Fail {
                    reason: FailureReason::FileTransferFail,
                },
                "svc",
            )
            .unwrap()
            .new_phase;
        assert_eq!(
            next,
            ConnectionPhase::Failed {
                reason: FailureReason::FileTransferFail
            }
        );
    }
}
