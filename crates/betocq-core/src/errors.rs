//! Error types for the test suite core
//!
//! `RpcError` is what device adapters report, `ConnectionError` is what the
//! protocol engine reports (always tagged with the failing phase), and
//! `BetocqError` unifies configuration, scenario and run-level failures.

use std::time::Duration;

use crate::failure::FailureReason;

// ----------------------------------------------------------------------------
// RPC Errors
// ----------------------------------------------------------------------------

/// Errors surfaced by a device RPC handle or one of its callback streams
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("Timed out after {timeout_ms}ms waiting for event {event}")]
    Timeout { event: String, timeout_ms: u64 },
    #[error("Snippet method {method} raised: {message}")]
    Remote { method: String, message: String },
    #[error("Event {event} is missing field {field}")]
    MissingField { event: String, field: String },
    #[error("Snippet transport broken: {reason}")]
    Transport { reason: String },
    #[error("Snippet protocol error: {reason}")]
    Protocol { reason: String },
    #[error("Snippet slot {slot} is not loaded on device {serial}")]
    SnippetNotLoaded { serial: String, slot: String },
}

impl RpcError {
    /// Build a timeout error for a named event wait
    pub fn timeout(event: impl Into<String>, timeout: Duration) -> Self {
        RpcError::Timeout {
            event: event.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Transport and protocol faults cannot be attributed to the device under
    /// test and end the whole run.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            RpcError::Transport { .. } | RpcError::Protocol { .. } | RpcError::SnippetNotLoaded { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }
}

// ----------------------------------------------------------------------------
// Connection Errors
// ----------------------------------------------------------------------------

/// Failure of one connection attempt, attributed to the phase in progress
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// Assertion failure, timeout or remote exception; ends the iteration
    #[error("{reason}: {detail}")]
    Phase { reason: FailureReason, detail: String },
    /// RPC transport fault; ends the run
    #[error("{reason}: infrastructure failure: {source}")]
    Infrastructure {
        reason: FailureReason,
        #[source]
        source: RpcError,
    },
}

impl ConnectionError {
    pub fn phase(reason: FailureReason, detail: impl Into<String>) -> Self {
        ConnectionError::Phase {
            reason,
            detail: detail.into(),
        }
    }

    /// Classify an RPC error raised while `reason` was the active phase
    pub fn from_rpc(reason: FailureReason, err: RpcError) -> Self {
        if err.is_infrastructure() {
            ConnectionError::Infrastructure { reason, source: err }
        } else {
            ConnectionError::Phase {
                reason,
                detail: err.to_string(),
            }
        }
    }

    /// Phase the failure is attributed to
    pub fn reason(&self) -> FailureReason {
        match self {
            ConnectionError::Phase { reason, .. } => *reason,
            ConnectionError::Infrastructure { reason, .. } => *reason,
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ConnectionError::Infrastructure { .. })
    }
}

// ----------------------------------------------------------------------------
// Unified Error
// ----------------------------------------------------------------------------

/// Core error type for configuration, scenario and run failures
#[derive(Debug, thiserror::Error)]
pub enum BetocqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Scenario {scenario} aborted: {reason}")]
    ScenarioAborted { scenario: String, reason: String },

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, BetocqError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_classification() {
        assert!(RpcError::Transport {
            reason: "broken pipe".to_string()
        }
        .is_infrastructure());
        assert!(!RpcError::timeout("onEndpointFound", Duration::from_secs(30)).is_infrastructure());
        assert!(!RpcError::Remote {
            method: "startAdvertising".to_string(),
            message: "STATUS_ALREADY_ADVERTISING".to_string()
        }
        .is_infrastructure());
    }

    #[test]
    fn test_connection_error_keeps_phase() {
        let err = ConnectionError::from_rpc(
            FailureReason::SourceStartDiscovery,
            RpcError::timeout("onEndpointFound", Duration::from_secs(30)),
        );
        assert_eq!(err.reason(), FailureReason::SourceStartDiscovery);
        assert!(!err.is_infrastructure());
        assert!(err.to_string().contains("30000ms"));

        let err = ConnectionError::from_rpc(
            FailureReason::TargetAcceptConnection,
            RpcError::Protocol {
                reason: "unexpected id".to_string(),
            },
        );
        assert!(err.is_infrastructure());
        assert_eq!(err.reason(), FailureReason::TargetAcceptConnection);
    }
}
