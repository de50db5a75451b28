//! Error types for the device adapters

use betocq_core::RpcError;

/// Adapter-level failures
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("Failed to spawn adb for {serial}: {source}")]
    AdbSpawn {
        serial: String,
        #[source]
        source: std::io::Error,
    },
    #[error("adb command `{command}` on {serial} exited with {code:?}: {stderr}")]
    AdbCommand {
        serial: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Snippet socket error: {0}")]
    Socket(#[from] std::io::Error),
    #[error("Snippet handshake failed: {reason}")]
    Handshake { reason: String },
    #[error("Malformed snippet message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Snippet method {method} raised: {message}")]
    Remote { method: String, message: String },
    #[error("Snippet connection closed")]
    Closed,
}

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, SnippetError>;

impl From<SnippetError> for RpcError {
    fn from(err: SnippetError) -> Self {
        match err {
            SnippetError::Remote { method, message } => RpcError::Remote { method, message },
            // A failing shell command is the device's answer, not a broken link
            SnippetError::AdbCommand { command, stderr, .. } => RpcError::Remote {
                method: command,
                message: stderr,
            },
            SnippetError::Json(e) => RpcError::Protocol {
                reason: e.to_string(),
            },
            SnippetError::Handshake { reason } => RpcError::Protocol { reason },
            other => RpcError::Transport {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_classification() {
        let remote: RpcError = SnippetError::Remote {
            method: "startDiscovery".to_string(),
            message: "already discovering".to_string(),
        }
        .into();
        assert!(!remote.is_infrastructure());

        let closed: RpcError = SnippetError::Closed.into();
        assert!(closed.is_infrastructure());

        let shell: RpcError = SnippetError::AdbCommand {
            serial: "A1".to_string(),
            command: "shell dumpsys wifip2p".to_string(),
            code: Some(1),
            stderr: String::new(),
        }
        .into();
        assert!(!shell.is_infrastructure());
    }
}
