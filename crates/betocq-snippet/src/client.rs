//! Mobly snippet JSON-RPC client
//!
//! The snippet server speaks newline-delimited JSON over a TCP socket that adb
//! forwards to the host. After an `initiate` handshake every request is
//! `{id, method, params}` and every response is `{id, result, callback, error}`.
//! Requests on one socket are strictly sequential.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adb::Adb;
use crate::error::{Result, SnippetError};
use crate::parse;

const SNIPPET_RUNNER: &str = "com.google.android.mobly.snippet.SnippetRunner";
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Response read timeout for ordinary calls
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    status: bool,
    #[serde(default)]
    uid: i64,
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(SnippetError::Closed);
        }
        Ok(line)
    }
}

// ----------------------------------------------------------------------------
// Snippet Client
// ----------------------------------------------------------------------------

/// One loaded snippet server on one device
pub struct SnippetClient {
    package: String,
    adb: Option<Adb>,
    host_port: u16,
    conn: Mutex<Connection>,
    next_id: AtomicU64,
    server: Mutex<Option<Child>>,
}

impl SnippetClient {
    /// Connect to an already-forwarded snippet port and run the handshake
    pub async fn connect(package: impl Into<String>, host_port: u16) -> Result<Self> {
        let package = package.into();
        let stream = TcpStream::connect(("127.0.0.1", host_port)).await?;
        let (read, write) = stream.into_split();
        let mut conn = Connection {
            reader: BufReader::new(read),
            writer: write,
        };

        conn.send_line(&json!({"cmd": "initiate", "uid": -1}).to_string())
            .await?;
        let line = tokio::time::timeout(DEFAULT_RPC_TIMEOUT, conn.read_line())
            .await
            .map_err(|_| SnippetError::Handshake {
                reason: "no reply to initiate".to_string(),
            })??;
        let reply: HandshakeResponse = serde_json::from_str(&line)?;
        if !reply.status {
            return Err(SnippetError::Handshake {
                reason: format!("server refused session for {}", package),
            });
        }
        debug!("Snippet {} session uid {}", package, reply.uid);

        Ok(Self {
            package,
            adb: None,
            host_port,
            conn: Mutex::new(conn),
            next_id: AtomicU64::new(0),
            server: Mutex::new(None),
        })
    }

    /// Start the snippet server on the device, forward its port and connect
    pub async fn launch(adb: &Adb, package: &str) -> Result<Self> {
        info!("[{}] Loading snippet {}", adb.serial(), package);
        let mut child = adb.spawn_shell(&format!(
            "am instrument -w -e action start {}/{}",
            package, SNIPPET_RUNNER
        ))?;
        let stdout = child.stdout.take().ok_or(SnippetError::Closed)?;
        let mut lines = BufReader::new(stdout).lines();

        let device_port = tokio::time::timeout(LAUNCH_TIMEOUT, async {
            while let Some(line) = lines.next_line().await? {
                debug!("[{}] {}", adb.serial(), line.trim());
                if let Some(port) = parse::snippet_serving_port(&line) {
                    return Ok(port);
                }
            }
            Err(SnippetError::Handshake {
                reason: format!("{} exited before serving", package),
            })
        })
        .await
        .map_err(|_| SnippetError::Handshake {
            reason: format!("{} did not start within {:?}", package, LAUNCH_TIMEOUT),
        })??;

        let host_port = adb.forward(device_port).await?;
        let mut client = Self::connect(package, host_port).await?;
        client.adb = Some(adb.clone());
        client.server = Mutex::new(Some(child));
        Ok(client)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Synchronous RPC
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.call_with_timeout(method, params, DEFAULT_RPC_TIMEOUT)
            .await
            .map(|(result, _)| result)
    }

    /// Asynchronous RPC; returns the callback id events are posted under
    pub async fn call_async(&self, method: &str, params: Vec<Value>) -> Result<String> {
        let (_, callback) = self
            .call_with_timeout(method, params, DEFAULT_RPC_TIMEOUT)
            .await?;
        callback.ok_or_else(|| SnippetError::Remote {
            method: method.to_string(),
            message: "no callback id in response".to_string(),
        })
    }

    /// Send one request and wait at most `timeout` for its response
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<(Value, Option<String>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::to_string(&Request { id, method, params })?;
        debug!("[{}] -> {}", self.package, request);

        let mut conn = self.conn.lock().await;
        conn.send_line(&request).await?;
        let line = tokio::time::timeout(timeout, conn.read_line())
            .await
            .map_err(|_| SnippetError::Socket(std::io::ErrorKind::TimedOut.into()))??;
        drop(conn);
        debug!("[{}] <- {}", self.package, line.trim());

        let response: Response = serde_json::from_str(&line)?;
        if response.id != id {
            return Err(SnippetError::Handshake {
                reason: format!("response id {} does not match request id {}", response.id, id),
            });
        }
        if let Some(message) = response.error {
            return Err(SnippetError::Remote {
                method: method.to_string(),
                message,
            });
        }
        Ok((response.result, response.callback))
    }

    /// Stop the server and drop the port forward
    pub async fn stop(&self) {
        if let Some(mut child) = self.server.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop snippet {}: {}", self.package, e);
            }
        }
        if let Some(adb) = &self.adb {
            if let Err(e) = adb.forward_remove(self.host_port).await {
                warn!("Failed to remove forward for {}: {}", self.package, e);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
