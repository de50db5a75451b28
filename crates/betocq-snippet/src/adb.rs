//! Thin `adb` wrapper
//!
//! Every command runs through `tokio::process` against one device serial.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Result, SnippetError};

/// adb bound to one device
#[derive(Debug, Clone)]
pub struct Adb {
    serial: String,
    binary: String,
}

impl Adb {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            binary: "adb".to_string(),
        }
    }

    /// Use a specific adb binary instead of the one on `PATH`
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-s").arg(&self.serial).args(args);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run an adb subcommand and return its stdout
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("[{}] adb {}", self.serial, args.join(" "));
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SnippetError::AdbSpawn {
                serial: self.serial.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SnippetError::AdbCommand {
                serial: self.serial.clone(),
                command: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// `adb shell <command>`; the command is interpreted by the device shell
    pub async fn shell(&self, command: &str) -> Result<String> {
        self.run(&["shell", command]).await
    }

    pub async fn getprop(&self, name: &str) -> Result<String> {
        Ok(self.shell(&format!("getprop {}", name)).await?.trim().to_string())
    }

    /// Forward a free host port to `device_port`, returning the host port
    pub async fn forward(&self, device_port: u16) -> Result<u16> {
        let out = self
            .run(&["forward", "tcp:0", &format!("tcp:{}", device_port)])
            .await?;
        out.trim().parse().map_err(|_| SnippetError::Handshake {
            reason: format!("adb forward returned {:?}", out.trim()),
        })
    }

    pub async fn forward_remove(&self, host_port: u16) -> Result<()> {
        self.run(&["forward", "--remove", &format!("tcp:{}", host_port)])
            .await
            .map(|_| ())
    }

    /// Start a long-running `adb shell` command with piped stdout
    pub fn spawn_shell(&self, command: &str) -> Result<Child> {
        debug!("[{}] adb shell {} (background)", self.serial, command);
        self.command(&["shell", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SnippetError::AdbSpawn {
                serial: self.serial.clone(),
                source,
            })
    }
}
