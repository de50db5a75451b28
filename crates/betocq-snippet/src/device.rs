//! Real Android device behind adb and the Nearby snippets

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use betocq_core::constants::INVALID_RSSI;
use betocq_core::{
    ConnectionMedium, DeviceCapabilities, DeviceHandle, IperfRunner, NearbySnippet, RpcError,
    SnippetSlot, StaInfo,
};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::adb::Adb;
use crate::client::SnippetClient;
use crate::error::Result;
use crate::parse;
use crate::snippet::RemoteNearbySnippet;

pub const NEARBY_SNIPPET_PACKAGE: &str = "com.google.android.nearby.mobly.snippet";
pub const NEARBY_SNIPPET_2_PACKAGE: &str = "com.google.android.nearby.mobly.snippet.second";

const COUNTRY_CODE_SETTLE: Duration = Duration::from_secs(2);
const AIRPLANE_MODE_SETTLE: Duration = Duration::from_secs(2);

// ----------------------------------------------------------------------------
// Android Device
// ----------------------------------------------------------------------------

/// One phone under test
pub struct AndroidDevice {
    adb: Adb,
    capabilities: DeviceCapabilities,
    primary: Arc<RemoteNearbySnippet>,
    secondary: Option<Arc<RemoteNearbySnippet>>,
}

impl AndroidDevice {
    /// Load the primary snippet, and the secondary one when BT multiplexing
    /// needs an independent callback stream
    pub async fn connect(
        serial: &str,
        capabilities: DeviceCapabilities,
        load_secondary: bool,
    ) -> Result<Self> {
        let adb = Adb::new(serial);
        let primary = Arc::new(RemoteNearbySnippet::new(Arc::new(
            SnippetClient::launch(&adb, NEARBY_SNIPPET_PACKAGE).await?,
        )));
        let secondary = if load_secondary {
            Some(Arc::new(RemoteNearbySnippet::new(Arc::new(
                SnippetClient::launch(&adb, NEARBY_SNIPPET_2_PACKAGE).await?,
            ))))
        } else {
            None
        };
        Ok(Self {
            adb,
            capabilities,
            primary,
            secondary,
        })
    }

    pub fn adb(&self) -> &Adb {
        &self.adb
    }

    /// Stop every loaded snippet server
    pub async fn unload(&self) {
        self.primary.client().stop().await;
        if let Some(secondary) = &self.secondary {
            secondary.client().stop().await;
        }
    }

    async fn shell(&self, command: &str) -> std::result::Result<String, RpcError> {
        Ok(self.adb.shell(command).await?)
    }

    /// Shell output, or empty when the command fails (e.g. a `grep` miss)
    async fn shell_or_empty(&self, command: &str) -> String {
        self.adb.shell(command).await.unwrap_or_default()
    }
}

#[async_trait]
impl DeviceHandle for AndroidDevice {
    fn serial(&self) -> &str {
        self.adb.serial()
    }

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn snippet(&self, slot: SnippetSlot) -> Option<Arc<dyn NearbySnippet>> {
        match slot {
            SnippetSlot::Primary => Some(self.primary.clone() as Arc<dyn NearbySnippet>),
            SnippetSlot::Secondary => self
                .secondary
                .clone()
                .map(|snippet| snippet as Arc<dyn NearbySnippet>),
        }
    }

    async fn manufacturer(&self) -> std::result::Result<String, RpcError> {
        Ok(self.adb.getprop("ro.product.manufacturer").await?)
    }

    async fn model(&self) -> std::result::Result<String, RpcError> {
        Ok(self.adb.getprop("ro.product.model").await?)
    }

    async fn set_country_code(&self, country_code: &str) -> std::result::Result<(), RpcError> {
        info!("[{}] Setting country code {}", self.serial(), country_code);
        self.shell("cmd wifi set-wifi-enabled disabled").await?;
        sleep(COUNTRY_CODE_SETTLE).await;
        self.shell(&format!("cmd wifi force-country-code enabled {}", country_code))
            .await?;
        self.shell("cmd wifi set-wifi-enabled enabled").await?;
        sleep(COUNTRY_CODE_SETTLE).await;
        Ok(())
    }

    async fn connect_sta(&self, ssid: &str, password: &str) -> std::result::Result<Duration, RpcError> {
        let started = Instant::now();
        if !self.primary.wifi_is_enabled().await? {
            self.primary.wifi_enable().await?;
        }
        let password = (!password.is_empty()).then_some(password);
        self.primary.wifi_connect_simple(ssid, password).await?;
        Ok(started.elapsed())
    }

    async fn reset_wifi(&self) -> std::result::Result<(), RpcError> {
        // Clearing networks with the radio up can stall behind the wifi thread
        let was_enabled = self.primary.wifi_is_enabled().await?;
        if was_enabled {
            self.primary.wifi_disable().await?;
        }
        self.primary.wifi_clear_configured_networks().await?;
        if was_enabled {
            self.primary.wifi_enable().await?;
        }
        Ok(())
    }

    async fn toggle_airplane_mode(&self) -> std::result::Result<(), RpcError> {
        for (setting, svc) in [("1", "disable"), ("0", "enable")] {
            self.shell(&format!("settings put global airplane_mode_on {}", setting))
                .await?;
            self.shell(&format!(
                "am broadcast -a android.intent.action.AIRPLANE_MODE --ez state {}",
                setting == "1"
            ))
            .await?;
            self.shell(&format!("svc wifi {}", svc)).await?;
            self.shell(&format!("svc bluetooth {}", svc)).await?;
            sleep(AIRPLANE_MODE_SETTLE).await;
        }
        Ok(())
    }

    async fn sta_info(&self) -> std::result::Result<StaInfo, RpcError> {
        let status = self.shell_or_empty("cmd wifi status | grep WifiInfo").await;
        Ok(StaInfo {
            frequency: parse::sta_frequency(&status),
            max_link_speed_mbps: parse::sta_max_link_speed(&status),
        })
    }

    async fn p2p_frequency(&self) -> std::result::Result<i64, RpcError> {
        let dump = self.shell_or_empty("dumpsys wifip2p").await;
        Ok(parse::p2p_frequency(&dump))
    }

    async fn scan_rssi(&self, ssid: &str) -> std::result::Result<i32, RpcError> {
        match self
            .adb
            .shell(&format!("cmd wifi list-scan-results | grep {}", ssid))
            .await
        {
            Ok(line) => Ok(parse::scan_rssi(&line)),
            Err(e) => {
                warn!("[{}] Scan results unavailable: {}", self.serial(), e);
                Ok(INVALID_RSSI)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// iperf
// ----------------------------------------------------------------------------

const IPERF_CLIENT_ARGS: &str = "-t 10 -P1";
const IPERF_SERVER_ARGS: &str = "-J";
const IPERF_SERVER_START_DELAY: Duration = Duration::from_secs(1);
const IPV4_ADDR_LEN_MAX: usize = 15;

/// iperf3 between two adb devices over the upgraded medium's interface
#[derive(Debug, Default, Clone, Copy)]
pub struct AdbIperfRunner;

impl AdbIperfRunner {
    async fn shell(adb: &Adb, command: &str) -> String {
        adb.shell(command).await.unwrap_or_default()
    }

    /// Address of the server side on the interface the medium uses
    async fn owner_addr(server: &Adb, client: &Adb, medium: ConnectionMedium) -> Option<String> {
        let scoped = |addr: String, ifname: Option<String>| match ifname {
            Some(ifname) if addr.len() > IPV4_ADDR_LEN_MAX => format!("{}%{}", addr, ifname),
            _ => addr,
        };
        let client_wlan = || async {
            parse::wlan_ifname(&Self::shell(client, "ifconfig | grep -A6 wlan").await).map(str::to_string)
        };

        match medium {
            ConnectionMedium::WifiDirect => parse::group_owner_addr(
                &Self::shell(client, "dumpsys wifip2p | egrep \"groupOwnerAddress|groupOwnerIpAddress\"").await,
            ),
            ConnectionMedium::WifiLan => {
                let addr = parse::ifconfig_addr(&Self::shell(server, "ifconfig | grep -A6 wlan").await)?;
                Some(scoped(addr, client_wlan().await))
            }
            ConnectionMedium::WifiHotspot => {
                let p2p = parse::ifconfig_addr(&Self::shell(server, "ifconfig | grep -A5 p2p").await);
                let addr = match p2p {
                    Some(addr) => addr,
                    None => parse::ifconfig_addr(&Self::shell(server, "ifconfig | grep -A6 wlan").await)?,
                };
                Some(scoped(addr, client_wlan().await))
            }
            ConnectionMedium::WifiAware => {
                let addr = parse::ifconfig_addr(&Self::shell(server, "ifconfig | grep -A7 aware").await)?;
                let ifname = parse::ifconfig_name(&Self::shell(client, "ifconfig | grep aware").await);
                Some(scoped(addr, ifname))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl IperfRunner for AdbIperfRunner {
    async fn measure_kbps(
        &self,
        server: &dyn DeviceHandle,
        client: &dyn DeviceHandle,
        medium: ConnectionMedium,
    ) -> std::result::Result<f64, RpcError> {
        let server_adb = Adb::new(server.serial());
        let client_adb = Adb::new(client.serial());
        let addr = Self::owner_addr(&server_adb, &client_adb, medium)
            .await
            .ok_or_else(|| RpcError::Remote {
                method: "iperf".to_string(),
                message: format!("no {} address on {}", medium, server.serial()),
            })?;

        let ipv6 = if addr.len() > IPV4_ADDR_LEN_MAX { " -6" } else { "" };
        let mut iperf_server = server_adb
            .spawn_shell(&format!("iperf3 -s {}{}", IPERF_SERVER_ARGS, ipv6))
            .map_err(RpcError::from)?;
        sleep(IPERF_SERVER_START_DELAY).await;

        info!("[{}] Start iperf client to {}", client.serial(), addr);
        let output = client_adb
            .shell(&format!("iperf3 -c {} {}{}", addr, IPERF_CLIENT_ARGS, ipv6))
            .await;
        if let Err(e) = iperf_server.kill().await {
            warn!("[{}] Failed to stop iperf server: {}", server.serial(), e);
        }

        parse::iperf_kbps(&output?).ok_or_else(|| RpcError::Remote {
            method: "iperf".to_string(),
            message: "no valid iperf result".to_string(),
        })
    }
}
