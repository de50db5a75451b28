//! Static per-device Wi-Fi capability facts

use serde::{Deserialize, Serialize};

use crate::errors::{BetocqError, Result};

/// Capabilities of one physical device, loaded once from configuration.
///
/// Unknown keys are rejected so a typo cannot silently leave a capability at
/// its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceCapabilities {
    pub wifi_chipset: String,
    pub supports_5g: bool,
    pub supports_dbs_sta_wfd: bool,
    pub enable_sta_dfs_channel_for_peer_network: bool,
    pub enable_sta_indoor_channel_for_peer_network: bool,
    pub max_num_streams: u32,
    pub max_num_streams_dbs: u32,
    pub max_phy_rate_5g_mbps: u32,
    pub max_phy_rate_2g_mbps: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            wifi_chipset: String::new(),
            supports_5g: true,
            supports_dbs_sta_wfd: false,
            enable_sta_dfs_channel_for_peer_network: false,
            enable_sta_indoor_channel_for_peer_network: false,
            max_num_streams: 2,
            max_num_streams_dbs: 1,
            max_phy_rate_5g_mbps: 866,
            max_phy_rate_2g_mbps: 144,
        }
    }
}

/// Boolean capability a scenario can require on one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Supports5g,
    SupportsDbsStaWfd,
    EnableStaDfsChannelForPeerNetwork,
    EnableStaIndoorChannelForPeerNetwork,
}

impl Capability {
    pub fn key(self) -> &'static str {
        match self {
            Capability::Supports5g => "supports_5g",
            Capability::SupportsDbsStaWfd => "supports_dbs_sta_wfd",
            Capability::EnableStaDfsChannelForPeerNetwork => "enable_sta_dfs_channel_for_peer_network",
            Capability::EnableStaIndoorChannelForPeerNetwork => {
                "enable_sta_indoor_channel_for_peer_network"
            }
        }
    }
}

impl DeviceCapabilities {
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Supports5g => self.supports_5g,
            Capability::SupportsDbsStaWfd => self.supports_dbs_sta_wfd,
            Capability::EnableStaDfsChannelForPeerNetwork => self.enable_sta_dfs_channel_for_peer_network,
            Capability::EnableStaIndoorChannelForPeerNetwork => {
                self.enable_sta_indoor_channel_for_peer_network
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_num_streams == 0 {
            return Err(BetocqError::Config("max_num_streams must be at least 1".to_string()));
        }
        if self.max_num_streams_dbs > self.max_num_streams {
            return Err(BetocqError::Config(format!(
                "max_num_streams_dbs ({}) exceeds max_num_streams ({})",
                self.max_num_streams_dbs, self.max_num_streams
            )));
        }
        Ok(())
    }
}

/// Device role in a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Target device; group owner on upgraded mediums
    Advertiser,
    /// Source device; the STA/client
    Discoverer,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Advertiser => "advertiser",
            Role::Discoverer => "discoverer",
        }
    }
}

/// A capability value a scenario requires on one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequirement {
    pub role: Role,
    pub capability: Capability,
    pub expected: bool,
}

impl CapabilityRequirement {
    pub const fn new(role: Role, capability: Capability, expected: bool) -> Self {
        Self {
            role,
            capability,
            expected,
        }
    }
}

/// Check every requirement; the first mismatch becomes the skip detail
pub fn check_requirements(
    requirements: &[CapabilityRequirement],
    advertiser: &DeviceCapabilities,
    discoverer: &DeviceCapabilities,
) -> Option<String> {
    requirements.iter().find_map(|req| {
        let caps = match req.role {
            Role::Advertiser => advertiser,
            Role::Discoverer => discoverer,
        };
        let actual = caps.get(req.capability);
        (actual != req.expected).then(|| {
            format!(
                "{}.{} is {}",
                req.role.name(),
                req.capability.key(),
                if actual { "enabled" } else { "disabled" }
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_rejected() {
        let err = toml::from_str::<DeviceCapabilities>("supports_6g = true").unwrap_err();
        assert!(err.to_string().contains("supports_6g"));
    }

    #[test]
    fn test_partial_table_uses_defaults() {
        let caps: DeviceCapabilities =
            toml::from_str("wifi_chipset = \"wcn7851\"\nsupports_dbs_sta_wfd = true").unwrap();
        assert_eq!(caps.wifi_chipset, "wcn7851");
        assert!(caps.supports_dbs_sta_wfd);
        assert_eq!(caps.max_num_streams, 2);
        assert!(caps.validate().is_ok());
    }

    #[test]
    fn test_check_requirements() {
        let advertiser = DeviceCapabilities {
            enable_sta_dfs_channel_for_peer_network: true,
            ..Default::default()
        };
        let discoverer = DeviceCapabilities::default();
        let reqs = [CapabilityRequirement::new(
            Role::Advertiser,
            Capability::EnableStaDfsChannelForPeerNetwork,
            false,
        )];
        assert_eq!(
            check_requirements(&reqs, &advertiser, &discoverer).as_deref(),
            Some("advertiser.enable_sta_dfs_channel_for_peer_network is enabled")
        );
        assert!(check_requirements(&reqs, &discoverer, &advertiser).is_none());
    }

    #[test]
    fn test_validate_stream_counts() {
        let caps = DeviceCapabilities {
            max_num_streams: 1,
            max_num_streams_dbs: 2,
            ..Default::default()
        };
        assert!(caps.validate().is_err());
    }
}
