//! Medium and payload model
//!
//! Enumerations describing which radio technology is used at each phase of a
//! Nearby connection and what data shape is moved over it. The numeric values
//! are the ones the on-device snippet expects on the wire.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::BetocqError;

// ----------------------------------------------------------------------------
// Lenient representation
// ----------------------------------------------------------------------------

/// Config files may spell a medium either by name or by its wire value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameOrValue {
    Value(i64),
    Name(String),
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "NameOrValue", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// Every variant, in wire-value order
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Wire value sent to the snippet
            pub fn value(self) -> i64 {
                self as i64
            }

            /// Upper-case name used in reports
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }

            /// Look up a variant by wire value
            pub fn from_value(value: i64) -> Option<Self> {
                match value {
                    $( $value => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Look up a variant by report name (case-insensitive)
            pub fn from_name(name: &str) -> Option<Self> {
                let upper = name.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $( $text => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.name().to_string()
            }
        }

        impl TryFrom<NameOrValue> for $name {
            type Error = BetocqError;

            fn try_from(raw: NameOrValue) -> Result<Self, Self::Error> {
                match raw {
                    NameOrValue::Value(v) => $name::from_value(v).ok_or_else(|| {
                        BetocqError::Config(format!(
                            "unknown {} value: {}",
                            stringify!($name),
                            v
                        ))
                    }),
                    NameOrValue::Name(ref s) => {
                        if let Ok(v) = s.trim().parse::<i64>() {
                            return $name::try_from(NameOrValue::Value(v));
                        }
                        $name::from_name(s).ok_or_else(|| {
                            BetocqError::Config(format!(
                                "unknown {} name: {}",
                                stringify!($name),
                                s
                            ))
                        })
                    }
                }
            }
        }
    };
}

// ----------------------------------------------------------------------------
// Requested Mediums
// ----------------------------------------------------------------------------

wire_enum! {
    /// Medium requested for advertising/discovery, connection or upgrade
    pub enum Medium {
        Auto = 0 => "AUTO",
        BtOnly = 1 => "BT_ONLY",
        BleOnly = 2 => "BLE_ONLY",
        WifiLanOnly = 3 => "WIFILAN_ONLY",
        /// Connect or upgrade to Wi-Fi Aware
        WifiAwareOnly = 4 => "WIFIAWARE_ONLY",
        UpgradeToWebRtc = 5 => "UPGRADE_TO_WEBRTC",
        /// Connect or upgrade to a Wi-Fi hotspot
        UpgradeToWifiHotspot = 6 => "UPGRADE_TO_WIFIHOTSPOT",
        /// Connect or upgrade to Wi-Fi Direct
        UpgradeToWifiDirect = 7 => "UPGRADE_TO_WIFIDIRECT",
        BleL2capOnly = 8 => "BLE_L2CAP_ONLY",
        /// Connect or upgrade to any Wi-Fi medium
        UpgradeToAllWifi = 9 => "UPGRADE_TO_ALL_WIFI",
    }
}

impl Medium {
    /// Whether a connection on this medium waits for a high-bandwidth upgrade
    pub fn is_high_quality(self) -> bool {
        matches!(
            self,
            Medium::WifiLanOnly
                | Medium::WifiAwareOnly
                | Medium::UpgradeToWebRtc
                | Medium::UpgradeToWifiHotspot
                | Medium::UpgradeToWifiDirect
                | Medium::UpgradeToAllWifi
        )
    }

    /// Whether iperf can cross-check throughput on this medium
    pub fn supports_iperf(self) -> bool {
        matches!(
            self,
            Medium::UpgradeToWifiDirect
                | Medium::UpgradeToWifiHotspot
                | Medium::WifiLanOnly
                | Medium::WifiAwareOnly
        )
    }
}

// ----------------------------------------------------------------------------
// Negotiated Mediums
// ----------------------------------------------------------------------------

wire_enum! {
    /// Medium actually negotiated, as reported by `onBandwidthChanged`
    pub enum ConnectionMedium {
        Unknown = 0 => "UNKNOWN",
        Bluetooth = 2 => "BLUETOOTH",
        WifiHotspot = 3 => "WIFI_HOTSPOT",
        Ble = 4 => "BLE",
        WifiLan = 5 => "WIFI_LAN",
        WifiAware = 6 => "WIFI_AWARE",
        Nfc = 7 => "NFC",
        WifiDirect = 8 => "WIFI_DIRECT",
        WebRtc = 9 => "WEB_RTC",
        BleL2cap = 10 => "BLE_L2CAP",
        Usb = 11 => "USB",
    }
}

impl ConnectionMedium {
    /// Peer-to-peer mediums whose group-owner frequency can be read back
    pub fn is_p2p_group(self) -> bool {
        matches!(self, ConnectionMedium::WifiDirect | ConnectionMedium::WifiHotspot)
    }
}

// ----------------------------------------------------------------------------
// Payload and Upgrade Types
// ----------------------------------------------------------------------------

wire_enum! {
    /// Shape of the payloads sent during transfer
    pub enum PayloadType {
        Bytes = 1 => "BYTES",
        File = 2 => "FILE",
        Stream = 3 => "STREAM",
    }
}

wire_enum! {
    /// How the connection moves to the upgrade medium
    pub enum MediumUpgradeType {
        Default = 0 => "DEFAULT",
        Disruptive = 1 => "DISRUPTIVE",
        NonDisruptive = 2 => "NON_DISRUPTIVE",
    }
}

wire_enum! {
    /// Wi-Fi D2D concurrency combination under test
    pub enum WifiD2dType {
        Scc2g = 0 => "SCC_2G",
        Scc5g = 1 => "SCC_5G",
        Mcc2gWfd5gSta = 2 => "MCC_2G_WFD_5G_STA",
        Mcc2gWfd5gIndoorSta = 3 => "MCC_2G_WFD_5G_INDOOR_STA",
        Mcc5gWfd5gDfsSta = 4 => "MCC_5G_WFD_5G_DFS_STA",
        Mcc5gHs5gDfsSta = 5 => "MCC_5G_HS_5G_DFS_STA",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        medium: Medium,
    }

    #[test]
    fn test_high_quality_mediums() {
        let high: Vec<Medium> = Medium::ALL
            .iter()
            .copied()
            .filter(|m| m.is_high_quality())
            .collect();
        assert_eq!(
            high,
            vec![
                Medium::WifiLanOnly,
                Medium::WifiAwareOnly,
                Medium::UpgradeToWebRtc,
                Medium::UpgradeToWifiHotspot,
                Medium::UpgradeToWifiDirect,
                Medium::UpgradeToAllWifi,
            ]
        );
        assert!(!Medium::BtOnly.is_high_quality());
        assert!(!Medium::BleOnly.is_high_quality());
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(Medium::UpgradeToWifiDirect.value(), 7);
        assert_eq!(ConnectionMedium::from_value(8), Some(ConnectionMedium::WifiDirect));
        assert_eq!(ConnectionMedium::from_value(1), None);
        assert_eq!(PayloadType::File.value(), 2);
        assert_eq!(MediumUpgradeType::NonDisruptive.value(), 2);
    }

    #[test]
    fn test_deserialize_by_name_or_value() {
        let by_value: Holder = toml::from_str("medium = 7").unwrap();
        assert_eq!(by_value.medium, Medium::UpgradeToWifiDirect);

        let by_name: Holder = toml::from_str("medium = \"ble_only\"").unwrap();
        assert_eq!(by_name.medium, Medium::BleOnly);

        let by_string_value: Holder = toml::from_str("medium = \"3\"").unwrap();
        assert_eq!(by_string_value.medium, Medium::WifiLanOnly);

        assert!(toml::from_str::<Holder>("medium = 42").is_err());
        assert!(toml::from_str::<Holder>("medium = \"CARRIER_PIGEON\"").is_err());
    }

    #[test]
    fn test_serialize_as_name() {
        let text = toml::to_string(&Holder {
            medium: Medium::UpgradeToWifiHotspot,
        })
        .unwrap();
        assert!(text.contains("UPGRADE_TO_WIFIHOTSPOT"));
    }
}
