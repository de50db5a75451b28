//! Frequency and concurrency-mode validation
//!
//! After a transfer, the observed STA and P2P frequencies must agree with the
//! scenario: same channel for SCC, different channels for MCC, and different
//! bands when DBS is in use.

use serde::{Deserialize, Serialize};

use crate::constants::INVALID_INT;
use crate::failure::FailureReason;

pub const MAX_FREQ_2G_MHZ: i64 = 2500;
pub const MIN_FREQ_5G_DFS_MHZ: i64 = 5260;
pub const MAX_FREQ_5G_DFS_MHZ: i64 = 5720;

/// Wi-Fi band a frequency falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiBand {
    Band2g,
    Band5g,
    Band5gDfs,
}

impl WifiBand {
    /// Partition a frequency in MHz into a band
    pub fn classify(frequency_mhz: i64) -> WifiBand {
        if frequency_mhz <= MAX_FREQ_2G_MHZ {
            WifiBand::Band2g
        } else if (MIN_FREQ_5G_DFS_MHZ..=MAX_FREQ_5G_DFS_MHZ).contains(&frequency_mhz) {
            WifiBand::Band5gDfs
        } else {
            WifiBand::Band5g
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WifiBand::Band2g => "2G",
            WifiBand::Band5g => "5G",
            WifiBand::Band5gDfs => "5G_DFS",
        }
    }
}

/// A failed frequency check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyViolation {
    pub reason: FailureReason,
    pub message: String,
}

impl FrequencyViolation {
    /// A misconfigured AP invalidates every later iteration
    pub fn is_scenario_fatal(&self) -> bool {
        self.reason == FailureReason::WrongApFrequency
    }
}

/// Check the STA is still associated and on the expected band
pub fn validate_sta_frequency(
    sta_frequency: i64,
    max_link_speed_mbps: i64,
    expected: WifiBand,
) -> Result<(), FrequencyViolation> {
    if sta_frequency == INVALID_INT || max_link_speed_mbps == INVALID_INT {
        return Err(FrequencyViolation {
            reason: FailureReason::DisconnectedFromAp,
            message: "Target device is disconnected from AP. Check AP DHCP config.".to_string(),
        });
    }
    if WifiBand::classify(sta_frequency) != expected {
        return Err(FrequencyViolation {
            reason: FailureReason::WrongApFrequency,
            message: format!("AP is set to a wrong frequency {}", sta_frequency),
        });
    }
    Ok(())
}

/// Concurrency mode facts needed by the P2P check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConcurrencyMode {
    pub is_mcc: bool,
    pub is_dbs: bool,
}

/// Check the negotiated P2P frequency against the STA frequency.
///
/// Skipped when the P2P frequency could not be read or no throughput target
/// applies to the scenario.
pub fn validate_p2p_frequency(
    p2p_frequency: i64,
    sta_frequency: i64,
    mode: ConcurrencyMode,
    nc_target_mbps: f64,
) -> Result<(), FrequencyViolation> {
    if p2p_frequency == INVALID_INT || nc_target_mbps <= 0.0 {
        return Ok(());
    }
    const TAIL: &str = "Check the device capability configuration especially for DBS, DFS, indoor capabilities.";
    let message = if mode.is_mcc {
        (p2p_frequency == sta_frequency).then(|| {
            format!(
                "P2P frequency ({}) is same as STA frequency ({}) in MCC test case. {}",
                p2p_frequency, sta_frequency, TAIL
            )
        })
    } else if mode.is_dbs {
        (p2p_frequency == sta_frequency).then(|| {
            format!(
                "P2P frequency ({}) is the same as STA frequency ({}) in SCC+DBS test case. {}",
                p2p_frequency, sta_frequency, TAIL
            )
        })
    } else {
        (p2p_frequency != sta_frequency).then(|| {
            format!(
                "P2P frequency ({}) is different from STA frequency ({}) in SCC test case. {}",
                p2p_frequency, sta_frequency, TAIL
            )
        })
    };
    match message {
        Some(message) => Err(FrequencyViolation {
            reason: FailureReason::WrongP2pFrequency,
            message,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(WifiBand::classify(2412), WifiBand::Band2g);
        assert_eq!(WifiBand::classify(2500), WifiBand::Band2g);
        assert_eq!(WifiBand::classify(2501), WifiBand::Band5g);
        assert_eq!(WifiBand::classify(5180), WifiBand::Band5g);
        assert_eq!(WifiBand::classify(5259), WifiBand::Band5g);
        assert_eq!(WifiBand::classify(5260), WifiBand::Band5gDfs);
        assert_eq!(WifiBand::classify(5720), WifiBand::Band5gDfs);
        assert_eq!(WifiBand::classify(5721), WifiBand::Band5g);
        assert_eq!(WifiBand::classify(5745), WifiBand::Band5g);
    }

    #[test]
    fn test_sta_disconnected() {
        let err = validate_sta_frequency(-1, -1, WifiBand::Band5g).unwrap_err();
        assert_eq!(err.reason, FailureReason::DisconnectedFromAp);
        assert!(!err.is_scenario_fatal());
    }

    #[test]
    fn test_sta_wrong_band_is_fatal() {
        let err = validate_sta_frequency(5500, 866, WifiBand::Band5g).unwrap_err();
        assert_eq!(err.reason, FailureReason::WrongApFrequency);
        assert_eq!(err.message, "AP is set to a wrong frequency 5500");
        assert!(err.is_scenario_fatal());
        assert!(validate_sta_frequency(5500, 866, WifiBand::Band5gDfs).is_ok());
    }

    #[test]
    fn test_p2p_scc() {
        let scc = ConcurrencyMode::default();
        assert!(validate_p2p_frequency(5180, 5180, scc, 32.0).is_ok());
        let err = validate_p2p_frequency(5745, 5180, scc, 32.0).unwrap_err();
        assert_eq!(err.reason, FailureReason::WrongP2pFrequency);
        assert!(err.message.contains("different from STA frequency (5180) in SCC"));
        // No target, no check
        assert!(validate_p2p_frequency(5745, 5180, scc, 0.0).is_ok());
        assert!(validate_p2p_frequency(-1, 5180, scc, 32.0).is_ok());
    }

    #[test]
    fn test_p2p_mcc_and_dbs() {
        let mcc = ConcurrencyMode {
            is_mcc: true,
            is_dbs: false,
        };
        assert!(validate_p2p_frequency(2437, 5180, mcc, 5.0).is_ok());
        assert!(validate_p2p_frequency(5180, 5180, mcc, 5.0).unwrap_err().message.contains("MCC"));

        let dbs = ConcurrencyMode {
            is_mcc: false,
            is_dbs: true,
        };
        assert!(validate_p2p_frequency(5180, 2437, dbs, 20.0).is_ok());
        assert!(validate_p2p_frequency(2437, 2437, dbs, 20.0).is_err());
    }
}
