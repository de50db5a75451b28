//! Throughput benchmark calculator
//!
//! Derives the minimum acceptable throughput of a Wi-Fi D2D medium from the
//! capabilities of both devices, the STA link and the concurrency mode. The
//! calculation is pure; the calibrated multipliers live in
//! `BenchmarkConstants` so they can be tuned per chipset generation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capabilities::DeviceCapabilities;
use crate::errors::{BetocqError, Result};
use crate::medium::Medium;

const BITS_PER_BYTE: f64 = 8.0;

// ----------------------------------------------------------------------------
// Calibration Data
// ----------------------------------------------------------------------------

/// Calibrated multipliers and ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConstants {
    pub max_phy_rate_per_stream_ac_80_mbps: u32,
    pub max_phy_rate_per_stream_ac_40_mbps: u32,
    pub max_phy_rate_per_stream_n_20_mbps: u32,
    pub mcc_throughput_multiplier: f64,
    /// Extra derate for a hotspot in MCC mode, on top of the MCC multiplier
    pub mcc_hotspot_throughput_multiplier: f64,
    pub max_phy_rate_to_min_throughput_ratio_5g: f64,
    pub max_phy_rate_to_min_throughput_ratio_2g: f64,
    pub iperf_to_nc_throughput_ratio: f64,
    /// Encryption overhead caps what Nearby Connections reaches on WLAN
    pub wlan_medium_throughput_cap_mbps: f64,
    pub classic_bt_throughput_benchmark_mbps: f64,
    pub ble_throughput_benchmark_mbps: f64,
}

impl Default for BenchmarkConstants {
    fn default() -> Self {
        Self {
            max_phy_rate_per_stream_ac_80_mbps: 433,
            max_phy_rate_per_stream_ac_40_mbps: 200,
            max_phy_rate_per_stream_n_20_mbps: 72,
            mcc_throughput_multiplier: 0.25,
            mcc_hotspot_throughput_multiplier: 0.20,
            max_phy_rate_to_min_throughput_ratio_5g: 0.37,
            max_phy_rate_to_min_throughput_ratio_2g: 0.10,
            iperf_to_nc_throughput_ratio: 0.8,
            wlan_medium_throughput_cap_mbps: 15.0,
            classic_bt_throughput_benchmark_mbps: 0.02,
            ble_throughput_benchmark_mbps: 0.02,
        }
    }
}

impl BenchmarkConstants {
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("mcc_throughput_multiplier", self.mcc_throughput_multiplier),
            ("mcc_hotspot_throughput_multiplier", self.mcc_hotspot_throughput_multiplier),
            ("max_phy_rate_to_min_throughput_ratio_5g", self.max_phy_rate_to_min_throughput_ratio_5g),
            ("max_phy_rate_to_min_throughput_ratio_2g", self.max_phy_rate_to_min_throughput_ratio_2g),
            ("iperf_to_nc_throughput_ratio", self.iperf_to_nc_throughput_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(BetocqError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.wlan_medium_throughput_cap_mbps <= 0.0 {
            return Err(BetocqError::Config(
                "wlan_medium_throughput_cap_mbps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Inputs and Outputs
// ----------------------------------------------------------------------------

/// Concurrency facts of the scenario under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputModes {
    pub is_mcc: bool,
    pub is_dbs: bool,
    pub is_2g_medium: bool,
    /// Both devices support TDLS
    pub tdls_supported: bool,
}

/// Everything the calculator reads
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkInput<'a> {
    pub advertiser: &'a DeviceCapabilities,
    pub discoverer: &'a DeviceCapabilities,
    pub upgrade_medium: Medium,
    pub sta_frequency: i64,
    pub sta_max_link_speed_mbps: i64,
    pub modes: ThroughputModes,
}

/// Minimum throughput in MB/s, as measured by iperf and by a Nearby transfer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedTarget {
    pub iperf_mbps: f64,
    pub nc_mbps: f64,
}

impl SpeedTarget {
    /// No target applies; every measured speed passes
    pub fn unset() -> Self {
        Self {
            iperf_mbps: -1.0,
            nc_mbps: -1.0,
        }
    }

    /// A fixed benchmark for non Wi-Fi mediums
    pub fn fixed(mbps: f64) -> Self {
        Self {
            iperf_mbps: mbps,
            nc_mbps: mbps,
        }
    }

    pub fn is_set(&self) -> bool {
        self.nc_mbps > 0.0
    }
}

// ----------------------------------------------------------------------------
// Calculator
// ----------------------------------------------------------------------------

/// Fixed benchmark for Bluetooth mediums, if the medium has one
pub fn fixed_benchmark(constants: &BenchmarkConstants, medium: Medium) -> Option<SpeedTarget> {
    match medium {
        Medium::BtOnly => Some(SpeedTarget::fixed(constants.classic_bt_throughput_benchmark_mbps)),
        Medium::BleOnly | Medium::BleL2capOnly => {
            Some(SpeedTarget::fixed(constants.ble_throughput_benchmark_mbps))
        }
        _ => None,
    }
}

/// Usable spatial streams for the pair
pub fn max_num_streams(input: &BenchmarkInput<'_>) -> u32 {
    if input.modes.is_dbs && !input.modes.is_2g_medium {
        input.advertiser.max_num_streams_dbs
    } else {
        input.discoverer.max_num_streams.min(input.advertiser.max_num_streams)
    }
}

/// Compute the speed target for a Wi-Fi D2D medium
pub fn compute_speed_target(constants: &BenchmarkConstants, input: &BenchmarkInput<'_>) -> SpeedTarget {
    let streams = max_num_streams(input);
    let is_wlan = input.upgrade_medium == Medium::WifiLanOnly;
    let is_hotspot = input.upgrade_medium == Medium::UpgradeToWifiHotspot;

    let (max_phy_rate_mbps, iperf_mbps, nc_mbps) = if input.modes.is_2g_medium {
        let max_phy_rate = input
            .discoverer
            .max_phy_rate_2g_mbps
            .min(input.advertiser.max_phy_rate_2g_mbps)
            .min(streams * constants.max_phy_rate_per_stream_n_20_mbps);
        let iperf = (max_phy_rate as f64 * constants.max_phy_rate_to_min_throughput_ratio_2g
            / BITS_PER_BYTE)
            .floor();
        (max_phy_rate, iperf, iperf)
    } else {
        let ac80_rate = streams * constants.max_phy_rate_per_stream_ac_80_mbps;
        let mut max_phy_rate = input
            .discoverer
            .max_phy_rate_5g_mbps
            .min(input.advertiser.max_phy_rate_5g_mbps)
            .min(ac80_rate);
        // Link speed below the AC80 rate means the AP channel is narrower than 80 MHz
        if input.sta_frequency > 5000
            && input.sta_max_link_speed_mbps > 0
            && input.sta_max_link_speed_mbps < ac80_rate as i64
        {
            max_phy_rate = max_phy_rate.min(streams * constants.max_phy_rate_per_stream_ac_40_mbps);
        }

        let mut iperf = (max_phy_rate as f64 * constants.max_phy_rate_to_min_throughput_ratio_5g
            / BITS_PER_BYTE)
            .floor();
        if input.modes.is_mcc {
            iperf = (iperf * constants.mcc_throughput_multiplier).floor();
            if is_hotspot {
                iperf *= constants.mcc_hotspot_throughput_multiplier;
            }
        }
        if is_wlan && !input.modes.tdls_supported {
            iperf /= 2.0;
        }

        let mut nc = iperf * constants.iperf_to_nc_throughput_ratio;
        if is_wlan {
            nc = nc.min(constants.wlan_medium_throughput_cap_mbps);
        }
        (max_phy_rate, iperf, nc)
    };

    debug!(
        "target STA freq = {}, max STA speed (Mb/s): {}, max D2D speed (MB/s): {:.2}, min D2D speed (MB/s), iperf: {:.2}, nc: {:.2}",
        input.sta_frequency,
        input.sta_max_link_speed_mbps,
        max_phy_rate_mbps as f64 / BITS_PER_BYTE,
        iperf_mbps,
        nc_mbps
    );

    SpeedTarget {
        iperf_mbps,
        nc_mbps,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_caps(streams: u32, rate_5g: u32, rate_2g: u32) -> DeviceCapabilities {
        DeviceCapabilities {
            max_num_streams: streams,
            max_num_streams_dbs: 1,
            max_phy_rate_5g_mbps: rate_5g,
            max_phy_rate_2g_mbps: rate_2g,
            ..Default::default()
        }
    }

    fn create_test_input<'a>(
        adv: &'a DeviceCapabilities,
        disc: &'a DeviceCapabilities,
        medium: Medium,
        modes: ThroughputModes,
    ) -> BenchmarkInput<'a> {
        BenchmarkInput {
            advertiser: adv,
            discoverer: disc,
            upgrade_medium: medium,
            sta_frequency: 5180,
            sta_max_link_speed_mbps: -1,
            modes,
        }
    }

    #[test]
    fn test_scc_5g_wfd_two_streams() {
        let caps = create_test_caps(2, 1733, 144);
        let input = create_test_input(&caps, &caps, Medium::UpgradeToWifiDirect, ThroughputModes::default());
        // min(1733, 2 * 433) = 866 -> 866 * 0.37 / 8 = 40.05
        let target = compute_speed_target(&BenchmarkConstants::default(), &input);
        assert_eq!(target.iperf_mbps, 40.0);
        assert_eq!(target.nc_mbps, 32.0);
    }

    #[test]
    fn test_narrow_ap_channel_uses_ac40() {
        let caps = create_test_caps(2, 1733, 144);
        let mut input = create_test_input(&caps, &caps, Medium::UpgradeToWifiDirect, ThroughputModes::default());
        input.sta_max_link_speed_mbps = 400;
        // 2 * 200 = 400 -> 400 * 0.37 / 8 = 18.5
        let target = compute_speed_target(&BenchmarkConstants::default(), &input);
        assert_eq!(target.iperf_mbps, 18.0);
    }

    #[test]
    fn test_dbs_uses_advertiser_dbs_streams() {
        let caps = create_test_caps(2, 1733, 144);
        let modes = ThroughputModes {
            is_dbs: true,
            ..Default::default()
        };
        let input = create_test_input(&caps, &caps, Medium::UpgradeToWifiDirect, modes);
        assert_eq!(max_num_streams(&input), 1);
        // 433 * 0.37 / 8 = 20.02
        assert_eq!(compute_speed_target(&BenchmarkConstants::default(), &input).iperf_mbps, 20.0);
    }

    #[test]
    fn test_mcc_hotspot_derates_twice() {
        let caps = create_test_caps(2, 1733, 144);
        let modes = ThroughputModes {
            is_mcc: true,
            ..Default::default()
        };
        let input = create_test_input(&caps, &caps, Medium::UpgradeToWifiHotspot, modes);
        let target = compute_speed_target(&BenchmarkConstants::default(), &input);
        // floor(40 * 0.25) = 10, then * 0.2
        assert!((target.iperf_mbps - 2.0).abs() < 1e-9);
        assert!((target.nc_mbps - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_wlan_without_tdls_is_halved_and_capped() {
        let caps = create_test_caps(4, 3466, 574);
        let constants = BenchmarkConstants::default();
        let tdls = ThroughputModes {
            tdls_supported: true,
            ..Default::default()
        };
        let with_tdls = compute_speed_target(&constants, &create_test_input(&caps, &caps, Medium::WifiLanOnly, tdls));
        let without = compute_speed_target(
            &constants,
            &create_test_input(&caps, &caps, Medium::WifiLanOnly, ThroughputModes::default()),
        );
        // 4 * 433 = 1732 -> floor(80.1) = 80
        assert_eq!(with_tdls.iperf_mbps, 80.0);
        assert_eq!(without.iperf_mbps, 40.0);
        assert_eq!(with_tdls.nc_mbps, 15.0);
        assert_eq!(without.nc_mbps, 15.0);
    }

    #[test]
    fn test_2g_medium() {
        let caps = create_test_caps(2, 1733, 144);
        let modes = ThroughputModes {
            is_2g_medium: true,
            is_mcc: true,
            ..Default::default()
        };
        let input = create_test_input(&caps, &caps, Medium::UpgradeToWifiDirect, modes);
        // min(144, 2 * 72) = 144 -> floor(1.8) = 1, no MCC derate on 2G
        let target = compute_speed_target(&BenchmarkConstants::default(), &input);
        assert_eq!(target, SpeedTarget { iperf_mbps: 1.0, nc_mbps: 1.0 });
    }

    #[test]
    fn test_fixed_benchmarks() {
        let constants = BenchmarkConstants::default();
        assert_eq!(fixed_benchmark(&constants, Medium::BleOnly), Some(SpeedTarget::fixed(0.02)));
        assert_eq!(fixed_benchmark(&constants, Medium::BtOnly), Some(SpeedTarget::fixed(0.02)));
        assert!(fixed_benchmark(&constants, Medium::UpgradeToWifiDirect).is_none());
        assert!(!SpeedTarget::unset().is_set());
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let constants = BenchmarkConstants {
            mcc_throughput_multiplier: 1.5,
            ..Default::default()
        };
        assert!(constants.validate().is_err());
        assert!(BenchmarkConstants::default().validate().is_ok());
    }
}
