//! Property-based tests for the band partition, the throughput calculator and
//! the statistics rollups

use std::time::Duration;

use betocq_core::{
    compute_speed_target,
    frequency::{MAX_FREQ_2G_MHZ, MAX_FREQ_5G_DFS_MHZ, MIN_FREQ_5G_DFS_MHZ},
    BenchmarkConstants, BenchmarkInput, DeviceCapabilities, Medium, TestResultStats, ThroughputModes,
    WifiBand,
};
use proptest::prelude::*;

fn arb_capabilities() -> impl Strategy<Value = DeviceCapabilities> {
    (1u32..=4, 100u32..=2400, 50u32..=600).prop_map(|(streams, rate_5g, rate_2g)| DeviceCapabilities {
        max_num_streams: streams,
        max_num_streams_dbs: 1,
        max_phy_rate_5g_mbps: rate_5g,
        max_phy_rate_2g_mbps: rate_2g,
        ..Default::default()
    })
}

fn arb_wifi_medium() -> impl Strategy<Value = Medium> {
    prop_oneof![
        Just(Medium::UpgradeToWifiDirect),
        Just(Medium::UpgradeToWifiHotspot),
        Just(Medium::WifiLanOnly),
        Just(Medium::WifiAwareOnly),
    ]
}

fn input<'a>(
    advertiser: &'a DeviceCapabilities,
    discoverer: &'a DeviceCapabilities,
    medium: Medium,
    modes: ThroughputModes,
) -> BenchmarkInput<'a> {
    BenchmarkInput {
        advertiser,
        discoverer,
        upgrade_medium: medium,
        sta_frequency: 5180,
        // Unknown link speed keeps the AC80 rate in play
        sta_max_link_speed_mbps: -1,
        modes,
    }
}

proptest! {
    #[test]
    fn band_partition_is_total(freq in 0i64..8000) {
        let band = WifiBand::classify(freq);
        let expected = if freq <= MAX_FREQ_2G_MHZ {
            WifiBand::Band2g
        } else if (MIN_FREQ_5G_DFS_MHZ..=MAX_FREQ_5G_DFS_MHZ).contains(&freq) {
            WifiBand::Band5gDfs
        } else {
            WifiBand::Band5g
        };
        prop_assert_eq!(band, expected);
    }

    #[test]
    fn more_streams_never_lowers_target(
        caps in arb_capabilities(),
        extra_streams in 0u32..=4,
        extra_rate in 0u32..=1000,
        medium in arb_wifi_medium(),
        is_2g_medium in any::<bool>(),
    ) {
        let constants = BenchmarkConstants::default();
        let modes = ThroughputModes { is_2g_medium, ..Default::default() };
        let base = compute_speed_target(&constants, &input(&caps, &caps, medium, modes));

        let bigger = DeviceCapabilities {
            max_num_streams: caps.max_num_streams + extra_streams,
            max_phy_rate_5g_mbps: caps.max_phy_rate_5g_mbps + extra_rate,
            max_phy_rate_2g_mbps: caps.max_phy_rate_2g_mbps + extra_rate,
            ..caps.clone()
        };
        let raised = compute_speed_target(&constants, &input(&bigger, &bigger, medium, modes));
        prop_assert!(raised.iperf_mbps >= base.iperf_mbps);
        prop_assert!(raised.nc_mbps >= base.nc_mbps);
    }

    #[test]
    fn mcc_lowers_target(caps in arb_capabilities(), medium in arb_wifi_medium()) {
        let constants = BenchmarkConstants::default();
        let scc = compute_speed_target(&constants, &input(&caps, &caps, medium, ThroughputModes::default()));
        let mcc_modes = ThroughputModes { is_mcc: true, ..Default::default() };
        let mcc = compute_speed_target(&constants, &input(&caps, &caps, medium, mcc_modes));
        prop_assert!(scc.iperf_mbps >= 1.0);
        prop_assert!(mcc.iperf_mbps < scc.iperf_mbps);
        prop_assert!(mcc.nc_mbps <= scc.nc_mbps);
    }

    #[test]
    fn missing_tdls_halves_wlan_target(caps in arb_capabilities()) {
        let constants = BenchmarkConstants::default();
        let with_tdls = ThroughputModes { tdls_supported: true, ..Default::default() };
        let full = compute_speed_target(&constants, &input(&caps, &caps, Medium::WifiLanOnly, with_tdls));
        let half = compute_speed_target(
            &constants,
            &input(&caps, &caps, Medium::WifiLanOnly, ThroughputModes::default()),
        );
        prop_assert_eq!(half.iperf_mbps, full.iperf_mbps / 2.0);
        let uncapped = half.iperf_mbps * constants.iperf_to_nc_throughput_ratio;
        prop_assert_eq!(half.nc_mbps, uncapped.min(constants.wlan_medium_throughput_cap_mbps));
    }

    #[test]
    fn stats_are_idempotent(series in prop::collection::vec(prop::option::of(0u64..120_000), 0..50)) {
        let latencies: Vec<Option<Duration>> = series.iter().map(|v| v.map(Duration::from_millis)).collect();
        prop_assert_eq!(
            TestResultStats::from_latencies(&latencies),
            TestResultStats::from_latencies(&latencies)
        );

        let speeds: Vec<Option<f64>> = series.iter().map(|v| v.map(|k| k as f64)).collect();
        let first = TestResultStats::from_throughputs_kbps(&speeds);
        prop_assert_eq!(first, TestResultStats::from_throughputs_kbps(&speeds));
        prop_assert!(first.min <= first.median && first.median <= first.max);
    }
}

#[test]
fn test_band_boundaries_exact() {
    assert_eq!(WifiBand::classify(2500), WifiBand::Band2g);
    assert_eq!(WifiBand::classify(2501), WifiBand::Band5g);
    assert_eq!(WifiBand::classify(5259), WifiBand::Band5g);
    assert_eq!(WifiBand::classify(5260), WifiBand::Band5gDfs);
    assert_eq!(WifiBand::classify(5720), WifiBand::Band5gDfs);
    assert_eq!(WifiBand::classify(5721), WifiBand::Band5g);
}

#[test]
fn test_all_sentinel_series_yields_zero_stats() {
    assert_eq!(TestResultStats::from_latencies(&[None; 8]), TestResultStats::default());
    assert_eq!(TestResultStats::from_throughputs_kbps(&[None; 8]), TestResultStats::default());
}
