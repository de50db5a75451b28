//! Two mock phones sharing one air, ready for the runner

use std::sync::Arc;
use std::time::Duration;

use betocq_core::{
    DeviceHandle, DiscoveryJitter, RunContext, RunIdentifier, ScenarioSpec, SuiteConfig,
};

use crate::air::{LinkProfile, MockAir};
use crate::device::{MockDevice, MockDeviceProfile, P2pChannel};
use crate::fault::FaultPlan;
use crate::stream::CallLog;

pub const SOURCE_SERIAL: &str = "mock-source";
pub const TARGET_SERIAL: &str = "mock-target";

const AP_2G: (i64, i64) = (2437, 144);
const AP_5G: (i64, i64) = (5180, 866);
const AP_5G_DFS: (i64, i64) = (5260, 866);

/// Fill what a simulated run needs and a default configuration lacks
pub fn with_simulation_defaults(mut config: SuiteConfig) -> SuiteConfig {
    let params = &mut config.parameters;
    for (ssid, default) in [
        (&mut params.wifi_2g_ssid, "mock-ap-2g"),
        (&mut params.wifi_5g_ssid, "mock-ap-5g"),
        (&mut params.wifi_dfs_5g_ssid, "mock-ap-dfs"),
    ] {
        if ssid.is_empty() {
            *ssid = default.to_string();
        }
    }
    for caps in [&mut config.devices.source, &mut config.devices.target] {
        if caps.wifi_chipset.is_empty() {
            caps.wifi_chipset = "mock".to_string();
        }
    }
    config
}

pub fn simulated_config() -> SuiteConfig {
    with_simulation_defaults(SuiteConfig::default())
}

/// A source (discoverer) and target (advertiser) on one mock air
pub struct MockPair {
    pub air: Arc<MockAir>,
    pub source: Arc<MockDevice>,
    pub target: Arc<MockDevice>,
}

impl MockPair {
    pub fn new(air: Arc<MockAir>, source: MockDeviceProfile, target: MockDeviceProfile) -> Self {
        Self {
            source: Arc::new(MockDevice::new(source, air.clone())),
            target: Arc::new(MockDevice::new(target, air.clone())),
            air,
        }
    }

    /// Phones with the configured capabilities, the configured APs and a
    /// P2P channel that satisfies the scenario
    pub fn from_config(config: &SuiteConfig, spec: &ScenarioSpec, faults: FaultPlan) -> Self {
        let profile = |serial: &str, caps| {
            let params = &config.parameters;
            let mut profile = MockDeviceProfile::new(serial, caps);
            for (ssid, (frequency, speed)) in [
                (&params.wifi_2g_ssid, AP_2G),
                (&params.wifi_5g_ssid, AP_5G),
                (&params.wifi_dfs_5g_ssid, AP_5G_DFS),
            ] {
                if !ssid.is_empty() {
                    profile = profile.with_access_point(ssid, frequency, speed);
                }
            }
            profile.p2p_channel = P2pChannel::for_scenario(spec);
            profile
        };
        Self::new(
            MockAir::new(faults),
            profile(SOURCE_SERIAL, config.devices.source.clone()),
            profile(TARGET_SERIAL, config.devices.target.clone()),
        )
    }

    pub fn log(&self) -> &CallLog {
        self.air.log()
    }

    pub fn set_link_profile(&self, profile: LinkProfile) {
        self.air.set_profile(profile);
    }

    /// Run context without jitter, settle waits or post-association idle
    pub fn context(&self, mut config: SuiteConfig) -> RunContext {
        config.parameters.target_post_wifi_connection_idle_time_sec = 0;
        let target = self.target.profile();
        let run_id = RunIdentifier::new(
            &config.parameters.target_cuj_name,
            &target.manufacturer,
            &target.model,
        );
        let mut ctx = RunContext::new(
            config,
            run_id,
            self.source.clone() as Arc<dyn DeviceHandle>,
            self.target.clone() as Arc<dyn DeviceHandle>,
        );
        ctx.jitter = DiscoveryJitter::none();
        ctx.reset_wait = Duration::ZERO;
        ctx
    }
}
