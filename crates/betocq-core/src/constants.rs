//! Timeouts, sizes and counts shared by the engine and the scenario catalog

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const SUITE_NAME: &str = "BeToCQ";

// ----------------------------------------------------------------------------
// Success Targets and Iteration Counts
// ----------------------------------------------------------------------------

pub const SUCCESS_RATE_TARGET: f64 = 0.98;
pub const BLE_PERFORMANCE_SUCCESS_RATE_TARGET: f64 = 0.98;
/// Hotspot in MCC mode time-slices against the STA channel and drops more attempts
pub const MCC_HOTSPOT_SUCCESS_RATE_TARGET: f64 = 0.90;

pub const SCC_PERFORMANCE_TEST_COUNT: u32 = 10;
pub const SCC_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR: u32 = 2;
pub const MCC_PERFORMANCE_TEST_COUNT: u32 = 100;
pub const MCC_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR: u32 = 5;
pub const BT_PERFORMANCE_TEST_COUNT: u32 = 100;
pub const BT_PERFORMANCE_TEST_MAX_CONSECUTIVE_ERROR: u32 = 5;

// ----------------------------------------------------------------------------
// Timeouts
// ----------------------------------------------------------------------------

pub const NEARBY_RESET_WAIT: Duration = Duration::from_secs(2);
pub const CONNECTION_BANDWIDTH_CHANGED_TIMEOUT: Duration = Duration::from_secs(25);
pub const DISCONNECTION_TIMEOUT: Duration = Duration::from_secs(15);
pub const WIFI_STA_CONNECTING_TIMEOUT: Duration = Duration::from_secs(25);
pub const TARGET_POST_WIFI_CONNECTION_IDLE_TIME_SEC: u64 = 10;

pub const BT_1K_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(20);
pub const BT_500K_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(25);
pub const BLE_20K_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(25);
pub const WIFI_1K_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(20);
pub const WIFI_2G_20M_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(20);
pub const WIFI_100M_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(100);
pub const WIFI_200M_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(100);
pub const WIFI_500M_PAYLOAD_TRANSFER_TIMEOUT: Duration = Duration::from_secs(250);
pub const FUNCTION_TEST_TRANSFER_TIMEOUT: Duration = Duration::from_secs(100);

/// Advertise-to-discover delay is drawn from `[min, max)`
pub const ADVERTISE_TO_DISCOVER_JITTER_MIN: Duration = Duration::from_secs(3);
pub const ADVERTISE_TO_DISCOVER_JITTER_MAX: Duration = Duration::from_secs(4);

/// Per-phase waits of one connection setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSetupTimeouts {
    pub discovery: Duration,
    pub connection_init: Duration,
    pub connection_result: Duration,
}

impl ConnectionSetupTimeouts {
    /// First connection between the pair
    pub fn first() -> Self {
        Self {
            discovery: Duration::from_secs(30),
            connection_init: Duration::from_secs(30),
            connection_result: Duration::from_secs(35),
        }
    }

    /// Connection set up while a prior BT connection is alive
    pub fn second() -> Self {
        Self {
            discovery: Duration::from_secs(35),
            connection_init: Duration::from_secs(10),
            connection_result: Duration::from_secs(25),
        }
    }
}

impl Default for ConnectionSetupTimeouts {
    fn default() -> Self {
        Self::first()
    }
}

// ----------------------------------------------------------------------------
// Keep-alive
// ----------------------------------------------------------------------------

/// Keep-alive parameters passed with `requestConnection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAlive {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl KeepAlive {
    pub const BT: KeepAlive = KeepAlive {
        timeout_ms: 30_000,
        interval_ms: 5_000,
    };
    pub const WIFI: KeepAlive = KeepAlive {
        timeout_ms: 10_000,
        interval_ms: 3_000,
    };
}

impl Default for KeepAlive {
    fn default() -> Self {
        KeepAlive::WIFI
    }
}

// ----------------------------------------------------------------------------
// Sizes and Sentinels
// ----------------------------------------------------------------------------

pub const TRANSFER_FILE_SIZE_1KB: u64 = 1;
pub const TRANSFER_FILE_SIZE_10KB: u64 = 10;
pub const TRANSFER_FILE_SIZE_20KB: u64 = 20;
pub const TRANSFER_FILE_SIZE_500KB: u64 = 512;
pub const TRANSFER_FILE_SIZE_1MB: u64 = 1024;
pub const TRANSFER_FILE_SIZE_20MB: u64 = 20 * 1024;
pub const TRANSFER_FILE_SIZE_100MB: u64 = 100 * 1024;
pub const TRANSFER_FILE_SIZE_200MB: u64 = 200 * 1024;
pub const TRANSFER_FILE_SIZE_500MB: u64 = 500 * 1024;

pub const TRANSFER_FILE_NUM_DEFAULT: u32 = 1;
pub const TRANSFER_FILE_NUM_FUNCTION_TEST: u32 = 100;

pub const INVALID_INT: i64 = -1;
pub const INVALID_RSSI: i32 = -128;
/// An RSSI above this means the device sits too close to the AP
pub const RSSI_HIGH_THRESHOLD: i32 = -15;
pub const MAX_NUM_BUG_REPORT: u32 = 5;

pub const TARGET_CUJ_QUICK_START: &str = "quick_start";
pub const TARGET_CUJ_NEARBY_CONNECTIONS_FUNCTION: &str = "nearby_connections_function";
