//! BeToCQ Core
//!
//! Connection life-cycle engine, throughput benchmark calculator, frequency
//! checks and result aggregation for Nearby Connections device-pair testing.
//! Device access goes through the `NearbySnippet` and `DeviceHandle` traits so
//! the same runner drives real phones and scripted mocks.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod benchmark;
pub mod capabilities;
pub mod config;
pub mod constants;
pub mod device;
pub mod engine;
pub mod errors;
pub mod failure;
pub mod frequency;
pub mod medium;
pub mod quality;
pub mod results;
pub mod rpc;
pub mod runner;
pub mod scenario;
pub mod transfer;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use benchmark::{compute_speed_target, BenchmarkConstants, BenchmarkInput, SpeedTarget, ThroughputModes};
pub use capabilities::{Capability, CapabilityRequirement, DeviceCapabilities, Role};
pub use config::{SuiteConfig, TestParameters};
pub use device::{DeviceHandle, IperfRunner, SnippetSlot, StaInfo};
pub use engine::{ConnectionConfig, ConnectionPhase, DiscoveryJitter, NearbyConnection, Peer, PhaseEvent};
pub use errors::{BetocqError, ConnectionError, Result, RpcError};
pub use failure::FailureReason;
pub use frequency::{validate_p2p_frequency, validate_sta_frequency, ConcurrencyMode, WifiBand};
pub use medium::{ConnectionMedium, Medium, MediumUpgradeType, PayloadType};
pub use quality::SetupQualityInfo;
pub use results::{PerformanceTestResults, ScenarioReport, SingleTestResult, TestResultStats};
pub use rpc::{CallbackEvent, CallbackStream, ConnectionRequest, NearbySnippet};
pub use runner::{run_scenario, run_suite, RunContext, RunIdentifier, ScenarioRunner};
pub use scenario::ScenarioSpec;
pub use transfer::TransferRequest;
