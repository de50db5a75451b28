//! BeToCQ mock harness
//!
//! Scripted phones for running the real scenario runner without hardware.
//! Two `MockDevice`s share a `MockAir` that raises every Nearby callback the
//! engine waits for, and a `FaultPlan` breaks one chosen step of the life
//! cycle so failure attribution can be checked end to end.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod air;
pub mod device;
pub mod fault;
pub mod pair;
pub mod snippet;
pub mod stream;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use air::{upgraded_medium, LinkProfile, MockAir, Station};
pub use device::{MockDevice, MockDeviceProfile, MockIperf, P2pChannel};
pub use fault::{Fault, FaultPlan, UnknownFault};
pub use pair::{simulated_config, with_simulation_defaults, MockPair, SOURCE_SERIAL, TARGET_SERIAL};
pub use snippet::{MockSnippet, RadioFeatures};
pub use stream::{CallLog, MockCallbackStream, StreamHandle};
