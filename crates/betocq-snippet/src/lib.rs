//! BeToCQ device adapters
//!
//! Drives real Android devices: an `adb` wrapper, a Mobly snippet JSON-RPC
//! client, callback streams, shell output parsers and the `DeviceHandle`
//! implementation the runner consumes.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod adb;
pub mod callback;
pub mod client;
pub mod device;
pub mod error;
pub mod parse;
pub mod snippet;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use adb::Adb;
pub use callback::SnippetCallbackStream;
pub use client::SnippetClient;
pub use device::{AdbIperfRunner, AndroidDevice, NEARBY_SNIPPET_2_PACKAGE, NEARBY_SNIPPET_PACKAGE};
pub use error::{Result, SnippetError};
pub use snippet::RemoteNearbySnippet;
