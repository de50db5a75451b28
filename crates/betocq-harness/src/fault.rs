//! Per-phase fault injection
//!
//! Each `Fault` breaks exactly one step of the connection life cycle, so a run
//! with that fault must end with the matching `FailureReason`.

use std::fmt;
use std::str::FromStr;

use betocq_core::FailureReason;
use serde::{Deserialize, Serialize};

/// Fault name that matches no `Fault`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown fault '{name}', expected one of: {expected}")]
pub struct UnknownFault {
    pub name: String,
    pub expected: String,
}

// ----------------------------------------------------------------------------
// Faults
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fault {
    /// `startAdvertising` raises on the advertiser
    AdvertisingRejected,
    /// Discovery never reports the advertiser
    NoEndpointFound,
    /// The discoverer sees its own request as incoming
    WrongDirection,
    /// `onConnectionResult` reports failure
    UnsuccessfulResult,
    /// Bandwidth stays low after accept
    UpgradeNeverHighQuality,
    /// Every payload update reports failure
    TransferFailure,
    /// The sender reports a zero transfer time
    ZeroTransferTime,
}

impl Fault {
    pub const ALL: &'static [Fault] = &[
        Fault::AdvertisingRejected,
        Fault::NoEndpointFound,
        Fault::WrongDirection,
        Fault::UnsuccessfulResult,
        Fault::UpgradeNeverHighQuality,
        Fault::TransferFailure,
        Fault::ZeroTransferTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Fault::AdvertisingRejected => "advertising-rejected",
            Fault::NoEndpointFound => "no-endpoint-found",
            Fault::WrongDirection => "wrong-direction",
            Fault::UnsuccessfulResult => "unsuccessful-result",
            Fault::UpgradeNeverHighQuality => "upgrade-never-high-quality",
            Fault::TransferFailure => "transfer-failure",
            Fault::ZeroTransferTime => "zero-transfer-time",
        }
    }

    /// Reason an iteration hit by this fault must report
    pub fn expected_reason(self) -> FailureReason {
        match self {
            Fault::AdvertisingRejected => FailureReason::TargetStartAdvertising,
            Fault::NoEndpointFound => FailureReason::SourceStartDiscovery,
            Fault::WrongDirection => FailureReason::SourceRequestConnection,
            Fault::UnsuccessfulResult => FailureReason::TargetAcceptConnection,
            Fault::UpgradeNeverHighQuality => FailureReason::WifiMediumUpgrade,
            Fault::TransferFailure | Fault::ZeroTransferTime => FailureReason::FileTransferFail,
        }
    }

    /// Whether the fault only shows up on a high-quality upgrade
    pub fn needs_upgrade(self) -> bool {
        self == Fault::UpgradeNeverHighQuality
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Fault {
    type Err = UnknownFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Fault::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| UnknownFault {
                name: s.to_string(),
                expected: Fault::ALL.iter().map(|f| f.name()).collect::<Vec<_>>().join(", "),
            })
    }
}

// ----------------------------------------------------------------------------
// Fault Plan
// ----------------------------------------------------------------------------

/// Which fault to inject and how many more times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultPlan {
    fault: Option<Fault>,
    /// `None` means every time
    remaining: Option<u32>,
}

impl FaultPlan {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn always(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            remaining: None,
        }
    }

    /// Inject `fault` on its first `times` opportunities only
    pub fn times(fault: Fault, times: u32) -> Self {
        Self {
            fault: Some(fault),
            remaining: Some(times),
        }
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Consume one injection of `fault` if the plan has one left
    pub fn trigger(&mut self, fault: Fault) -> bool {
        if self.fault != Some(fault) {
            return false;
        }
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}
