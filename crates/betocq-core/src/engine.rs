//! Nearby connection protocol engine
//!
//! `ConnectionPhase` is a linear state machine that must be consumed to
//! transition, so a connection attempt cannot skip or reorder phases.
//! `NearbyConnection` drives one device pair through the life cycle:
//!
//! ```text
//! Init -> AdvertisingStarted -> DiscoveryStarted -> EndpointFound
//!      -> ConnectionRequested -> ConnectionInitiated -> DiscoveryStopped
//!      -> ConnectionAccepted [-> AwaitingBandwidthUpgrade]
//!      -> AdvertisingStopped -> Connected
//! ```
//!
//! Any failed assertion or wait moves the machine to `Failed`, tagged with the
//! `FailureReason` of the phase in progress.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    ConnectionSetupTimeouts, KeepAlive, ADVERTISE_TO_DISCOVER_JITTER_MAX,
    ADVERTISE_TO_DISCOVER_JITTER_MIN, CONNECTION_BANDWIDTH_CHANGED_TIMEOUT,
    DISCONNECTION_TIMEOUT,
};
use crate::errors::{ConnectionError, RpcError};
use crate::failure::FailureReason;
use crate::medium::{ConnectionMedium, Medium, MediumUpgradeType};
use crate::quality::SetupQualityInfo;
use crate::rpc::{
    CallbackStream, ConnectionRequest, NearbySnippet, ON_BANDWIDTH_CHANGED,
    ON_CONNECTION_INITIATED, ON_CONNECTION_RESULT, ON_DISCONNECTED, ON_ENDPOINT_FOUND,
};

// ----------------------------------------------------------------------------
// Connection Phases
// ----------------------------------------------------------------------------

/// Life-cycle state of one connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPhase {
    Init,
    AdvertisingStarted,
    DiscoveryStarted,
    EndpointFound { advertiser_endpoint_id: String },
    ConnectionRequested,
    ConnectionInitiated { discoverer_endpoint_id: String },
    DiscoveryStopped,
    ConnectionAccepted,
    AwaitingBandwidthUpgrade,
    AdvertisingStopped,
    /// Terminal success of the setup; transfer and disconnect may follow
    Connected,
    Failed { reason: FailureReason },
    Disconnected,
}

/// Events that move a connection attempt forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEvent {
    StartAdvertising,
    StartDiscovery,
    EndpointFound { endpoint_id: String },
    RequestConnection,
    ConnectionInitiated { endpoint_id: String },
    StopDiscovery,
    ConnectionAccepted,
    AwaitBandwidthUpgrade,
    StopAdvertising,
    Complete,
    Fail { reason: FailureReason },
    Disconnect,
}

/// Result of a phase transition
#[derive(Debug, Clone)]
pub struct PhaseTransition {
    pub new_phase: ConnectionPhase,
    pub audit_entry: AuditEntry,
}

/// Audit trail entry for phase transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub service_id: String,
    pub from_phase: String,
    pub to_phase: String,
    pub event: String,
}

/// Errors that can occur during phase transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseTransitionError {
    #[error("Invalid transition from {from_phase} on event {event}")]
    InvalidTransition { from_phase: String, event: String },
}

impl ConnectionPhase {
    /// Current phase name for logging/audit
    pub fn state_name(&self) -> &'static str {
        match self {
            ConnectionPhase::Init => "Init",
            ConnectionPhase::AdvertisingStarted => "AdvertisingStarted",
            ConnectionPhase::DiscoveryStarted => "DiscoveryStarted",
            ConnectionPhase::EndpointFound { .. } => "EndpointFound",
            ConnectionPhase::ConnectionRequested => "ConnectionRequested",
            ConnectionPhase::ConnectionInitiated { .. } => "ConnectionInitiated",
            ConnectionPhase::DiscoveryStopped => "DiscoveryStopped",
            ConnectionPhase::ConnectionAccepted => "ConnectionAccepted",
            ConnectionPhase::AwaitingBandwidthUpgrade => "AwaitingBandwidthUpgrade",
            ConnectionPhase::AdvertisingStopped => "AdvertisingStopped",
            ConnectionPhase::Connected => "Connected",
            ConnectionPhase::Failed { .. } => "Failed",
            ConnectionPhase::Disconnected => "Disconnected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionPhase::Connected | ConnectionPhase::Failed { .. } | ConnectionPhase::Disconnected
        )
    }

    /// Process an event and transition to the next phase (consumes self)
    pub fn transition(
        self,
        event: PhaseEvent,
        service_id: &str,
    ) -> Result<PhaseTransition, PhaseTransitionError> {
        let from_phase = self.state_name().to_string();
        let event_name = format!("{:?}", event);

        let new_phase = match (self, event) {
            (ConnectionPhase::Init, PhaseEvent::StartAdvertising) => {
                ConnectionPhase::AdvertisingStarted
            }
            (ConnectionPhase::AdvertisingStarted, PhaseEvent::StartDiscovery) => {
                ConnectionPhase::DiscoveryStarted
            }
            (ConnectionPhase::DiscoveryStarted, PhaseEvent::EndpointFound { endpoint_id }) => {
                ConnectionPhase::EndpointFound {
                    advertiser_endpoint_id: endpoint_id,
                }
            }
            (ConnectionPhase::EndpointFound { .. }, PhaseEvent::RequestConnection) => {
                ConnectionPhase::ConnectionRequested
            }
            (ConnectionPhase::ConnectionRequested, PhaseEvent::ConnectionInitiated { endpoint_id }) => {
                ConnectionPhase::ConnectionInitiated {
                    discoverer_endpoint_id: endpoint_id,
                }
            }
            (ConnectionPhase::ConnectionInitiated { .. }, PhaseEvent::StopDiscovery) => {
                ConnectionPhase::DiscoveryStopped
            }
            (ConnectionPhase::DiscoveryStopped, PhaseEvent::ConnectionAccepted) => {
                ConnectionPhase::ConnectionAccepted
            }
            (ConnectionPhase::ConnectionAccepted, PhaseEvent::AwaitBandwidthUpgrade) => {
                ConnectionPhase::AwaitingBandwidthUpgrade
            }
            (
                ConnectionPhase::ConnectionAccepted | ConnectionPhase::AwaitingBandwidthUpgrade,
                PhaseEvent::StopAdvertising,
            ) => ConnectionPhase::AdvertisingStopped,
            (ConnectionPhase::AdvertisingStopped, PhaseEvent::Complete) => ConnectionPhase::Connected,

            // Any in-flight phase may fail
            (phase, PhaseEvent::Fail { reason }) if !phase.is_terminal() => {
                ConnectionPhase::Failed { reason }
            }
            // Transfer failures after setup are also recorded on the machine
            (ConnectionPhase::Connected, PhaseEvent::Fail { reason }) => {
                ConnectionPhase::Failed { reason }
            }

            (ConnectionPhase::Connected | ConnectionPhase::Failed { .. }, PhaseEvent::Disconnect) => {
                ConnectionPhase::Disconnected
            }

            (_phase, _event) => {
                return Err(PhaseTransitionError::InvalidTransition {
                    from_phase,
                    event: event_name,
                });
            }
        };

        let audit_entry = AuditEntry {
            timestamp: Utc::now(),
            service_id: service_id.to_string(),
            from_phase,
            to_phase: new_phase.state_name().to_string(),
            event: event_name,
        };

        Ok(PhaseTransition {
            new_phase,
            audit_entry,
        })
    }
}

// ----------------------------------------------------------------------------
// Connection Configuration
// ----------------------------------------------------------------------------

/// Delay between starting advertising and starting discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryJitter {
    pub min: Duration,
    pub max: Duration,
}

impl DiscoveryJitter {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draw a delay uniformly from `[min, max)`
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..max_ms))
    }
}

impl Default for DiscoveryJitter {
    fn default() -> Self {
        Self {
            min: ADVERTISE_TO_DISCOVER_JITTER_MIN,
            max: ADVERTISE_TO_DISCOVER_JITTER_MAX,
        }
    }
}

/// Mediums and timing for one connection attempt
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub advertising_discovery_medium: Medium,
    pub connection_medium: Medium,
    pub upgrade_medium: Medium,
    pub upgrade_type: MediumUpgradeType,
    pub timeouts: ConnectionSetupTimeouts,
    pub keep_alive: KeepAlive,
    /// The advertiser also discovers, for symmetric discovery
    pub enable_target_discovery: bool,
    pub jitter: DiscoveryJitter,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            advertising_discovery_medium: Medium::BleOnly,
            connection_medium: Medium::BtOnly,
            upgrade_medium: Medium::BtOnly,
            upgrade_type: MediumUpgradeType::Default,
            timeouts: ConnectionSetupTimeouts::first(),
            keep_alive: KeepAlive::BT,
            enable_target_discovery: false,
            jitter: DiscoveryJitter::default(),
        }
    }
}

/// One side of the connection: a device serial plus its snippet instance
#[derive(Clone)]
pub struct Peer {
    pub serial: String,
    pub snippet: Arc<dyn NearbySnippet>,
}

impl Peer {
    pub fn new(serial: impl Into<String>, snippet: Arc<dyn NearbySnippet>) -> Self {
        Self {
            serial: serial.into(),
            snippet,
        }
    }
}

/// Random ASCII-letter string, used for service ids and payload names
pub fn random_ascii(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..52u8);
            if idx < 26 {
                (b'a' + idx) as char
            } else {
                (b'A' + idx - 26) as char
            }
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Connection Driver
// ----------------------------------------------------------------------------

/// Drives one advertiser/discoverer pair through a single connection attempt
pub struct NearbyConnection {
    pub(crate) advertiser: Peer,
    pub(crate) discoverer: Peer,
    pub(crate) config: ConnectionConfig,
    service_id: String,
    phase: ConnectionPhase,
    audit_log: Vec<AuditEntry>,
    pub(crate) failure_reason: FailureReason,
    pub(crate) quality: SetupQualityInfo,

    advertiser_lifecycle: Option<Box<dyn CallbackStream>>,
    discoverer_discovery: Option<Box<dyn CallbackStream>>,
    discoverer_lifecycle: Option<Box<dyn CallbackStream>>,
    pub(crate) advertiser_payload: Option<Box<dyn CallbackStream>>,
    pub(crate) discoverer_payload: Option<Box<dyn CallbackStream>>,
    pub(crate) advertiser_endpoint_id: Option<String>,
    pub(crate) discoverer_endpoint_id: Option<String>,
}

impl NearbyConnection {
    pub fn new(advertiser: Peer, discoverer: Peer, config: ConnectionConfig) -> Self {
        Self {
            advertiser,
            discoverer,
            config,
            service_id: random_ascii(8),
            phase: ConnectionPhase::Init,
            audit_log: Vec::new(),
            failure_reason: FailureReason::Uninitialized,
            quality: SetupQualityInfo::new(),
            advertiser_lifecycle: None,
            discoverer_discovery: None,
            discoverer_lifecycle: None,
            advertiser_payload: None,
            discoverer_payload: None,
            advertiser_endpoint_id: None,
            discoverer_endpoint_id: None,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    pub fn failure_reason(&self) -> FailureReason {
        self.failure_reason
    }

    pub fn quality(&self) -> &SetupQualityInfo {
        &self.quality
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn advertiser_endpoint_id(&self) -> Option<&str> {
        self.advertiser_endpoint_id.as_deref()
    }

    pub fn discoverer_endpoint_id(&self) -> Option<&str> {
        self.discoverer_endpoint_id.as_deref()
    }

    /// Apply a phase event, recording the audit entry
    pub(crate) fn advance(&mut self, event: PhaseEvent) -> Result<(), ConnectionError> {
        let phase = std::mem::replace(&mut self.phase, ConnectionPhase::Init);
        let rollback = phase.clone();
        match phase.transition(event, &self.service_id) {
            Ok(transition) => {
                debug!(
                    "[{}] {} -> {}",
                    self.service_id, transition.audit_entry.from_phase, transition.audit_entry.to_phase
                );
                self.phase = transition.new_phase;
                self.audit_log.push(transition.audit_entry);
                Ok(())
            }
            Err(e) => {
                self.phase = rollback;
                Err(ConnectionError::phase(self.failure_reason, e.to_string()))
            }
        }
    }

    pub(crate) fn rpc_error(&self, err: RpcError) -> ConnectionError {
        ConnectionError::from_rpc(self.failure_reason, err)
    }

    pub(crate) fn ensure(&self, condition: bool, detail: impl FnOnce() -> String) -> Result<(), ConnectionError> {
        if condition {
            Ok(())
        } else {
            Err(ConnectionError::phase(self.failure_reason, detail()))
        }
    }

    /// Record a failure on the machine and return the error unchanged
    pub(crate) fn fail(&mut self, err: ConnectionError) -> ConnectionError {
        self.failure_reason = err.reason();
        if let ConnectionPhase::Failed { reason } = &mut self.phase {
            // A later check overrides an earlier failure
            *reason = err.reason();
        } else if let Err(e) = self.advance(PhaseEvent::Fail { reason: err.reason() }) {
            warn!("Could not record failure: {}", e);
        }
        err
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Run the whole setup: advertise, discover, request, accept, upgrade.
    ///
    /// On failure the failing phase is recorded before best-effort cleanup of
    /// advertising and discovery runs.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        info!(
            "Starting Nearby connection {} (adv/disc {}, conn {}, upgrade {})",
            self.service_id,
            self.config.advertising_discovery_medium,
            self.config.connection_medium,
            self.config.upgrade_medium
        );
        match self.run_setup().await {
            Ok(()) => {
                self.failure_reason = FailureReason::Success;
                self.advance(PhaseEvent::Complete)?;
                info!("Nearby connection {} established", self.service_id);
                Ok(())
            }
            Err(err) => {
                let err = self.fail(err);
                warn!("Nearby connection {} failed: {}", self.service_id, err);
                self.cleanup_after_failure().await;
                Err(err)
            }
        }
    }

    async fn run_setup(&mut self) -> Result<(), ConnectionError> {
        self.failure_reason = FailureReason::TargetStartAdvertising;
        self.start_advertising().await?;
        tokio::time::sleep(self.config.jitter.sample()).await;

        self.failure_reason = FailureReason::SourceStartDiscovery;
        self.start_discovery().await?;

        self.failure_reason = FailureReason::SourceRequestConnection;
        self.request_connection().await?;
        self.stop_discovery().await?;

        self.failure_reason = FailureReason::TargetAcceptConnection;
        self.accept_connection().await?;

        if self.config.upgrade_medium.is_high_quality() {
            self.failure_reason = FailureReason::WifiMediumUpgrade;
            self.wait_for_bandwidth_upgrade().await?;
        }

        self.advertiser
            .snippet
            .stop_advertising()
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!("[{}] Stop advertising", self.advertiser.serial);
        self.advance(PhaseEvent::StopAdvertising)
    }

    async fn start_advertising(&mut self) -> Result<(), ConnectionError> {
        let stream = self
            .advertiser
            .snippet
            .start_advertising(
                &self.advertiser.serial,
                &self.service_id,
                self.config.advertising_discovery_medium,
                self.config.upgrade_medium,
            )
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!(
            "[{}] Start advertising {}",
            self.advertiser.serial, self.config.advertising_discovery_medium
        );
        self.advertiser_lifecycle = Some(stream);
        self.advance(PhaseEvent::StartAdvertising)
    }

    async fn start_discovery(&mut self) -> Result<(), ConnectionError> {
        let medium = self.config.advertising_discovery_medium;
        info!("[{}] Start discovery {}", self.discoverer.serial, medium);
        let stream = self
            .discoverer
            .snippet
            .start_discovery(&self.service_id, medium)
            .await
            .map_err(|e| self.rpc_error(e))?;

        if self.config.enable_target_discovery {
            info!("[{}] Start discovery {}", self.advertiser.serial, medium);
            // Only the discoverer's stream is consumed
            let _ = self
                .advertiser
                .snippet
                .start_discovery(&self.service_id, medium)
                .await
                .map_err(|e| self.rpc_error(e))?;
        }
        self.advance(PhaseEvent::StartDiscovery)?;

        let event = stream
            .wait_and_get(ON_ENDPOINT_FOUND, self.config.timeouts.discovery)
            .await
            .map_err(|e| self.rpc_error(e))?;
        self.discoverer_discovery = Some(stream);
        debug!("onEndpointFound: {}", event.data);

        self.quality.discovery_latency = Some(
            event
                .duration_ns_field(&["discoveryTimeNs"])
                .map_err(|e| self.rpc_error(e))?,
        );
        let endpoint_name = event
            .str_field(&["discoveredEndpointInfo", "endpointName"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(endpoint_name == self.advertiser.serial, || {
            format!("Received an unexpected endpoint during discovery: {}", event.data)
        })?;
        let service_id = event
            .str_field(&["discoveredEndpointInfo", "serviceId"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(service_id == self.service_id, || {
            format!("Received an unexpected service id during discovery: {}", event.data)
        })?;

        let endpoint_id = event
            .str_field(&["endpointId"])
            .map_err(|e| self.rpc_error(e))?
            .to_string();
        self.advertiser_endpoint_id = Some(endpoint_id.clone());
        self.advance(PhaseEvent::EndpointFound { endpoint_id })
    }

    async fn request_connection(&mut self) -> Result<(), ConnectionError> {
        let endpoint_id = self.advertiser_endpoint_id.clone().unwrap_or_default();
        let request = ConnectionRequest {
            endpoint_name: self.discoverer.serial.clone(),
            endpoint_id,
            connection_medium: self.config.connection_medium,
            upgrade_medium: self.config.upgrade_medium,
            upgrade_type: self.config.upgrade_type,
            keep_alive: self.config.keep_alive,
        };
        info!(
            "[{}] Start connection request with keep_alive_timeout_ms {}",
            self.discoverer.serial, request.keep_alive.timeout_ms
        );
        let discoverer_lifecycle = self
            .discoverer
            .snippet
            .request_connection(&request)
            .await
            .map_err(|e| self.rpc_error(e))?;
        self.advance(PhaseEvent::RequestConnection)?;
        let timeout = self.config.timeouts.connection_init;

        let d_event = discoverer_lifecycle
            .wait_and_get(ON_CONNECTION_INITIATED, timeout)
            .await
            .map_err(|e| self.rpc_error(e))?;
        self.discoverer_lifecycle = Some(discoverer_lifecycle);
        self.quality.connection_latency = Some(
            d_event
                .duration_ns_field(&["connectionTimeNs"])
                .map_err(|e| self.rpc_error(e))?,
        );
        let incoming = d_event
            .bool_field(&["connectionInfo", "isIncomingConnection"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(!incoming, || {
            format!(
                "Received an incoming connection: {} but expected an outgoing connection",
                d_event.data
            )
        })?;
        let name = d_event
            .str_field(&["connectionInfo", "endpointName"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(name == self.advertiser.serial, || {
            format!("Received an unexpected endpoint: {}", d_event.data)
        })?;

        let a_event = match &self.advertiser_lifecycle {
            Some(stream) => stream
                .wait_and_get(ON_CONNECTION_INITIATED, timeout)
                .await
                .map_err(|e| self.rpc_error(e))?,
            None => {
                return Err(ConnectionError::phase(
                    self.failure_reason,
                    "advertiser connection lifecycle callback is missing",
                ))
            }
        };
        let incoming = a_event
            .bool_field(&["connectionInfo", "isIncomingConnection"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(incoming, || {
            format!(
                "Received an outgoing connection: {} but expected an incoming connection",
                a_event.data
            )
        })?;
        let name = a_event
            .str_field(&["connectionInfo", "endpointName"])
            .map_err(|e| self.rpc_error(e))?;
        self.ensure(name == self.discoverer.serial, || {
            format!("Received an unexpected endpoint: {}", a_event.data)
        })?;

        let endpoint_id = a_event
            .str_field(&["endpointId"])
            .map_err(|e| self.rpc_error(e))?
            .to_string();
        self.discoverer_endpoint_id = Some(endpoint_id.clone());
        self.advance(PhaseEvent::ConnectionInitiated { endpoint_id })
    }

    async fn stop_discovery(&mut self) -> Result<(), ConnectionError> {
        self.discoverer
            .snippet
            .stop_discovery()
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!("[{}] Stop discovery", self.discoverer.serial);
        if self.config.enable_target_discovery {
            self.advertiser
                .snippet
                .stop_discovery()
                .await
                .map_err(|e| self.rpc_error(e))?;
            info!("[{}] Stop discovery", self.advertiser.serial);
        }
        self.discoverer_discovery = None;
        self.advance(PhaseEvent::StopDiscovery)
    }

    async fn accept_connection(&mut self) -> Result<(), ConnectionError> {
        let discoverer_id = self.discoverer_endpoint_id.clone().unwrap_or_default();
        let advertiser_id = self.advertiser_endpoint_id.clone().unwrap_or_default();
        let timeout = self.config.timeouts.connection_result;

        let stream = self
            .advertiser
            .snippet
            .accept_connection(&discoverer_id)
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!("[{}] Start connection accept", self.advertiser.serial);
        self.advertiser_payload = Some(stream);

        let stream = self
            .discoverer
            .snippet
            .accept_connection(&advertiser_id)
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!("[{}] Start connection accept", self.discoverer.serial);
        self.discoverer_payload = Some(stream);

        for (stream, expected_id) in [
            (&self.advertiser_lifecycle, &discoverer_id),
            (&self.discoverer_lifecycle, &advertiser_id),
        ] {
            let Some(stream) = stream else {
                return Err(ConnectionError::phase(
                    self.failure_reason,
                    "connection lifecycle callback is missing",
                ));
            };
            let event = stream
                .wait_and_get(ON_CONNECTION_RESULT, timeout)
                .await
                .map_err(|e| self.rpc_error(e))?;
            let success = event.bool_field(&["isSuccess"]).map_err(|e| self.rpc_error(e))?;
            self.ensure(success, || format!("Received an unsuccessful event: {}", event.data))?;
            let endpoint_id = event.str_field(&["endpointId"]).map_err(|e| self.rpc_error(e))?;
            self.ensure(endpoint_id == expected_id, || {
                format!("Received an unexpected endpoint: {}", event.data)
            })?;
        }
        self.advance(PhaseEvent::ConnectionAccepted)
    }

    /// Poll `onBandwidthChanged` until the link reports high bandwidth quality
    async fn wait_for_bandwidth_upgrade(&mut self) -> Result<(), ConnectionError> {
        self.advance(PhaseEvent::AwaitBandwidthUpgrade)?;
        let started = tokio::time::Instant::now();
        let Some(stream) = &self.discoverer_lifecycle else {
            return Err(ConnectionError::phase(
                self.failure_reason,
                "discoverer connection lifecycle callback is missing",
            ));
        };
        loop {
            let event = stream
                .wait_and_get(ON_BANDWIDTH_CHANGED, CONNECTION_BANDWIDTH_CHANGED_TIMEOUT)
                .await
                .map_err(|e| ConnectionError::from_rpc(self.failure_reason, e))?;
            info!("[{}] medium upgrade to {}", self.discoverer.serial, event.data);
            let high_quality = event
                .bool_field(&["isHighBwQuality"])
                .map_err(|e| ConnectionError::from_rpc(self.failure_reason, e))?;
            if high_quality {
                let raw = event
                    .i64_field(&["medium"])
                    .map_err(|e| ConnectionError::from_rpc(self.failure_reason, e))?;
                let medium = ConnectionMedium::from_value(raw).ok_or_else(|| {
                    ConnectionError::phase(self.failure_reason, format!("unknown connection medium {}", raw))
                })?;
                self.quality.medium_upgrade_latency = Some(started.elapsed());
                self.quality.upgrade_medium = Some(medium);
                self.quality.medium_upgrade_expected = true;
                info!(
                    "[{}] upgraded to high quality medium: {}",
                    self.discoverer.serial, medium
                );
                return Ok(());
            }
            if started.elapsed() >= CONNECTION_BANDWIDTH_CHANGED_TIMEOUT {
                return Err(ConnectionError::phase(self.failure_reason, "medium upgrade timeout"));
            }
        }
    }

    /// Stop advertising and discovery after a failed setup; errors are logged only
    async fn cleanup_after_failure(&mut self) {
        if let Err(e) = self.discoverer.snippet.stop_discovery().await {
            warn!("[{}] stop discovery during cleanup failed: {}", self.discoverer.serial, e);
        }
        if self.config.enable_target_discovery {
            if let Err(e) = self.advertiser.snippet.stop_discovery().await {
                warn!("[{}] stop discovery during cleanup failed: {}", self.advertiser.serial, e);
            }
        }
        if let Err(e) = self.advertiser.snippet.stop_advertising().await {
            warn!("[{}] stop advertising during cleanup failed: {}", self.advertiser.serial, e);
        }
    }

    // ------------------------------------------------------------------------
    // Disconnect
    // ------------------------------------------------------------------------

    /// Disconnect from the discoverer side and wait for `onDisconnected`
    pub async fn disconnect(&mut self) -> Result<(), ConnectionError> {
        let Some(advertiser_id) = self.advertiser_endpoint_id.clone() else {
            info!("[{}] no nearby connection set up yet", self.discoverer.serial);
            return Ok(());
        };
        self.discoverer
            .snippet
            .disconnect_from_endpoint(&advertiser_id)
            .await
            .map_err(|e| self.rpc_error(e))?;
        info!(
            "[{}] Start disconnecting from endpoint: {}",
            self.discoverer.serial, advertiser_id
        );

        if let Some(stream) = &self.discoverer_lifecycle {
            let event = stream
                .wait_and_get(ON_DISCONNECTED, DISCONNECTION_TIMEOUT)
                .await
                .map_err(|e| self.rpc_error(e))?;
            let endpoint_id = event.str_field(&["endpointId"]).map_err(|e| self.rpc_error(e))?;
            self.ensure(endpoint_id == advertiser_id, || {
                format!("Receive unexpected event on disconnect: {}", event.data)
            })?;
        }
        info!("[{}] disconnected with endpoint: {}", self.discoverer.serial, advertiser_id);
        if matches!(self.phase, ConnectionPhase::Connected | ConnectionPhase::Failed { .. }) {
            self.advance(PhaseEvent::Disconnect)?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
