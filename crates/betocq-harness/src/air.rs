//! Shared radio medium between mock snippets
//!
//! `MockAir` plays the part of the Nearby stack on both phones. Advertising
//! registers an endpoint, discovery finds it, a request opens a link and both
//! accepts complete it. Every event the real stack would raise is pushed onto
//! the callback stream the engine is waiting on.

use std::sync::{Arc, Mutex};

use betocq_core::{
    ConnectionMedium, ConnectionRequest, Medium, PayloadType, RpcError, SnippetSlot,
};
use serde_json::json;
use tracing::{debug, info};

use crate::fault::{Fault, FaultPlan};
use crate::stream::{lock, CallLog, MockCallbackStream};

const ENDPOINT_ID_LEN: usize = 4;
const ENDPOINT_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Identity of one mock snippet instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub serial: String,
    pub endpoint_id: String,
    pub slot: SnippetSlot,
}

/// Link behaviour once a connection is up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkProfile {
    /// Throughput every transfer reports, KB/s
    pub throughput_kbps: f64,
    /// Medium reported on upgrade instead of the one implied by the request
    pub negotiated_medium: Option<ConnectionMedium>,
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self {
            throughput_kbps: 40_960.0,
            negotiated_medium: None,
        }
    }
}

/// Connection medium a high-quality upgrade lands on
pub fn upgraded_medium(upgrade: Medium) -> ConnectionMedium {
    match upgrade {
        Medium::UpgradeToWifiDirect | Medium::UpgradeToAllWifi => ConnectionMedium::WifiDirect,
        Medium::UpgradeToWifiHotspot => ConnectionMedium::WifiHotspot,
        Medium::WifiLanOnly => ConnectionMedium::WifiLan,
        Medium::WifiAwareOnly => ConnectionMedium::WifiAware,
        Medium::UpgradeToWebRtc => ConnectionMedium::WebRtc,
        Medium::BleOnly => ConnectionMedium::Ble,
        Medium::BleL2capOnly => ConnectionMedium::BleL2cap,
        Medium::BtOnly | Medium::Auto => ConnectionMedium::Bluetooth,
    }
}

// ----------------------------------------------------------------------------
// Air State
// ----------------------------------------------------------------------------

struct Advertisement {
    owner: Station,
    service_id: String,
    lifecycle: Arc<MockCallbackStream>,
}

struct Link {
    advertiser: Station,
    discoverer: Station,
    advertiser_lifecycle: Arc<MockCallbackStream>,
    discoverer_lifecycle: Arc<MockCallbackStream>,
    advertiser_payload: Option<Arc<MockCallbackStream>>,
    discoverer_payload: Option<Arc<MockCallbackStream>>,
    upgrade_medium: Medium,
    established: bool,
}

impl Link {
    /// `(own payload stream, peer station, peer payload stream)` seen from `me`
    fn sides(&self, me: &Station) -> Option<(Option<&Arc<MockCallbackStream>>, &Station, Option<&Arc<MockCallbackStream>>)> {
        if self.advertiser.endpoint_id == me.endpoint_id {
            Some((self.advertiser_payload.as_ref(), &self.discoverer, self.discoverer_payload.as_ref()))
        } else if self.discoverer.endpoint_id == me.endpoint_id {
            Some((self.discoverer_payload.as_ref(), &self.advertiser, self.advertiser_payload.as_ref()))
        } else {
            None
        }
    }

    fn involves(&self, station: &Station) -> bool {
        self.advertiser.endpoint_id == station.endpoint_id || self.discoverer.endpoint_id == station.endpoint_id
    }
}

#[derive(Default)]
struct AirState {
    advertisements: Vec<Advertisement>,
    links: Vec<Link>,
    next_callback: u64,
    next_payload_id: i64,
}

// ----------------------------------------------------------------------------
// Mock Air
// ----------------------------------------------------------------------------

pub struct MockAir {
    state: Mutex<AirState>,
    faults: Mutex<FaultPlan>,
    profile: Mutex<LinkProfile>,
    rng: Mutex<fastrand::Rng>,
    transport: Mutex<Option<String>>,
    log: CallLog,
}

impl MockAir {
    pub fn new(faults: FaultPlan) -> Arc<Self> {
        Self::with_rng(faults, fastrand::Rng::new())
    }

    /// Deterministic endpoint ids and latencies
    pub fn seeded(faults: FaultPlan, seed: u64) -> Arc<Self> {
        Self::with_rng(faults, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(faults: FaultPlan, mut rng: fastrand::Rng) -> Arc<Self> {
        let state = AirState {
            next_payload_id: rng.i64(1_000_000..9_000_000),
            ..AirState::default()
        };
        Arc::new(Self {
            state: Mutex::new(state),
            faults: Mutex::new(faults),
            profile: Mutex::new(LinkProfile::default()),
            rng: Mutex::new(rng),
            transport: Mutex::new(None),
            log: CallLog::new(),
        })
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        *lock(&self.faults) = faults;
    }

    pub fn profile(&self) -> LinkProfile {
        *lock(&self.profile)
    }

    pub fn set_profile(&self, profile: LinkProfile) {
        *lock(&self.profile) = profile;
    }

    /// Drop the snippet connections of every station. Nearby calls and
    /// Wi-Fi state changes fail from now on; cached device facts still answer.
    pub fn break_transport(&self, reason: impl Into<String>) {
        *lock(&self.transport) = Some(reason.into());
    }

    pub fn check_transport(&self) -> Result<(), RpcError> {
        match lock(&self.transport).as_ref() {
            Some(reason) => Err(RpcError::Transport { reason: reason.clone() }),
            None => Ok(()),
        }
    }

    /// Number of links currently open
    pub fn open_links(&self) -> usize {
        lock(&self.state).links.len()
    }

    pub fn is_advertising(&self, station: &Station) -> bool {
        lock(&self.state)
            .advertisements
            .iter()
            .any(|a| a.owner.endpoint_id == station.endpoint_id)
    }

    pub fn new_endpoint_id(&self) -> String {
        let mut rng = lock(&self.rng);
        (0..ENDPOINT_ID_LEN)
            .map(|_| ENDPOINT_ID_ALPHABET[rng.usize(..ENDPOINT_ID_ALPHABET.len())] as char)
            .collect()
    }

    /// Faults are only injected on the primary snippets
    fn inject(&self, station: &Station, fault: Fault) -> bool {
        station.slot == SnippetSlot::Primary && lock(&self.faults).trigger(fault)
    }

    fn latency_ns(&self, min_ms: u64, max_ms: u64) -> i64 {
        let ms = lock(&self.rng).u64(min_ms..max_ms);
        (ms * 1_000_000) as i64
    }

    fn new_stream(&self, state: &mut AirState, kind: &str) -> Arc<MockCallbackStream> {
        state.next_callback += 1;
        MockCallbackStream::new(format!("{}-{}", kind, state.next_callback), self.log.clone())
    }

    fn remote(method: &str, message: impl Into<String>) -> RpcError {
        RpcError::Remote {
            method: method.to_string(),
            message: message.into(),
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    pub fn start_advertising(
        &self,
        owner: &Station,
        endpoint_name: &str,
        service_id: &str,
    ) -> Result<Arc<MockCallbackStream>, RpcError> {
        self.log.record(format!("{}:startAdvertising", owner.serial));
        if self.inject(owner, Fault::AdvertisingRejected) {
            return Err(Self::remote("startAdvertising", "STATUS_RADIO_ERROR"));
        }
        let mut state = lock(&self.state);
        let lifecycle = self.new_stream(&mut state, "adv");
        state.advertisements.retain(|a| a.owner.endpoint_id != owner.endpoint_id);
        state.advertisements.push(Advertisement {
            owner: Station {
                serial: endpoint_name.to_string(),
                ..owner.clone()
            },
            service_id: service_id.to_string(),
            lifecycle: lifecycle.clone(),
        });
        debug!("[{}] advertising {} as {}", owner.serial, service_id, owner.endpoint_id);
        Ok(lifecycle)
    }

    /// Start scanning; an advertisement already on the air is found at once
    pub fn start_discovery(&self, scanner: &Station, service_id: &str) -> Arc<MockCallbackStream> {
        self.log.record(format!("{}:startDiscovery", scanner.serial));
        let hide = self.inject(scanner, Fault::NoEndpointFound);
        let discovery_ns = self.latency_ns(200, 3_000);
        let mut state = lock(&self.state);
        let stream = self.new_stream(&mut state, "disc");
        if hide {
            info!("[{}] advertisement of {} withheld", scanner.serial, service_id);
            return stream;
        }
        // A device never discovers its own advertisement
        let found = state
            .advertisements
            .iter()
            .find(|a| a.service_id == service_id && a.owner.serial != scanner.serial);
        if let Some(ad) = found {
            stream.push(
                "onEndpointFound",
                json!({
                    "endpointId": ad.owner.endpoint_id,
                    "discoveryTimeNs": discovery_ns,
                    "discoveredEndpointInfo": {
                        "endpointName": ad.owner.serial,
                        "serviceId": ad.service_id,
                    }
                }),
            );
        }
        stream
    }

    pub fn stop_advertising(&self, owner: &Station) {
        self.log.record(format!("{}:stopAdvertising", owner.serial));
        lock(&self.state)
            .advertisements
            .retain(|a| a.owner.endpoint_id != owner.endpoint_id);
    }

    pub fn stop_discovery(&self, scanner: &Station) {
        self.log.record(format!("{}:stopDiscovery", scanner.serial));
    }

    pub fn request_connection(
        &self,
        requester: &Station,
        request: &ConnectionRequest,
    ) -> Result<Arc<MockCallbackStream>, RpcError> {
        self.log.record(format!("{}:requestConnection", requester.serial));
        let flipped = self.inject(requester, Fault::WrongDirection);
        let connection_ns = self.latency_ns(300, 2_000);
        let mut state = lock(&self.state);
        let (advertiser, advertiser_lifecycle) = state
            .advertisements
            .iter()
            .find(|a| a.owner.endpoint_id == request.endpoint_id)
            .map(|a| (a.owner.clone(), a.lifecycle.clone()))
            .ok_or_else(|| {
                Self::remote(
                    "requestConnection",
                    format!("STATUS_ENDPOINT_UNKNOWN: {}", request.endpoint_id),
                )
            })?;
        let discoverer_lifecycle = self.new_stream(&mut state, "conn");

        discoverer_lifecycle.push(
            "onConnectionInitiated",
            json!({
                "endpointId": advertiser.endpoint_id,
                "connectionTimeNs": connection_ns,
                "connectionInfo": {
                    "isIncomingConnection": flipped,
                    "endpointName": advertiser.serial,
                }
            }),
        );
        advertiser_lifecycle.push(
            "onConnectionInitiated",
            json!({
                "endpointId": requester.endpoint_id,
                "connectionInfo": {
                    "isIncomingConnection": true,
                    "endpointName": request.endpoint_name,
                }
            }),
        );

        state.links.push(Link {
            advertiser,
            discoverer: Station {
                serial: request.endpoint_name.clone(),
                ..requester.clone()
            },
            advertiser_lifecycle,
            discoverer_lifecycle: discoverer_lifecycle.clone(),
            advertiser_payload: None,
            discoverer_payload: None,
            upgrade_medium: request.upgrade_medium,
            established: false,
        });
        Ok(discoverer_lifecycle)
    }

    /// Accept the link with `peer_endpoint_id`; once both sides accepted the
    /// result and bandwidth events go out
    pub fn accept_connection(
        &self,
        acceptor: &Station,
        peer_endpoint_id: &str,
    ) -> Result<Arc<MockCallbackStream>, RpcError> {
        self.log.record(format!("{}:acceptConnection", acceptor.serial));
        let profile = self.profile();

        let mut state = lock(&self.state);
        let payload = self.new_stream(&mut state, "payload");
        let link = state
            .links
            .iter_mut()
            .find(|l| {
                (l.advertiser.endpoint_id == acceptor.endpoint_id && l.discoverer.endpoint_id == peer_endpoint_id)
                    || (l.discoverer.endpoint_id == acceptor.endpoint_id
                        && l.advertiser.endpoint_id == peer_endpoint_id)
            })
            .ok_or_else(|| {
                Self::remote(
                    "acceptConnection",
                    format!("STATUS_ENDPOINT_UNKNOWN: {}", peer_endpoint_id),
                )
            })?;
        if link.advertiser.endpoint_id == acceptor.endpoint_id {
            link.advertiser_payload = Some(payload.clone());
        } else {
            link.discoverer_payload = Some(payload.clone());
        }
        if link.advertiser_payload.is_none() || link.discoverer_payload.is_none() {
            return Ok(payload);
        }

        let success = !self.inject(acceptor, Fault::UnsuccessfulResult);
        link.established = success;
        link.advertiser_lifecycle.push(
            "onConnectionResult",
            json!({"endpointId": link.discoverer.endpoint_id, "isSuccess": success}),
        );
        link.discoverer_lifecycle.push(
            "onConnectionResult",
            json!({"endpointId": link.advertiser.endpoint_id, "isSuccess": success}),
        );

        if success && link.upgrade_medium.is_high_quality() {
            // Links come up on Bluetooth first
            link.discoverer_lifecycle.push(
                "onBandwidthChanged",
                json!({"isHighBwQuality": false, "medium": ConnectionMedium::Bluetooth.value()}),
            );
            if !self.inject(acceptor, Fault::UpgradeNeverHighQuality) {
                let medium = profile
                    .negotiated_medium
                    .unwrap_or_else(|| upgraded_medium(link.upgrade_medium));
                link.discoverer_lifecycle.push(
                    "onBandwidthChanged",
                    json!({"isHighBwQuality": true, "medium": medium.value()}),
                );
            }
        }
        Ok(payload)
    }

    pub fn disconnect(&self, caller: &Station, peer_endpoint_id: &str) -> Result<(), RpcError> {
        self.log.record(format!("{}:disconnectFromEndpoint", caller.serial));
        let mut state = lock(&self.state);
        let idx = state
            .links
            .iter()
            .position(|l| {
                l.involves(caller)
                    && (l.advertiser.endpoint_id == peer_endpoint_id || l.discoverer.endpoint_id == peer_endpoint_id)
            })
            .ok_or_else(|| {
                Self::remote(
                    "disconnectFromEndpoint",
                    format!("not connected to {}", peer_endpoint_id),
                )
            })?;
        let link = state.links.remove(idx);
        link.discoverer_lifecycle.push(
            "onDisconnected",
            json!({"endpointId": link.advertiser.endpoint_id}),
        );
        link.advertiser_lifecycle.push(
            "onDisconnected",
            json!({"endpointId": link.discoverer.endpoint_id}),
        );
        Ok(())
    }

    pub fn stop_all_endpoints(&self, station: &Station) {
        self.log.record(format!("{}:stopAllEndpoints", station.serial));
        let mut state = lock(&self.state);
        state.links.retain(|l| !l.involves(station));
        state.advertisements.retain(|a| a.owner.endpoint_id != station.endpoint_id);
    }

    // ------------------------------------------------------------------------
    // Transfer
    // ------------------------------------------------------------------------

    /// Deliver `count` payloads and return the last payload id
    pub fn send_payloads(
        &self,
        sender: &Station,
        peer_endpoint_id: &str,
        size_kb: u64,
        payload_type: PayloadType,
        count: u32,
    ) -> Result<i64, RpcError> {
        const METHOD: &str = "sendMultiplePayloadWithType";
        self.log.record(format!("{}:{}", sender.serial, METHOD));
        let failed = self.inject(sender, Fault::TransferFailure);
        let zero_time = self.inject(sender, Fault::ZeroTransferTime);
        let kbps = self.profile().throughput_kbps.max(1.0);

        let mut state = lock(&self.state);
        let first_id = state.next_payload_id;
        state.next_payload_id += i64::from(count);

        let link = state
            .links
            .iter()
            .find(|l| l.established && l.involves(sender))
            .ok_or_else(|| Self::remote(METHOD, "STATUS_NOT_CONNECTED_TO_ENDPOINT"))?;
        let Some((Some(tx), peer, Some(rx))) = link.sides(sender) else {
            return Err(Self::remote(METHOD, "STATUS_NOT_CONNECTED_TO_ENDPOINT"));
        };
        if peer.endpoint_id != peer_endpoint_id {
            return Err(Self::remote(
                METHOD,
                format!("STATUS_ENDPOINT_UNKNOWN: {}", peer_endpoint_id),
            ));
        }

        for i in 0..count {
            let id = first_id + i64::from(i);
            let elapsed_ns = if zero_time {
                0
            } else {
                (size_kb as f64 * f64::from(i + 1) / kbps * 1e9).round() as i64
            };
            rx.push(
                "onPayloadReceived",
                json!({
                    "endpointId": sender.endpoint_id,
                    "payload": {"id": id.to_string(), "type": payload_type.value()}
                }),
            );
            rx.push(
                "onPayloadTransferUpdate",
                json!({
                    "endpointId": sender.endpoint_id,
                    "update": {"payloadId": id.to_string(), "isSuccess": !failed}
                }),
            );
            tx.push(
                "onPayloadTransferUpdate",
                json!({
                    "endpointId": peer.endpoint_id,
                    "transferTimeNs": elapsed_ns,
                    "update": {"payloadId": id.to_string(), "isSuccess": !failed}
                }),
            );
        }
        Ok(first_id + i64::from(count) - 1)
    }
}
