//! The client replication engine.
//!
//! Owns the reliable transport, the subscribed document replicas, the two
//! inbound change streams and the outbound mirror. The host drives it: call
//! [`Client::receive`] once per frame to pump transports and timers, and
//! [`Client::interpolate`] once per render frame to smooth fast-channel
//! samples into the visible transform fields.

use std::collections::HashSet;

use json_patch::PatchOperation;
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use scenesync_shared::{
    frame, now_ms, patch, to_wire_value, FastPatchMessage, FullMessage, PatchMessage, PingMessage,
    RtcCandidateOutMessage, RtcOfferMessage, ServerMessage, SubMessage, SyncMessage, Timer,
    UnsubMessage,
};

use crate::client_config::ClientConfig;
use crate::connection::{BandwidthMonitor, ChunkReceiver, Stats, TimeManager};
use crate::events::{ClientEvent, Events};
use crate::rtc::{Negotiator, PeerFactory, SessionDescription, Signal};
use crate::transport::{ReliableTransport, TransportEvent};
use crate::world::document::{DocumentMut, DocumentState, DocumentStore};
use crate::world::motion::MotionState;
use crate::world::{fast, interpolate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
}

/// Jittered reconnection delay in milliseconds.
pub fn reconnect_delay<R: Rng>(rng: &mut R) -> f64 {
    500.0 + rng.gen_range(0.0..500.0)
}

pub struct Client {
    config: ClientConfig,
    transport: Box<dyn ReliableTransport>,
    peer_factory: Option<Box<dyn PeerFactory>>,
    state: ConnectionState,
    documents: DocumentStore,
    /// Names the host has subscribed. Survives `clear()` so subscriptions
    /// are re-issued after a reconnect.
    subscriptions: HashSet<String>,
    chunks: ChunkReceiver,
    time: TimeManager,
    bandwidth: BandwidthMonitor,
    rtc: Option<Negotiator>,
    events: Events,
    tick_timer: Timer,
    stats_timer: Timer,
    ping_timer: Timer,
    reconnect_at: Option<f64>,
    last_heard: f64,
    last_interpolate: f64,
    destroyed: bool,
}

impl Client {
    pub fn new(config: ClientConfig, transport: Box<dyn ReliableTransport>) -> Self {
        let documents = DocumentStore::new(config.allow_sync, config.excluded_fields.clone());
        let tick_timer = Timer::new(config.tick_interval);
        let stats_timer = Timer::new(config.stats_interval);
        let ping_timer = Timer::new(config.ping_interval);
        let rtc = config
            .allow_rtc
            .then(|| Negotiator::new(config.rtc.clone()));
        Self {
            config,
            transport,
            peer_factory: None,
            state: ConnectionState::Idle,
            documents,
            subscriptions: HashSet::new(),
            chunks: ChunkReceiver::new(),
            time: TimeManager::new(),
            bandwidth: BandwidthMonitor::new(),
            rtc,
            events: Events::default(),
            tick_timer,
            stats_timer,
            ping_timer,
            reconnect_at: None,
            last_heard: 0.0,
            last_interpolate: 0.0,
            destroyed: false,
        }
    }

    /// Attach the peer-connection factory backing the unreliable channel.
    pub fn with_peer_factory(mut self, factory: Box<dyn PeerFactory>) -> Self {
        self.peer_factory = Some(factory);
        self
    }

    // Lifecycle

    pub fn connect(&mut self) {
        if self.destroyed || self.state != ConnectionState::Idle {
            return;
        }
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        let url = self.config.url.clone();
        self.transport.connect(&url);
    }

    /// Intentional disconnect: no reconnect is scheduled.
    pub fn disconnect(&mut self) {
        self.reconnect_at = None;
        if self.state == ConnectionState::Idle {
            return;
        }
        self.transport.close();
        self.state = ConnectionState::Idle;
        self.clear();
        self.events.push(ClientEvent::Disconnect);
    }

    pub fn destroy(&mut self) {
        self.disconnect();
        self.destroyed = true;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    // Subscriptions

    /// Create an empty local replica and ask the server for the document.
    pub fn subscribe(&mut self, name: &str) {
        self.subscriptions.insert(name.to_owned());
        self.documents.insert_empty(name);
        self.transmit(&SubMessage::new(name));
    }

    pub fn unsubscribe(&mut self, name: &str) {
        self.subscriptions.remove(name);
        self.documents.remove(name);
        self.transmit(&UnsubMessage::new(name));
    }

    // Messaging

    /// Send an app-level message on the reliable channel. Silently ignored
    /// while disconnected.
    pub fn send<T: Serialize>(&mut self, message: &T) {
        self.transmit(message);
    }

    /// Send an app-level message on the unreliable channel, if it is open.
    pub fn send_rtc<T: Serialize>(&mut self, message: &T) {
        let Some(rtc) = self.rtc.as_mut() else {
            return;
        };
        if !rtc.channel_open() {
            return;
        }
        let value = match to_wire_value(message) {
            Ok(value) => value,
            Err(err) => {
                warn!("outbound message rejected: {err}");
                return;
            }
        };
        match frame::encode(&value) {
            Ok(bytes) => {
                if rtc.send(&bytes).is_ok() {
                    self.bandwidth.record_send_rtc(bytes.len());
                }
            }
            Err(err) => warn!("frame encode failed: {err}"),
        }
    }

    // Documents

    pub fn document(&self, name: &str) -> Option<&Value> {
        self.documents.document(name)
    }

    /// The document plus its replication state (snapshot time, `le` flag,
    /// fast-channel cursor, motion side-table).
    pub fn document_state(&self, name: &str) -> Option<&DocumentState> {
        self.documents.state(name)
    }

    /// Mutable handle whose observable writes are mirrored to the server on
    /// the next tick.
    pub fn document_mut(&mut self, name: &str) -> Option<DocumentMut<'_>> {
        self.documents.document_mut(name)
    }

    pub fn entity_motion(&self, document: &str, entity: &str) -> Option<&MotionState> {
        self.documents.state(document)?.motion.get(entity)
    }

    /// Wall time of the last inbound change to an entity field.
    pub fn changed_at(&self, document: &str, entity: &str, field: &str) -> Option<f64> {
        self.entity_motion(document, entity)?
            .changed
            .get(field)
            .copied()
    }

    pub fn stats(&self) -> Stats {
        self.bandwidth.snapshot()
    }

    // Host-driven pumping

    /// Pump transports and timers, returning the events of this pass.
    pub fn receive(&mut self) -> Events {
        let now = now_ms();
        self.pump_transport(now);
        self.pump_rtc(now);
        self.run_timers(now);
        std::mem::take(&mut self.events)
    }

    /// Smooth fast-channel samples into the visible transform fields.
    pub fn interpolate(&mut self) {
        let now = now_ms();
        let dt = now - self.last_interpolate;
        self.last_interpolate = now;
        if !interpolate::steppable(dt) {
            return;
        }
        for state in self.documents.states_mut() {
            interpolate::step(state, now);
        }
    }

    fn pump_transport(&mut self, now: f64) {
        while let Some(event) = self.transport.poll() {
            match event {
                TransportEvent::Opened => self.on_open(now),
                TransportEvent::Frame(payload) => {
                    self.bandwidth.record_rec(payload.len());
                    self.last_heard = now;
                    self.process_payload(&payload, now);
                }
                TransportEvent::Closed => self.on_close(now),
                TransportEvent::Error(detail) => {
                    warn!("transport error: {detail}");
                    self.on_close(now);
                }
            }
        }
    }

    fn pump_rtc(&mut self, now: f64) {
        let output = match self.rtc.as_mut() {
            Some(rtc) => rtc.advance(now),
            None => return,
        };
        for signal in output.signals {
            match signal {
                Signal::Offer(desc) => self.transmit(&RtcOfferMessage::new(&desc.kind, &desc.sdp)),
                Signal::Candidate(candidate) => {
                    self.transmit(&RtcCandidateOutMessage::new(candidate))
                }
            }
        }
        for datagram in output.datagrams {
            self.bandwidth.record_rec_rtc(datagram.len());
            self.last_heard = now;
            self.process_payload(&datagram, now);
        }
    }

    fn run_timers(&mut self, now: f64) {
        if self.tick_timer.ringing() {
            self.tick_timer.reset();
            self.drain_outbound(now);
        }
        if self.stats_timer.ringing() {
            self.stats_timer.reset();
            self.bandwidth.rollover();
            self.chunks
                .evict_stale(now, self.config.chunk_timeout.as_secs_f64() * 1000.0);
        }
        if self.ping_timer.ringing() {
            self.ping_timer.reset();
            if self.state == ConnectionState::Connected {
                self.transmit(&PingMessage::new(now));
            }
        }
        if self.state == ConnectionState::Connected && !self.config.timeout.is_zero() {
            let timeout_ms = self.config.timeout.as_secs_f64() * 1000.0;
            if now - self.last_heard > timeout_ms {
                warn!("connection silent for {:.0} ms, dropping", now - self.last_heard);
                self.transport.close();
                self.on_close(now);
            }
        }
        if let Some(at) = self.reconnect_at {
            if now >= at && self.state == ConnectionState::Idle && !self.destroyed {
                self.reconnect_at = None;
                self.connect();
            }
        }
    }

    // Transport lifecycle

    fn on_open(&mut self, now: f64) {
        info!("connected to {}", self.config.url);
        self.state = ConnectionState::Connected;
        self.last_heard = now;
        self.events.push(ClientEvent::Connect);
        let names: Vec<String> = self.subscriptions.iter().cloned().collect();
        for name in names {
            if !self.documents.contains(&name) {
                self.documents.insert_empty(&name);
            }
            self.transmit(&SubMessage::new(&name));
        }
        if let (Some(rtc), Some(factory)) = (self.rtc.as_mut(), self.peer_factory.as_mut()) {
            if let Err(err) = rtc.open(factory.as_mut(), now) {
                warn!("unreliable channel setup failed: {err}");
            }
        }
    }

    fn on_close(&mut self, now: f64) {
        if self.state == ConnectionState::Idle {
            return;
        }
        self.state = ConnectionState::Idle;
        self.clear();
        self.events.push(ClientEvent::Disconnect);
        if self.config.auto_reconnect && !self.destroyed {
            let delay = reconnect_delay(&mut rand::thread_rng());
            self.reconnect_at = Some(now + delay);
        }
    }

    fn clear(&mut self) {
        self.bandwidth.clear();
        self.documents.clear();
        self.chunks.clear();
        self.time.clear();
        if let Some(rtc) = self.rtc.as_mut() {
            rtc.close();
        }
    }

    // Inbound dispatch

    fn process_payload(&mut self, payload: &[u8], now: f64) {
        let value = match frame::decode(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!("dropping undecodable frame: {err}");
                return;
            }
        };
        if self.config.debug {
            debug!("inbound frame: {value}");
        }
        let message = match ServerMessage::parse(value) {
            Ok(message) => message,
            Err(err) => {
                warn!("dropping malformed frame: {err}");
                return;
            }
        };
        match message {
            ServerMessage::Full(full) => self.on_full(full, now),
            ServerMessage::Patch(patch_message) => self.on_patch(patch_message),
            ServerMessage::FastPatch(fpatch) => self.on_fast_patch(fpatch, now),
            ServerMessage::Chunk(chunk) => {
                if let Some(assembled) = self.chunks.receive(chunk, now) {
                    self.process_payload(&assembled, now);
                }
            }
            ServerMessage::Pong(pong) => {
                let peng = self.time.handle_pong(&pong, now);
                self.bandwidth.set_ping(self.time.ping, self.time.stdiff);
                self.transmit(&peng);
            }
            ServerMessage::RtcAnswer(answer) => {
                if let Some(rtc) = self.rtc.as_mut() {
                    let desc = SessionDescription {
                        kind: answer.kind,
                        sdp: answer.sdp,
                    };
                    if let Err(err) = rtc.handle_answer(&desc) {
                        warn!("rtc answer rejected: {err}");
                    }
                }
            }
            ServerMessage::RtcCandidate(candidate) => {
                if let Some(rtc) = self.rtc.as_mut() {
                    rtc.handle_candidate(candidate.candidate);
                }
            }
            ServerMessage::RtcOffer(_) => {
                warn!("server-initiated rtc offers are not supported");
            }
            ServerMessage::Other(value) => self.events.push(ClientEvent::Message(value)),
        }
    }

    fn on_full(&mut self, message: FullMessage, now: f64) {
        let FullMessage {
            n: name,
            t,
            le,
            doc,
            fdata,
        } = message;
        self.documents.suppress = true;
        self.documents
            .insert(&name, DocumentState::from_snapshot(doc, t, le));
        if let Some(fdata) = fdata {
            if let Some(state) = self.documents.state_mut(&name) {
                fast::apply(state, fdata, now);
            }
        }
        self.documents.suppress = false;
        self.events.push(ClientEvent::Change { name, ops: None });
    }

    fn on_patch(&mut self, message: PatchMessage) {
        if !self.documents.contains(&message.n) {
            warn!("patch for unknown document {:?}", message.n);
            return;
        }
        self.documents.suppress = true;
        let mut applied = Vec::new();
        if let Some(state) = self.documents.state_mut(&message.n) {
            for wire_op in &message.doc {
                match patch::to_standard(wire_op) {
                    Ok(op) => match patch::apply(&mut state.doc, op.clone()) {
                        Ok(()) => applied.push(op),
                        Err(err) => warn!("patch op rejected on {:?}: {err}", message.n),
                    },
                    Err(err) => warn!("untranslatable patch op on {:?}: {err}", message.n),
                }
            }
        }
        self.documents.suppress = false;
        self.events.push(ClientEvent::Change {
            name: message.n,
            ops: Some(applied),
        });
    }

    fn on_fast_patch(&mut self, message: FastPatchMessage, now: f64) {
        let Some(state) = self.documents.state_mut(&message.n) else {
            warn!("fast update for unknown document {:?}", message.n);
            return;
        };
        match state.last_update_id {
            Some(last) if message.u < last => {
                warn!(
                    "dropping stale fast update {} for {:?} (cursor {last})",
                    message.u, message.n
                );
                return;
            }
            Some(last) if message.u > last + 1 => {
                info!("Lost {} updates on {:?}", message.u - last - 1, message.n);
            }
            _ => {}
        }
        state.last_update_id = Some(message.u);
        fast::apply(state, message.fdata, now);
    }

    // Outbound

    fn drain_outbound(&mut self, now: f64) {
        if self.state != ConnectionState::Connected {
            return;
        }
        for (name, ops) in self.documents.drain_changes() {
            let std_ops: Vec<PatchOperation> = ops
                .iter()
                .filter_map(|op| patch::to_standard(op).ok())
                .collect();
            self.transmit(&SyncMessage::new(&name, now, ops));
            self.events.push(ClientEvent::Change {
                name,
                ops: Some(std_ops),
            });
        }
    }

    fn transmit<T: Serialize>(&mut self, message: &T) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let value = match to_wire_value(message) {
            Ok(value) => value,
            Err(err) => {
                warn!("outbound message rejected: {err}");
                return;
            }
        };
        match frame::encode(&value) {
            Ok(bytes) => {
                if self.transport.send(&bytes).is_ok() {
                    self.bandwidth.record_send(bytes.len());
                } else {
                    warn!("reliable send failed");
                }
            }
            Err(err) => warn!("frame encode failed: {err}"),
        }
    }
}
