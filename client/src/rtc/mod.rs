//! The unreliable-channel negotiator.
//!
//! When enabled, the client opens a peer-to-peer unreliable channel to the
//! server next to the reliable stream: ordered delivery with a retransmit
//! limit of one, negotiated with an offer/answer/candidate handshake sent
//! over the reliable channel. The ICE/DTLS plumbing itself lives behind the
//! [`PeerConnection`] trait; embedders supply an implementation the same way
//! they supply the reliable transport.
//!
//! Handshake sequence:
//! 1. create the peer connection and local channel, create an offer with
//!    the restart flag, set it as the local description;
//! 2. give candidate gathering a moment to start, then transmit the offer;
//! 3. apply the answer as the remote description and flush any candidates
//!    that arrived early;
//! 4. transmit local candidates once the offer is out, flushing the
//!    remainder when gathering completes;
//! 5. if ICE reports failure and the channel still is not open after the
//!    retry window, re-offer with restart.

use std::time::Duration;

use log::{info, warn};
use serde_json::Value;

use crate::error::RtcError;

/// Tuning for the peer connection and its handshake.
#[derive(Clone, Debug)]
pub struct RtcConfig {
    /// Public discovery (STUN) servers handed to the peer connection.
    pub ice_servers: Vec<String>,
    /// Channel ordering. The fast channel relies on ordered delivery.
    pub ordered: bool,
    /// Bounded retransmit: one retry, then the datagram is dropped.
    pub max_retransmits: u16,
    /// Delay between creating the offer and transmitting it, giving
    /// candidate gathering time to start.
    pub gather_delay: Duration,
    /// How long to wait before re-offering after an ICE failure.
    pub retry_interval: Duration,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_owned(),
                "stun:stun1.l.google.com:19302".to_owned(),
                "stun:stun2.l.google.com:19302".to_owned(),
            ],
            ordered: true,
            max_retransmits: 1,
            gather_delay: Duration::from_millis(100),
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// A session description leg of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: String,
    pub sdp: String,
}

/// Coarse ICE connection state as reported by the peer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Failed,
    Closed,
}

/// Notifications surfaced by a peer-connection poll.
#[derive(Debug)]
pub enum PeerEvent {
    /// A local ICE candidate became available.
    LocalCandidate(Value),
    /// Local candidate gathering finished.
    GatheringComplete,
    /// The ICE connection state changed.
    StateChange(PeerState),
    /// The local unreliable channel opened.
    ChannelOpen,
    /// The local unreliable channel closed.
    ChannelClosed,
    /// One inbound datagram.
    Datagram(Vec<u8>),
}

#[derive(Debug)]
pub struct RtcSendError;

/// The peer-connection seam. Implementations wrap a WebRTC stack (or a test
/// double) and surface its callbacks through [`PeerConnection::poll_event`].
pub trait PeerConnection {
    fn create_offer(&mut self, ice_restart: bool) -> Result<SessionDescription, RtcError>;
    fn set_local_description(&mut self, desc: &SessionDescription) -> Result<(), RtcError>;
    fn set_remote_description(&mut self, desc: &SessionDescription) -> Result<(), RtcError>;
    fn add_ice_candidate(&mut self, candidate: &Value) -> Result<(), RtcError>;
    fn poll_event(&mut self) -> Option<PeerEvent>;
    fn send(&mut self, payload: &[u8]) -> Result<(), RtcSendError>;
    fn close(&mut self);
}

/// Creates peer connections on demand; handed to the client at construction.
pub trait PeerFactory {
    fn create(&mut self, config: &RtcConfig) -> Result<Box<dyn PeerConnection>, RtcError>;
}

/// A signaling message bound for the reliable channel.
#[derive(Debug)]
pub enum Signal {
    Offer(SessionDescription),
    Candidate(Value),
}

/// Everything one negotiator pass produced.
#[derive(Debug, Default)]
pub struct RtcOutput {
    pub signals: Vec<Signal>,
    pub datagrams: Vec<Vec<u8>>,
}

pub struct Negotiator {
    config: RtcConfig,
    conn: Option<Box<dyn PeerConnection>>,
    offer: Option<SessionDescription>,
    offer_sent: bool,
    remote_set: bool,
    channel_open: bool,
    state: PeerState,
    pending_local: Vec<Value>,
    pending_remote: Vec<Value>,
    started_at: f64,
    offer_at: f64,
    retry_at: f64,
}

impl Negotiator {
    pub fn new(config: RtcConfig) -> Self {
        Self {
            config,
            conn: None,
            offer: None,
            offer_sent: false,
            remote_set: false,
            channel_open: false,
            state: PeerState::New,
            pending_local: Vec::new(),
            pending_remote: Vec::new(),
            started_at: 0.0,
            offer_at: 0.0,
            retry_at: 0.0,
        }
    }

    /// Create the peer connection and local description. The offer itself is
    /// transmitted by a later [`Negotiator::advance`] once the gather delay
    /// has passed.
    pub fn open(&mut self, factory: &mut dyn PeerFactory, now: f64) -> Result<(), RtcError> {
        self.close();
        let mut conn = factory.create(&self.config)?;
        let offer = conn.create_offer(true)?;
        conn.set_local_description(&offer)?;
        self.conn = Some(conn);
        self.offer = Some(offer);
        self.started_at = now;
        self.offer_at = now + self.config.gather_delay.as_secs_f64() * 1000.0;
        self.retry_at = now + self.config.retry_interval.as_secs_f64() * 1000.0;
        self.state = PeerState::Connecting;
        Ok(())
    }

    /// Pump peer events and handshake timers.
    pub fn advance(&mut self, now: f64) -> RtcOutput {
        let mut out = RtcOutput::default();
        let Some(conn) = self.conn.as_mut() else {
            return out;
        };

        while let Some(event) = conn.poll_event() {
            match event {
                PeerEvent::LocalCandidate(candidate) => {
                    if self.offer_sent {
                        out.signals.push(Signal::Candidate(candidate));
                    } else {
                        self.pending_local.push(candidate);
                    }
                }
                PeerEvent::GatheringComplete => {
                    if self.offer_sent {
                        for candidate in self.pending_local.drain(..) {
                            out.signals.push(Signal::Candidate(candidate));
                        }
                    }
                }
                PeerEvent::StateChange(state) => {
                    self.state = state;
                }
                PeerEvent::ChannelOpen => {
                    info!("unreliable channel open");
                    self.channel_open = true;
                }
                PeerEvent::ChannelClosed => {
                    self.channel_open = false;
                }
                PeerEvent::Datagram(bytes) => out.datagrams.push(bytes),
            }
        }

        if !self.offer_sent && now >= self.offer_at {
            if let Some(offer) = self.offer.clone() {
                out.signals.push(Signal::Offer(offer));
                self.offer_sent = true;
                for candidate in self.pending_local.drain(..) {
                    out.signals.push(Signal::Candidate(candidate));
                }
            }
        }

        if self.offer_sent
            && !self.channel_open
            && self.state == PeerState::Failed
            && now >= self.retry_at
        {
            match self.reoffer() {
                Ok(offer) => {
                    info!("unreliable channel failed, re-offering with restart");
                    out.signals.push(Signal::Offer(offer));
                }
                Err(err) => warn!("re-offer failed: {err}"),
            }
            self.retry_at = now + self.config.retry_interval.as_secs_f64() * 1000.0;
        }

        out
    }

    fn reoffer(&mut self) -> Result<SessionDescription, RtcError> {
        let conn = self.conn.as_mut().ok_or(RtcError::NoConnection)?;
        let offer = conn.create_offer(true)?;
        conn.set_local_description(&offer)?;
        self.offer = Some(offer.clone());
        self.remote_set = false;
        Ok(offer)
    }

    /// Apply the server's answer, then flush candidates that beat it here.
    pub fn handle_answer(&mut self, desc: &SessionDescription) -> Result<(), RtcError> {
        let conn = self.conn.as_mut().ok_or(RtcError::NoConnection)?;
        conn.set_remote_description(desc)?;
        self.remote_set = true;
        for candidate in self.pending_remote.drain(..) {
            if let Err(err) = conn.add_ice_candidate(&candidate) {
                warn!("remote candidate rejected: {err}");
            }
        }
        Ok(())
    }

    /// Accumulate or apply a remote candidate depending on whether the
    /// remote description is set yet.
    pub fn handle_candidate(&mut self, candidate: Value) {
        if self.remote_set {
            if let Some(conn) = self.conn.as_mut() {
                if let Err(err) = conn.add_ice_candidate(&candidate) {
                    warn!("remote candidate rejected: {err}");
                }
            }
        } else {
            self.pending_remote.push(candidate);
        }
    }

    pub fn channel_open(&self) -> bool {
        self.channel_open
    }

    /// Write one datagram to the local channel, if it is open.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), RtcSendError> {
        if !self.channel_open {
            return Err(RtcSendError);
        }
        match self.conn.as_mut() {
            Some(conn) => conn.send(payload),
            None => Err(RtcSendError),
        }
    }

    /// Tear down both directions and drop all handshake state.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
        self.offer = None;
        self.offer_sent = false;
        self.remote_set = false;
        self.channel_open = false;
        self.state = PeerState::Closed;
        self.pending_local.clear();
        self.pending_remote.clear();
    }
}
