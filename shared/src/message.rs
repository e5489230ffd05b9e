//! Typed views of the wire messages.
//!
//! Every frame is a MessagePack map whose `c` field names the message kind.
//! Field names are single letters or short tags fixed by the wire contract;
//! unknown kinds pass through untouched for the host to consume.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use serde_json::Value;

use crate::error::MessageError;
use crate::patch::WireOp;

/// Fast-channel payload: field name → change block.
pub type FastData = HashMap<String, FastBlock>;

/// One fast-channel change block. Transform fields carry only `pdata`;
/// dictionary-coded scalar fields also carry the value → id dictionary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FastBlock {
    #[serde(default)]
    pub dict: Option<HashMap<String, u32>>,
    pub pdata: ByteBuf,
}

/// Full snapshot of a document.
#[derive(Debug, Clone, Deserialize)]
pub struct FullMessage {
    pub n: String,
    #[serde(default)]
    pub t: f64,
    #[serde(default)]
    pub le: bool,
    pub doc: Value,
    #[serde(default)]
    pub fdata: Option<FastData>,
}

/// A batch of semantic patch ops for one document.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchMessage {
    pub n: String,
    #[serde(default)]
    pub t: f64,
    #[serde(default)]
    pub doc: Vec<WireOp>,
}

/// Fast-channel update with a monotonic update id.
#[derive(Debug, Clone, Deserialize)]
pub struct FastPatchMessage {
    pub n: String,
    pub u: u64,
    pub fdata: FastData,
}

/// One fragment of a larger message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    pub mid: u64,
    pub seq: u32,
    pub ofs: u64,
    #[serde(default)]
    pub chs: u64,
    pub ts: u64,
    #[serde(default)]
    pub last: bool,
    pub data: ByteBuf,
}

/// Server reply to a ping.
#[derive(Debug, Clone, Deserialize)]
pub struct PongMessage {
    pub ct: f64,
    pub st: f64,
}

/// Session description leg of the unreliable-channel handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct RtcSessionMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

/// Candidate leg of the unreliable-channel handshake. The candidate body is
/// opaque to this layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RtcCandidateMessage {
    pub candidate: Value,
}

/// A parsed inbound frame, routed by its `c` field.
#[derive(Debug)]
pub enum ServerMessage {
    Full(FullMessage),
    Patch(PatchMessage),
    FastPatch(FastPatchMessage),
    Chunk(ChunkMessage),
    Pong(PongMessage),
    RtcOffer(RtcSessionMessage),
    RtcAnswer(RtcSessionMessage),
    RtcCandidate(RtcCandidateMessage),
    /// Anything without a recognised kind is surfaced to the host.
    Other(rmpv::Value),
}

impl ServerMessage {
    pub fn parse(value: rmpv::Value) -> Result<Self, MessageError> {
        let Some(kind) = message_kind(&value) else {
            return Ok(Self::Other(value));
        };
        match kind.as_str() {
            "full" => Ok(Self::Full(from_value(&kind, value)?)),
            "patch" => Ok(Self::Patch(from_value(&kind, value)?)),
            "fpatch" => Ok(Self::FastPatch(from_value(&kind, value)?)),
            "chunk" => Ok(Self::Chunk(from_value(&kind, value)?)),
            "pong" => Ok(Self::Pong(from_value(&kind, value)?)),
            "rtc-offer" => Ok(Self::RtcOffer(from_value(&kind, value)?)),
            "rtc-answer" => Ok(Self::RtcAnswer(from_value(&kind, value)?)),
            "rtc-candidate" => Ok(Self::RtcCandidate(from_value(&kind, value)?)),
            _ => Ok(Self::Other(value)),
        }
    }
}

fn message_kind(value: &rmpv::Value) -> Option<String> {
    let entries = value.as_map()?;
    entries.iter().find_map(|(key, val)| {
        if key.as_str() == Some("c") {
            val.as_str().map(str::to_owned)
        } else {
            None
        }
    })
}

fn from_value<T: DeserializeOwned>(kind: &str, value: rmpv::Value) -> Result<T, MessageError> {
    rmpv::ext::from_value(value).map_err(|err| MessageError::Malformed {
        kind: kind.to_owned(),
        detail: err.to_string(),
    })
}

/// Convert an outbound message into a frame value ready for encoding.
pub fn to_wire_value<T: Serialize>(message: &T) -> Result<rmpv::Value, MessageError> {
    rmpv::ext::to_value(message).map_err(|err| MessageError::Build {
        detail: err.to_string(),
    })
}

// Outbound messages. Constructors pin the kind tag.

#[derive(Debug, Clone, Serialize)]
pub struct SubMessage {
    c: &'static str,
    pub n: String,
}

impl SubMessage {
    pub fn new(name: &str) -> Self {
        Self {
            c: "sub",
            n: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnsubMessage {
    c: &'static str,
    pub n: String,
}

impl UnsubMessage {
    pub fn new(name: &str) -> Self {
        Self {
            c: "unsub",
            n: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PingMessage {
    c: &'static str,
    pub ct: f64,
}

impl PingMessage {
    pub fn new(now: f64) -> Self {
        Self { c: "ping", ct: now }
    }
}

/// Confirmation sent immediately after a pong, echoing the server time.
#[derive(Debug, Clone, Serialize)]
pub struct PengMessage {
    c: &'static str,
    pub ct: f64,
    pub st: f64,
}

impl PengMessage {
    pub fn new(now: f64, server_time: f64) -> Self {
        Self {
            c: "peng",
            ct: now,
            st: server_time,
        }
    }
}

/// One tick's worth of local mutations for one document.
#[derive(Debug, Clone, Serialize)]
pub struct SyncMessage {
    c: &'static str,
    pub n: String,
    pub ct: f64,
    pub p: Vec<WireOp>,
}

impl SyncMessage {
    pub fn new(name: &str, now: f64, ops: Vec<WireOp>) -> Self {
        Self {
            c: "sync",
            n: name.to_owned(),
            ct: now,
            p: ops,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RtcOfferMessage {
    c: &'static str,
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl RtcOfferMessage {
    pub fn new(kind: &str, sdp: &str) -> Self {
        Self {
            c: "rtc-offer",
            kind: kind.to_owned(),
            sdp: sdp.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RtcCandidateOutMessage {
    c: &'static str,
    pub candidate: Value,
}

impl RtcCandidateOutMessage {
    pub fn new(candidate: Value) -> Self {
        Self {
            c: "rtc-candidate",
            candidate,
        }
    }
}
