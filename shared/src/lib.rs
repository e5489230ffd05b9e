//! # Scenesync Shared
//! Wire-level building blocks shared between scenesync peers: byte codecs,
//! the frame codec, patch-op translation and the typed wire messages.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod fixed;
pub mod frame;
pub mod patch;

mod error;
mod message;
mod time;

pub use error::{FrameError, MessageError, PatchError};
pub use message::{
    to_wire_value, ChunkMessage, FastBlock, FastData, FastPatchMessage, FullMessage, PatchMessage,
    PengMessage, PingMessage, PongMessage, RtcCandidateMessage, RtcCandidateOutMessage,
    RtcOfferMessage, RtcSessionMessage, ServerMessage, SubMessage, SyncMessage, UnsubMessage,
};
pub use patch::WireOp;
pub use time::{now_ms, Timer};
