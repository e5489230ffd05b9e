//! # Scenesync Client
//! The client half of the scenesync replication protocol: subscribes to
//! named documents, maintains local replicas from a reliable patch stream
//! and an unreliable fast channel, smooths received transform samples, and
//! mirrors local mutations back to the server.

pub mod rtc;
pub mod transport;

mod client;
mod client_config;
mod connection;
mod error;
mod events;
mod world;

pub use client::{reconnect_delay, Client, ConnectionState};
pub use client_config::ClientConfig;
pub use connection::{BandwidthMonitor, ChunkReceiver, Stats, TimeManager};
pub use error::{MirrorError, RtcError};
pub use events::{ClientEvent, Events};
pub use world::document::{DocumentMut, DocumentState, DocumentStore};
pub use world::interpolate::{EASING, MAX_STEP_MS, STALE_MS};
pub use world::motion::{MotionState, SampleTrack};
