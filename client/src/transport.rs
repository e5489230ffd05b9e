//! The reliable-transport seam.
//!
//! The client drives an ordered, framed, bidirectional stream through this
//! trait; concrete sockets (websocket, TCP, in-memory test doubles) live
//! outside this crate and are handed in at construction.

/// Lifecycle and traffic notifications surfaced by a transport poll.
#[derive(Debug)]
pub enum TransportEvent {
    /// The stream is open and frames may be sent.
    Opened,
    /// One complete inbound frame.
    Frame(Vec<u8>),
    /// The stream closed; the client clears state and may reconnect.
    Closed,
    /// A transport-level fault. Treated like a close.
    Error(String),
}

#[derive(Debug)]
pub struct SendError;

pub trait ReliableTransport {
    /// Begin connecting. Completion is reported via [`TransportEvent::Opened`].
    fn connect(&mut self, url: &str);

    /// Drain the next pending event, if any.
    fn poll(&mut self) -> Option<TransportEvent>;

    /// Write one frame to the stream.
    fn send(&mut self, payload: &[u8]) -> Result<(), SendError>;

    fn close(&mut self);
}
