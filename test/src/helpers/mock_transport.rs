//! An in-memory reliable transport with a scripted inbound queue and a
//! captured outbound log.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use scenesync_client::transport::{ReliableTransport, SendError, TransportEvent};

#[derive(Default)]
struct Inner {
    inbound: VecDeque<TransportEvent>,
    sent: Vec<Vec<u8>>,
    connected: bool,
    connect_count: usize,
}

/// The transport half handed to the client.
pub struct MockTransport {
    inner: Rc<RefCell<Inner>>,
}

/// The test's half: feed inbound events, inspect outbound frames.
#[derive(Clone)]
pub struct TransportHandle {
    inner: Rc<RefCell<Inner>>,
}

impl MockTransport {
    pub fn create() -> (Box<dyn ReliableTransport>, TransportHandle) {
        let inner = Rc::new(RefCell::new(Inner::default()));
        let handle = TransportHandle {
            inner: Rc::clone(&inner),
        };
        (Box::new(MockTransport { inner }), handle)
    }
}

impl ReliableTransport for MockTransport {
    fn connect(&mut self, _url: &str) {
        self.inner.borrow_mut().connect_count += 1;
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.inner.borrow_mut().inbound.pop_front()
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), SendError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.connected {
            return Err(SendError);
        }
        inner.sent.push(payload.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.inner.borrow_mut().connected = false;
    }
}

impl TransportHandle {
    /// Complete the connect: the next poll reports the stream open.
    pub fn open(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.connected = true;
        inner.inbound.push_back(TransportEvent::Opened);
    }

    /// Queue a raw inbound frame.
    pub fn deliver(&self, frame: Vec<u8>) {
        self.inner
            .borrow_mut()
            .inbound
            .push_back(TransportEvent::Frame(frame));
    }

    /// Close the stream from the server side.
    pub fn close(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.connected = false;
        inner.inbound.push_back(TransportEvent::Closed);
    }

    /// Drain everything the client has written to the wire.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inner.borrow_mut().sent)
    }

    /// Drain outbound frames decoded back into wire values.
    pub fn take_sent_values(&self) -> Vec<rmpv::Value> {
        self.take_sent()
            .iter()
            .map(|bytes| scenesync_shared::frame::decode(bytes).expect("outbound frame decodes"))
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.borrow().connect_count
    }

    pub fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }
}
