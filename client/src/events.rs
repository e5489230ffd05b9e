//! The event batch handed to the host after each receive pass.

use json_patch::PatchOperation;

/// One host-visible notification.
#[derive(Debug)]
pub enum ClientEvent {
    /// The reliable transport opened.
    Connect,
    /// The reliable transport closed; all documents were dropped.
    Disconnect,
    /// A document changed: inbound snapshot (`ops` is `None`), inbound patch
    /// batch, or an outbound sync drain (`ops` carries the mirrored ops).
    Change {
        name: String,
        ops: Option<Vec<PatchOperation>>,
    },
    /// A frame with an unrecognised kind, surfaced untouched.
    Message(rmpv::Value),
}

/// Events accumulated during one receive pass.
#[derive(Debug, Default)]
pub struct Events {
    list: Vec<ClientEvent>,
}

impl Events {
    pub(crate) fn push(&mut self, event: ClientEvent) {
        self.list.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClientEvent> {
        self.list.iter()
    }
}

impl IntoIterator for Events {
    type Item = ClientEvent;
    type IntoIter = std::vec::IntoIter<ClientEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}
