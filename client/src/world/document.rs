//! Ownership of the subscribed document replicas.
//!
//! Each document pairs the user-visible tree with a motion side-table and
//! the replication cursors for the two inbound streams. The store also owns
//! the outbound change log and the suppression flag that keeps inbound
//! applies from echoing back to the server.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use scenesync_shared::WireOp;

pub use super::mirror::DocumentMut;
use super::motion::{vec3_from, MotionState};

/// One subscribed document and its replication state.
pub struct DocumentState {
    pub doc: Value,
    /// Entity id → motion samples and change timestamps.
    pub motion: HashMap<String, MotionState>,
    /// Server time of the last full snapshot.
    pub last_full_state: f64,
    /// The `le` flag carried on the last full snapshot. Recorded, unused.
    pub little_endian: bool,
    /// Cursor over the fast-channel update ids.
    pub last_update_id: Option<u64>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self {
            doc: Value::Object(Map::new()),
            motion: HashMap::new(),
            last_full_state: 0.0,
            little_endian: false,
            last_update_id: None,
        }
    }

    pub fn from_snapshot(doc: Value, server_time: f64, little_endian: bool) -> Self {
        Self {
            doc,
            motion: HashMap::new(),
            last_full_state: server_time,
            little_endian,
            last_update_id: None,
        }
    }

    /// The coordinate-system offset added to decoded positions.
    pub fn origin(&self) -> [f64; 3] {
        vec3_from(self.doc.get("origin")).unwrap_or([0.0; 3])
    }

    pub fn motion_mut(&mut self, entity_id: &str) -> &mut MotionState {
        self.motion.entry(entity_id.to_owned()).or_default()
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

/// All documents owned by one client, plus the outbound change log.
pub struct DocumentStore {
    documents: HashMap<String, DocumentState>,
    changes: HashMap<String, Vec<WireOp>>,
    /// Set while an inbound snapshot or patch is being applied; mutations
    /// made under it are never recorded outbound.
    pub(crate) suppress: bool,
    allow_sync: bool,
    excluded: HashSet<String>,
}

impl DocumentStore {
    pub fn new(allow_sync: bool, excluded: HashSet<String>) -> Self {
        Self {
            documents: HashMap::new(),
            changes: HashMap::new(),
            suppress: false,
            allow_sync,
            excluded,
        }
    }

    pub fn insert(&mut self, name: &str, state: DocumentState) {
        self.documents.insert(name.to_owned(), state);
    }

    pub fn insert_empty(&mut self, name: &str) {
        self.documents.insert(name.to_owned(), DocumentState::new());
    }

    pub fn remove(&mut self, name: &str) {
        self.documents.remove(name);
        self.changes.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    pub fn state(&self, name: &str) -> Option<&DocumentState> {
        self.documents.get(name)
    }

    pub fn state_mut(&mut self, name: &str) -> Option<&mut DocumentState> {
        self.documents.get_mut(name)
    }

    pub fn document(&self, name: &str) -> Option<&Value> {
        self.documents.get(name).map(|state| &state.doc)
    }

    /// Mutable handle that mirrors observable writes into the change log.
    pub fn document_mut(&mut self, name: &str) -> Option<DocumentMut<'_>> {
        let observing = self.allow_sync && !self.suppress;
        let state = self.documents.get_mut(name)?;
        let changes = self.changes.entry(name.to_owned()).or_default();
        Some(DocumentMut::new(state, changes, observing, &self.excluded))
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut DocumentState> {
        self.documents.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.documents.keys()
    }

    /// Take every non-empty pending op list, document by document.
    pub fn drain_changes(&mut self) -> Vec<(String, Vec<WireOp>)> {
        self.changes
            .drain()
            .filter(|(_, ops)| !ops.is_empty())
            .collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.changes.values().any(|ops| !ops.is_empty())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.changes.clear();
        self.suppress = false;
    }
}
