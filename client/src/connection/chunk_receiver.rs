//! Reassembly of messages that arrive as chunk fragments.
//!
//! Fragments are stored keyed by `(message id, sequence)`. The fragment
//! flagged `last` triggers assembly: a buffer of the declared total size is
//! allocated, every stored fragment with the same message id is copied at
//! its offset, and the fragment count is verified against the terminal
//! sequence number. Partial sets left behind by a lost terminal fragment
//! are evicted after an idle interval.

use std::collections::HashMap;

use log::warn;

use scenesync_shared::ChunkMessage;

struct StoredChunk {
    ofs: usize,
    data: Vec<u8>,
    arrived: f64,
}

pub struct ChunkReceiver {
    map: HashMap<(u64, u32), StoredChunk>,
}

impl ChunkReceiver {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Store a fragment; on the terminal fragment, reassemble the payload.
    pub fn receive(&mut self, chunk: ChunkMessage, now: f64) -> Option<Vec<u8>> {
        let mid = chunk.mid;
        let final_seq = chunk.seq;
        let total_size = chunk.ts as usize;
        let is_last = chunk.last;
        self.map.insert(
            (mid, chunk.seq),
            StoredChunk {
                ofs: chunk.ofs as usize,
                data: chunk.data.into_vec(),
                arrived: now,
            },
        );
        if !is_last {
            return None;
        }

        let keys: Vec<(u64, u32)> = self
            .map
            .keys()
            .filter(|(stored_mid, _)| *stored_mid == mid)
            .copied()
            .collect();
        let count = keys.len();
        let mut buffer = vec![0u8; total_size];
        let mut overflow = false;
        for key in &keys {
            if let Some(part) = self.map.remove(key) {
                let end = part.ofs + part.data.len();
                if end > buffer.len() {
                    overflow = true;
                    continue;
                }
                buffer[part.ofs..end].copy_from_slice(&part.data);
            }
        }
        if overflow {
            warn!("chunk set {mid} exceeds its declared size of {total_size} bytes, discarding");
            return None;
        }
        let expected = final_seq as usize + 1;
        if count != expected {
            warn!("chunk set {mid} incomplete: {count} of {expected} fragments, discarding");
            return None;
        }
        Some(buffer)
    }

    /// Drop fragments that have been waiting longer than `timeout_ms`.
    pub fn evict_stale(&mut self, now: f64, timeout_ms: f64) {
        let before = self.map.len();
        self.map.retain(|_, part| now - part.arrived <= timeout_ms);
        let dropped = before - self.map.len();
        if dropped > 0 {
            warn!("evicted {dropped} orphaned chunk fragments");
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl Default for ChunkReceiver {
    fn default() -> Self {
        Self::new()
    }
}
