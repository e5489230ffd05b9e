//! Fast-channel decode: packed transform samples and dictionary-coded
//! scalars into the motion side-table and the visible entity fields.

use log::{debug, warn};

use scenesync_shared::{fixed, FastBlock, FastData};
use serde_json::Value;

use super::document::DocumentState;
use super::motion::{array_value, normalize4};

// per-record payload bytes, after the 4-byte entity id
const POSITION_BYTES: usize = 9;
const ROTATION_BYTES: usize = 8;
const SCALE_BYTES: usize = 12;

// advance for a record whose entity is unknown, counted from the id byte.
// Position and scale cover the id, rotation covers the payload only; the
// asymmetry is part of the wire contract.
const POSITION_SKIP: usize = 13;
const ROTATION_SKIP: usize = 8;
const SCALE_SKIP: usize = 16;

/// Apply one fast-channel payload to a document.
pub fn apply(state: &mut DocumentState, fdata: FastData, now: f64) {
    for (field, block) in fdata {
        match field.as_str() {
            "position" | "rotation" | "scale" => apply_transforms(state, &field, block, now),
            _ => apply_dictionary(state, &field, block, now),
        }
    }
}

fn apply_dictionary(state: &mut DocumentState, field: &str, block: FastBlock, now: f64) {
    let Some(dict) = block.dict else {
        warn!("fast block for {field:?} has no dictionary");
        return;
    };
    let inverse: std::collections::HashMap<u32, &String> =
        dict.iter().map(|(value, id)| (*id, value)).collect();

    let buf = block.pdata.into_vec();
    let DocumentState { doc, motion, .. } = state;
    let Some(entities) = doc.get_mut("entities").and_then(Value::as_object_mut) else {
        return;
    };

    let mut ofs = 0;
    while ofs + 8 <= buf.len() {
        let entity_id = fixed::read_u32(&buf, ofs).to_string();
        match entities.get_mut(&entity_id).and_then(Value::as_object_mut) {
            Some(entity) => {
                let dict_id = fixed::read_u32(&buf, ofs + 4);
                match inverse.get(&dict_id) {
                    Some(value) => {
                        entity.insert(field.to_owned(), Value::String((*value).clone()));
                        motion
                            .entry(entity_id)
                            .or_default()
                            .changed
                            .insert(field.to_owned(), now);
                    }
                    None => warn!("dictionary for {field:?} has no entry {dict_id}"),
                }
            }
            None => debug!("dictionary change for unknown entity {entity_id}"),
        }
        ofs += 8;
    }
}

fn apply_transforms(state: &mut DocumentState, field: &str, block: FastBlock, now: f64) {
    let (payload_len, skip_len) = match field {
        "position" => (POSITION_BYTES, POSITION_SKIP),
        "rotation" => (ROTATION_BYTES, ROTATION_SKIP),
        _ => (SCALE_BYTES, SCALE_SKIP),
    };

    let origin = state.origin();
    let mut buf = block.pdata.into_vec();
    let DocumentState { doc, motion, .. } = state;
    let Some(entities) = doc.get_mut("entities").and_then(Value::as_object_mut) else {
        return;
    };

    let mut ofs = 0;
    while ofs + 4 <= buf.len() {
        let entity_id = fixed::read_u32(&buf, ofs).to_string();
        let Some(entity) = entities.get_mut(&entity_id).and_then(Value::as_object_mut) else {
            ofs += skip_len;
            continue;
        };
        if ofs + 4 + payload_len > buf.len() {
            warn!("truncated {field} record for entity {entity_id}");
            return;
        }
        let sample_ofs = ofs + 4;
        let track = motion.entry(entity_id).or_default();
        match field {
            "position" => {
                let sample = [
                    fixed::read_fp168(&mut buf, sample_ofs) + origin[0],
                    fixed::read_fp168(&mut buf, sample_ofs + 3) + origin[1],
                    fixed::read_fp168(&mut buf, sample_ofs + 6) + origin[2],
                ];
                track.position.push(sample, now);
                seed_visible(entity, "position", array_value(sample));
            }
            "rotation" => {
                let sample = normalize4([
                    fixed::read_fp412(&mut buf, sample_ofs),
                    fixed::read_fp412(&mut buf, sample_ofs + 2),
                    fixed::read_fp412(&mut buf, sample_ofs + 4),
                    fixed::read_fp412(&mut buf, sample_ofs + 6),
                ]);
                track.rotation.push(sample, now);
                seed_visible(entity, "rotation", array_value(sample));
            }
            _ => {
                let sample = [
                    fixed::read_fp1616(&mut buf, sample_ofs),
                    fixed::read_fp1616(&mut buf, sample_ofs + 4),
                    fixed::read_fp1616(&mut buf, sample_ofs + 8),
                ];
                track.scale.push(sample, now);
                seed_visible(entity, "sca", array_value(sample));
            }
        }
        ofs += 4 + payload_len;
    }
}

/// The first sample seeds the visible field so consumers always see a value.
fn seed_visible(entity: &mut serde_json::Map<String, Value>, field: &str, sample: Value) {
    if !entity.contains_key(field) {
        entity.insert(field.to_owned(), sample);
    }
}
