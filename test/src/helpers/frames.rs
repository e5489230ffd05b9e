//! Wire-frame builders. Everything goes through the real shared codec so
//! the bytes handed to the client are genuine wire frames.

use rmpv::Value as Wire;
use scenesync_shared::{fixed, frame, now_ms};
use serde_json::Value as Json;

/// Build a msgpack map with string keys.
pub fn wire_map(entries: Vec<(&str, Wire)>) -> Wire {
    Wire::Map(
        entries
            .into_iter()
            .map(|(key, value)| (Wire::from(key), value))
            .collect(),
    )
}

pub fn bin(bytes: Vec<u8>) -> Wire {
    Wire::Binary(bytes)
}

/// Convert a JSON value into its wire representation.
pub fn to_wire(value: &Json) -> Wire {
    rmpv::ext::to_value(value).expect("json converts to a wire value")
}

/// Look up a key in a msgpack map.
pub fn field<'a>(value: &'a Wire, key: &str) -> Option<&'a Wire> {
    value.as_map()?.iter().find_map(|(k, v)| {
        if k.as_str() == Some(key) {
            Some(v)
        } else {
            None
        }
    })
}

pub fn kind(value: &Wire) -> Option<&str> {
    field(value, "c")?.as_str()
}

pub fn encode(value: &Wire) -> Vec<u8> {
    frame::encode(value).expect("frame encodes")
}

pub fn full_frame(name: &str, t: f64, le: bool, doc: Json) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("full")),
        ("n", Wire::from(name)),
        ("t", Wire::F64(t)),
        ("le", Wire::from(le)),
        ("doc", to_wire(&doc)),
    ]))
}

/// `ops` are wire-compact `{p, v, o?}` objects.
pub fn patch_frame(name: &str, t: f64, ops: Json) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("patch")),
        ("n", Wire::from(name)),
        ("t", Wire::F64(t)),
        ("doc", to_wire(&ops)),
    ]))
}

pub fn fpatch_frame(name: &str, u: u64, fdata: Vec<(&str, Wire)>) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("fpatch")),
        ("n", Wire::from(name)),
        ("u", Wire::from(u)),
        ("fdata", wire_map(fdata)),
    ]))
}

/// A transform block carrying raw packed bytes.
pub fn transform_block(pdata: Vec<u8>) -> Wire {
    wire_map(vec![("pdata", bin(pdata))])
}

/// A dictionary block mapping value strings to ids.
pub fn dict_block(dict: Vec<(&str, u32)>, pdata: Vec<u8>) -> Wire {
    wire_map(vec![
        (
            "dict",
            Wire::Map(
                dict.into_iter()
                    .map(|(value, id)| (Wire::from(value), Wire::from(id)))
                    .collect(),
            ),
        ),
        ("pdata", bin(pdata)),
    ])
}

pub fn pong_frame(ct: f64, st: f64) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("pong")),
        ("ct", Wire::F64(ct)),
        ("st", Wire::F64(st)),
    ]))
}

pub fn rtc_answer_frame(sdp: &str) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("rtc-answer")),
        ("type", Wire::from("answer")),
        ("sdp", Wire::from(sdp)),
    ]))
}

pub fn rtc_candidate_frame(candidate: Json) -> Vec<u8> {
    encode(&wire_map(vec![
        ("c", Wire::from("rtc-candidate")),
        ("candidate", to_wire(&candidate)),
    ]))
}

/// Split an already-encoded frame into chunk messages of `chunk_size` bytes.
pub fn chunk_frames(mid: u64, payload: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    let total = payload.len();
    let mut frames = Vec::new();
    let mut seq: u32 = 0;
    let mut ofs = 0;
    while ofs < total {
        let end = (ofs + chunk_size).min(total);
        let last = end == total;
        frames.push(encode(&wire_map(vec![
            ("c", Wire::from("chunk")),
            ("mid", Wire::from(mid)),
            ("seq", Wire::from(seq)),
            ("ofs", Wire::from(ofs as u64)),
            ("chs", Wire::from((end - ofs) as u64)),
            ("ts", Wire::from(total as u64)),
            ("last", Wire::from(last)),
            ("data", bin(payload[ofs..end].to_vec())),
        ])));
        seq += 1;
        ofs = end;
    }
    frames
}

/// Packed position payload for one entity, matching the fast-channel layout.
pub fn position_record(entity_id: u32, components: [f64; 3]) -> Vec<u8> {
    let mut buf = vec![0u8; 13];
    fixed::write_u32(&mut buf, 0, entity_id);
    fixed::write_fp168(&mut buf, 4, components[0]);
    fixed::write_fp168(&mut buf, 7, components[1]);
    fixed::write_fp168(&mut buf, 10, components[2]);
    buf
}

pub fn rotation_record(entity_id: u32, components: [f64; 4]) -> Vec<u8> {
    let mut buf = vec![0u8; 12];
    fixed::write_u32(&mut buf, 0, entity_id);
    for (i, component) in components.iter().enumerate() {
        fixed::write_fp412(&mut buf, 4 + i * 2, *component);
    }
    buf
}

pub fn scale_record(entity_id: u32, components: [f64; 3]) -> Vec<u8> {
    let mut buf = vec![0u8; 16];
    fixed::write_u32(&mut buf, 0, entity_id);
    for (i, component) in components.iter().enumerate() {
        fixed::write_fp1616(&mut buf, 4 + i * 4, *component);
    }
    buf
}

/// Wall-clock helper re-exported for tests that build pong timestamps.
pub fn wall_ms() -> f64 {
    now_ms()
}
