//! Frame codec: MessagePack serialization with a float32 preference, plus a
//! size-gated gzip wrap.
//!
//! Floats are narrowed to 32 bits on the way out; the precision loss (below
//! ~1e-7) is acceptable for this domain and halves the size of
//! transform-heavy frames. Frames whose serialized length lies strictly
//! between [`COMPRESS_MIN`] and [`COMPRESS_MAX`] are gzipped at the fastest
//! setting; everything else passes through unchanged. The read side always
//! attempts decompression first and falls through to the raw bytes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rmpv::Value;

use crate::error::FrameError;

/// Frames at or below this many bytes are sent uncompressed.
pub const COMPRESS_MIN: usize = 256;
/// Frames at or above this many bytes are sent uncompressed.
pub const COMPRESS_MAX: usize = 999_999;

/// Serialize a frame value, compressing when the size gate allows it.
pub fn encode(value: &Value) -> Result<Vec<u8>, FrameError> {
    let mut raw = Vec::new();
    rmpv::encode::write_value(&mut raw, &narrow_floats(value)).map_err(|err| {
        FrameError::Serialize {
            detail: err.to_string(),
        }
    })?;

    if raw.len() > COMPRESS_MIN && raw.len() < COMPRESS_MAX {
        let payload_size = raw.len();
        let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::fast());
        encoder
            .write_all(&raw)
            .map_err(|_| FrameError::Compress { payload_size })?;
        encoder
            .finish()
            .map_err(|_| FrameError::Compress { payload_size })
    } else {
        Ok(raw)
    }
}

/// Decode a frame, trying gunzip first and falling through to raw bytes.
pub fn decode(payload: &[u8]) -> Result<Value, FrameError> {
    let mut inflated = Vec::new();
    let mut source: &[u8] = match GzDecoder::new(payload).read_to_end(&mut inflated) {
        Ok(_) => &inflated,
        Err(_) => payload,
    };
    rmpv::decode::read_value(&mut source).map_err(|_| FrameError::Deserialize {
        payload_size: payload.len(),
    })
}

fn narrow_floats(value: &Value) -> Value {
    match value {
        Value::F64(float) => Value::F32(*float as f32),
        Value::Array(items) => Value::Array(items.iter().map(narrow_floats).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, val)| (narrow_floats(key), narrow_floats(val)))
                .collect(),
        ),
        other => other.clone(),
    }
}
