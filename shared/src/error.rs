use thiserror::Error;

/// Errors that can occur while encoding or decoding a wire frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The value could not be serialized to MessagePack
    #[error("failed to serialize frame: {detail}")]
    Serialize { detail: String },

    /// Compression of an outbound frame failed
    #[error("failed to compress frame of {payload_size} bytes")]
    Compress { payload_size: usize },

    /// The payload decodes as neither gzip-wrapped nor bare MessagePack
    #[error("failed to deserialize frame of {payload_size} bytes")]
    Deserialize { payload_size: usize },
}

/// Errors that can occur while translating or applying patch operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A wire op carried an unknown operation letter
    #[error("unknown wire op code {code:?}")]
    UnknownOpCode { code: String },

    /// The op uses a shape the wire format cannot carry
    #[error("op {op:?} has no wire form")]
    Unrepresentable { op: &'static str },

    /// Applying a standard-form op to the document failed
    #[error("patch apply failed at {path:?}: {detail}")]
    Apply { path: String, detail: String },
}

/// Errors that can occur while parsing or building wire messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// A known message kind arrived with missing or mistyped fields
    #[error("malformed {kind:?} message: {detail}")]
    Malformed { kind: String, detail: String },

    /// An outbound message could not be converted to a wire value
    #[error("failed to build wire message: {detail}")]
    Build { detail: String },
}
