use thiserror::Error;

/// Errors from the local mutation mirror
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// The path is not a valid document pointer
    #[error("path {path:?} is not a valid document pointer")]
    InvalidPath { path: String },

    /// The path's parent does not exist or cannot hold children
    #[error("path {path:?} has no parent container to write into")]
    MissingParent { path: String },
}

/// Errors from the unreliable-channel negotiator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtcError {
    /// No peer connection is active
    #[error("no peer connection is active")]
    NoConnection,

    /// Creating the peer connection or its channel failed
    #[error("peer setup failed: {detail}")]
    Setup { detail: String },

    /// A signaling step (description or candidate) was rejected
    #[error("signaling failed: {detail}")]
    Signaling { detail: String },
}
