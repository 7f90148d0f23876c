//! Protocol error types.

use thiserror::Error;

/// Errors produced while decoding inbound frames or the compact string
/// encodings embedded in them.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no root `msg` kind")]
    MissingKind,

    #[error("malformed tile coordinate `{0}` (expected `x,y`)")]
    BadCoordinate(String),
}
