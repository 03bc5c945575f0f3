//! Flash Codecs
//!
//! This module turns flash scopes into opaque byte payloads and back, for
//! storage backends that cannot hold structured data (such as cookies).
//!
//! ## Layers
//!
//! ```text
//! FlashScope ──encode──> bytes ──Signer──> base64(bytes ‖ digest)
//!                                              │
//! FlashScope <──decode── bytes <──verify───────┘
//! ```
//!
//! ## Codecs
//!
//! - [`JsonCodec`]: the snapshot as JSON text (default)
//! - [`CompressedJsonCodec`]: JSON compressed with zstd, for smaller cookies
//! - [`BinaryCodec`]: an opaque bincode frame
//!
//! [`Signer`] wraps any codec and appends an HMAC-SHA256 tag so that a
//! payload modified on the client side is detected on the way back in.

pub mod binary;
pub mod compressed;
pub mod json;
pub mod signed;

use crate::scope::{FlashScope, ScopeError};
use bytes::Bytes;
use thiserror::Error;

// Re-export the codec implementations
pub use binary::BinaryCodec;
pub use compressed::CompressedJsonCodec;
pub use json::JsonCodec;
pub use signed::Signer;

/// Errors that can occur while encoding or decoding a flash payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression or decompression failed
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// The binary frame could not be encoded or decoded
    #[error("binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// The binary frame was written by an incompatible version
    #[error("unsupported binary frame version: {0}")]
    UnsupportedVersion(u8),

    /// The payload decoded to something that is not a flash snapshot
    #[error(transparent)]
    Snapshot(#[from] ScopeError),

    /// The signing secret cannot be used
    #[error("invalid signing secret: {0}")]
    InvalidSecret(String),

    /// The payload's digest does not match its content
    #[error("flash payload failed its integrity check")]
    TamperDetected,
}

impl CodecError {
    /// Returns true if this error signals a forged or modified payload.
    pub fn is_tampering(&self) -> bool {
        matches!(self, CodecError::TamperDetected)
    }
}

/// Converts flash scopes to bytes and back.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Short name used in configuration and logs.
    fn name(&self) -> &'static str;

    fn encode(&self, flash: &FlashScope) -> Result<Bytes, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<FlashScope, CodecError>;
}
