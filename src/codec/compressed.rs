//! Compressed JSON codec.
//!
//! Cookies are small, so this codec runs the JSON snapshot through zstd before
//! it is signed and base64-encoded.

use crate::codec::json::JsonCodec;
use crate::codec::{Codec, CodecError};
use crate::scope::FlashScope;
use bytes::Bytes;

/// Default zstd compression level
pub const DEFAULT_LEVEL: i32 = 3;

/// JSON codec with zstd compression.
#[derive(Debug, Clone, Copy)]
pub struct CompressedJsonCodec {
    json: JsonCodec,
    level: i32,
}

impl Default for CompressedJsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressedJsonCodec {
    pub fn new() -> Self {
        Self::with_level(DEFAULT_LEVEL)
    }

    pub fn with_level(level: i32) -> Self {
        Self {
            json: JsonCodec,
            level,
        }
    }
}

impl Codec for CompressedJsonCodec {
    fn name(&self) -> &'static str {
        "json_zstd"
    }

    fn encode(&self, flash: &FlashScope) -> Result<Bytes, CodecError> {
        let json = self.json.encode(flash)?;
        let compressed = zstd::encode_all(json.as_ref(), self.level)?;
        Ok(Bytes::from(compressed))
    }

    fn decode(&self, data: &[u8]) -> Result<FlashScope, CodecError> {
        let json = zstd::decode_all(data)?;
        self.json.decode(&json)
    }
}
