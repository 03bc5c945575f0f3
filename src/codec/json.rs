//! JSON codec.

use crate::codec::{Codec, CodecError};
use crate::scope::FlashScope;
use bytes::Bytes;
use serde_json::Value;

/// Encodes the flash snapshot as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, flash: &FlashScope) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(&flash.to_snapshot())?))
    }

    fn decode(&self, data: &[u8]) -> Result<FlashScope, CodecError> {
        let value: Value = serde_json::from_slice(data)?;
        Ok(FlashScope::from_snapshot(&value)?)
    }
}
