//! Opaque binary codec.
//!
//! The flash is written as a versioned bincode frame of records. Values are
//! arbitrary JSON, which bincode cannot describe on its own, so each value is
//! carried as its JSON text inside the record.
//!
//! ```text
//! Frame { version: u8, records: [ Record { key, used, value_json }, ... ] }
//! ```

use crate::codec::{Codec, CodecError};
use crate::scope::{FlashScope, Status};
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Current frame layout version
pub const FRAME_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    used: bool,
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    version: u8,
    records: Vec<Record>,
}

/// Encodes the flash as a compact bincode frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl BinaryCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn encode(&self, flash: &FlashScope) -> Result<Bytes, CodecError> {
        let records = flash
            .iter()
            .map(|(key, value)| -> Result<Record, CodecError> {
                Ok(Record {
                    key: key.to_owned(),
                    used: flash.is_used(key).unwrap_or(false),
                    value: serde_json::to_string(value)?,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let frame = Frame {
            version: FRAME_VERSION,
            records,
        };
        Ok(Bytes::from(bincode::serialize(&frame)?))
    }

    fn decode(&self, data: &[u8]) -> Result<FlashScope, CodecError> {
        let frame: Frame = bincode::deserialize(data)?;
        if frame.version != FRAME_VERSION {
            return Err(CodecError::UnsupportedVersion(frame.version));
        }

        let mut entries = IndexMap::with_capacity(frame.records.len());
        let mut status = IndexMap::with_capacity(frame.records.len());
        for record in frame.records {
            let value = serde_json::from_str(&record.value)?;
            let flag = if record.used {
                Status::Used
            } else {
                Status::Fresh
            };
            status.insert(record.key.clone(), flag);
            entries.insert(record.key, value);
        }

        Ok(FlashScope::from_parts(entries, status))
    }
}
