//! Tamper detection for encoded flash payloads.
//!
//! A signed payload is `base64(encoded ‖ hex(hmac_sha256(secret, encoded)))`,
//! using the URL-safe alphabet without padding so it fits in a cookie value.
//! The secret must not be empty.
//!
//! Decoding distinguishes two failure classes:
//! - a digest mismatch is [`CodecError::TamperDetected`] and must fail the
//!   request;
//! - a payload that is not base64, or that verifies but cannot be decoded by
//!   the codec, is treated as "no usable flash".

use crate::codec::{Codec, CodecError};
use crate::scope::FlashScope;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

/// Length of the hex-encoded HMAC-SHA256 tag appended to each payload
pub const DIGEST_LEN: usize = 64;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies payloads produced by a codec.
#[derive(Clone)]
pub struct Signer {
    codec: Arc<dyn Codec>,
    /// MAC keyed with the secret, cloned for every payload
    mac: HmacSha256,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("codec", &self.codec.name())
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Signer {
    /// Creates a signer for `codec` keyed with `secret`.
    ///
    /// An empty secret would let anyone forge payloads and is rejected with
    /// [`CodecError::InvalidSecret`].
    pub fn new(codec: Arc<dyn Codec>, secret: impl AsRef<[u8]>) -> Result<Self, CodecError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CodecError::InvalidSecret("secret is empty".to_string()));
        }

        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| CodecError::InvalidSecret(e.to_string()))?;
        Ok(Self { codec, mac })
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    fn digest(&self, encoded: &[u8]) -> String {
        let tag = self.mac.clone().chain_update(encoded).finalize();
        hex::encode(tag.into_bytes())
    }

    /// Encodes `flash` and appends its digest.
    pub fn encode_and_sign(&self, flash: &FlashScope) -> Result<String, CodecError> {
        let encoded = self.codec.encode(flash)?;
        let digest = self.digest(&encoded);

        let mut payload = Vec::with_capacity(encoded.len() + DIGEST_LEN);
        payload.extend_from_slice(&encoded);
        payload.extend_from_slice(digest.as_bytes());

        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Verifies and decodes a payload produced by [`encode_and_sign`](Self::encode_and_sign).
    ///
    /// # Returns
    ///
    /// - `Ok(Some(flash))` for a valid payload
    /// - `Ok(None)` if the payload is not base64 or does not decode to a flash
    /// - `Err(CodecError::TamperDetected)` if the digest is missing or wrong
    pub fn decode_signed(&self, payload: &str) -> Result<Option<FlashScope>, CodecError> {
        let raw = match URL_SAFE_NO_PAD.decode(payload.trim()) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Flash payload is not valid base64");
                return Ok(None);
            }
        };

        if raw.len() < DIGEST_LEN {
            return Err(CodecError::TamperDetected);
        }
        let (encoded, check) = raw.split_at(raw.len() - DIGEST_LEN);

        let tag = hex::decode(check).map_err(|_| CodecError::TamperDetected)?;
        self.mac
            .clone()
            .chain_update(encoded)
            .verify_slice(&tag)
            .map_err(|_| CodecError::TamperDetected)?;

        match self.codec.decode(encoded) {
            Ok(flash) => Ok(Some(flash)),
            Err(e) => {
                warn!(codec = self.codec.name(), error = %e, "Discarding undecodable flash payload");
                Ok(None)
            }
        }
    }
}
