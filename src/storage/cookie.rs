//! Cookie-backed flash storage.
//!
//! The flash travels to the client in a signed cookie. The signature only
//! detects modification; the content is readable by the user, so sensitive
//! values should not be flashed with this backend.

use crate::codec::Signer;
use crate::context::{Request, Response};
use crate::scope::FlashScope;
use crate::storage::{FlashStorage, StorageError};
use tracing::{trace, warn};

/// Name of the cookie holding the flash
pub const COOKIE_NAME: &str = "_flash_cookie";

/// Stores the flash in a signed cookie.
#[derive(Debug, Clone)]
pub struct CookieStorage {
    name: String,
    signer: Signer,
}

impl CookieStorage {
    /// Creates a backend using the default cookie name.
    pub fn new(signer: Signer) -> Self {
        Self::with_name(COOKIE_NAME, signer)
    }

    /// Creates a backend storing the flash under cookie `name`.
    pub fn with_name(name: impl Into<String>, signer: Signer) -> Self {
        Self {
            name: name.into(),
            signer,
        }
    }

    /// Name of the cookie holding the flash.
    pub fn cookie_name(&self) -> &str {
        &self.name
    }
}

impl FlashStorage for CookieStorage {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn load(&self, request: &Request) -> Result<Option<FlashScope>, StorageError> {
        match request.cookie(&self.name) {
            Some(payload) if !payload.is_empty() => {
                let flash = self.signer.decode_signed(payload).map_err(|e| {
                    if e.is_tampering() {
                        warn!(cookie = %self.name, path = %request.path(), "Flash cookie was tampered with");
                    }
                    e
                })?;
                Ok(flash)
            }
            _ => Ok(None),
        }
    }

    fn save(
        &self,
        flash: &FlashScope,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), StorageError> {
        if flash.is_empty() {
            self.clear(request, response);
            return Ok(());
        }

        let payload = self.signer.encode_and_sign(flash)?;
        trace!(cookie = %self.name, bytes = payload.len(), "Flash saved to cookie");
        response.set_cookie(self.name.clone(), payload);
        Ok(())
    }

    fn clear(&self, request: &mut Request, response: &mut Response) {
        if request.cookie(&self.name).is_some() {
            response.delete_cookie(self.name.clone());
            trace!(cookie = %self.name, "Flash cookie expired");
        }
    }
}
