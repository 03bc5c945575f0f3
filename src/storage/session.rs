//! Session-backed flash storage.
//!
//! The flash snapshot is kept as a JSON value inside the user's session. The
//! session layer must run before the flash middleware; a request without a
//! session simply has no flash.

use crate::context::{Request, Response};
use crate::scope::FlashScope;
use crate::storage::{FlashStorage, StorageError};
use tracing::{trace, warn};

/// Session key holding the flash snapshot
pub const SESSION_KEY: &str = "_flash_session";

/// Stores the flash in the request's session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    key: String,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::with_key(SESSION_KEY)
    }

    /// Creates a session storage that uses a custom session key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FlashStorage for SessionStorage {
    fn name(&self) -> &'static str {
        "session"
    }

    fn load(&self, request: &Request) -> Result<Option<FlashScope>, StorageError> {
        let Some(data) = request.session().and_then(|s| s.get(&self.key)) else {
            return Ok(None);
        };

        match FlashScope::from_snapshot(data) {
            Ok(flash) => Ok(Some(flash)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Ignoring malformed flash in session");
                Ok(None)
            }
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

        if let Some(session) = request.session_mut() {
            session.insert(self.key.clone(), flash.to_value());
            trace!(key = %self.key, entries = flash.len(), "Flash saved to session");
        }
        Ok(())
    }

    fn clear(&self, request: &mut Request, _response: &mut Response) {
        if let Some(session) = request.session_mut() {
            if session.remove(&self.key).is_some() {
                trace!(key = %self.key, "Flash removed from session");
            }
        }
    }
}
