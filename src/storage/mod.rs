//! Flash Storage Module
//!
//! This module persists flash scopes between requests. A backend receives the
//! scope at the end of a request and hands back a copy at the start of the
//! next one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  load()   ┌──────────────────────────┐
//! │                  │<──────────│   FlashStorage (trait)   │
//! │  FlashMiddleware │           │                          │
//! │                  │──────────>│  ┌────────────────────┐  │
//! └──────────────────┘  save()   │  │  SessionStorage    │  │
//!                       clear()  │  │  (session value)   │  │
//!                                │  ├────────────────────┤  │
//!                                │  │  CookieStorage     │  │
//!                                │  │  (signed cookie)   │  │
//!                                │  └────────────────────┘  │
//!                                └──────────────────────────┘
//! ```
//!
//! ## Backends
//!
//! - [`SessionStorage`]: keeps the snapshot in the user's session (default)
//! - [`CookieStorage`]: sends the snapshot to the client in a signed cookie
//!
//! Custom backends implement [`FlashStorage`] and report their own failures
//! through [`StorageError::Backend`].
//!
//! ## Example
//!
//! ```
//! use flashscope::context::{Request, Response, Session};
//! use flashscope::storage::{FlashStorage, SessionStorage};
//! use flashscope::FlashScope;
//!
//! let storage = SessionStorage::new();
//! let mut request = Request::new("/").with_session(Session::new());
//! let mut response = Response::ok();
//!
//! let mut flash = FlashScope::new();
//! flash.set("message", "Saved!");
//! storage.save(&flash, &mut request, &mut response).unwrap();
//!
//! let restored = storage.load(&request).unwrap().unwrap();
//! assert_eq!(restored.get("message").unwrap(), "Saved!");
//! ```

pub mod cookie;
pub mod session;

use crate::codec::CodecError;
use crate::context::{Request, Response};
use crate::scope::FlashScope;
use thiserror::Error;

// Re-export the built-in backends
pub use cookie::CookieStorage;
pub use session::SessionStorage;

/// Errors that can occur while loading or saving a flash.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The persisted payload could not be encoded, or failed verification
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A custom backend failed
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    /// Returns true if the stored flash was modified by a third party.
    pub fn is_tampering(&self) -> bool {
        matches!(self, StorageError::Codec(e) if e.is_tampering())
    }
}

/// Persists flash scopes across requests.
///
/// Implementations are shared by every request, so they hold no per-request
/// state; everything request-specific lives in the [`Request`] and
/// [`Response`] they are handed.
pub trait FlashStorage: Send + Sync {
    /// Short name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Returns the flash persisted for this request's user, if any.
    fn load(&self, request: &Request) -> Result<Option<FlashScope>, StorageError>;

    /// Persists `flash`. Saving an empty flash behaves like [`clear`](Self::clear).
    fn save(
        &self,
        flash: &FlashScope,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<(), StorageError>;

    /// Forgets any previously persisted flash.
    fn clear(&self, request: &mut Request, response: &mut Response);
}
