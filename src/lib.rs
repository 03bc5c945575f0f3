//! # flashscope - Short-Lived Per-User Messages
//!
//! A flash is a small key-value store attached to a user's requests. A value
//! set while handling one request is still readable on the next one and is
//! removed automatically after that, which makes it the usual vehicle for
//! "Your changes were saved" notices shown after a redirect.
//!
//! ## Features
//!
//! - **Two-request lifetime**: values survive the request that set them and the next one
//! - **Fine-grained control**: keep a value longer, discard it early, or show it only now
//! - **Pluggable storage**: session-backed or signed-cookie backed, or your own backend
//! - **Tamper detection**: cookie payloads carry an HMAC-SHA256 tag
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              flashscope                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────────┐    ┌─────────────┐              │
//! │  │ FlashConfig │───>│ FlashMiddleware │───>│    View     │              │
//! │  │  (startup)  │    │  start / end    │    │ flash_mut() │              │
//! │  └─────────────┘    └────────┬────────┘    └──────┬──────┘              │
//! │                              │                    │                     │
//! │                              ▼                    ▼                     │
//! │  ┌───────────────────────────────────┐    ┌─────────────────────┐       │
//! │  │        FlashStorage               │    │     FlashScope      │       │
//! │  │  ┌──────────┐  ┌───────────────┐  │    │  entries + status   │       │
//! │  │  │ Session  │  │ Cookie        │  │    │  Now (immediate)    │       │
//! │  │  └──────────┘  └───────┬───────┘  │    └─────────────────────┘       │
//! │  └────────────────────────┼──────────┘                                  │
//! │                           ▼                                             │
//! │             ┌──────────────────────────────┐                            │
//! │             │ Signer + Codec               │                            │
//! │             │ (json, json_zstd, binary)    │                            │
//! │             └──────────────────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashscope::context::{Request, Response, Session};
//! use flashscope::storage::SessionStorage;
//! use flashscope::FlashMiddleware;
//! use std::sync::Arc;
//!
//! let middleware = FlashMiddleware::new(Arc::new(SessionStorage::new()));
//!
//! // Request 1: the view sets a message and redirects
//! let mut request = Request::new("/save").with_session(Session::new());
//! middleware
//!     .process(&mut request, |request| {
//!         if let Ok(Some(flash)) = request.flash_mut() {
//!             flash.set("message", "Saved!");
//!         }
//!         Response::new(302)
//!     })
//!     .unwrap();
//! let session = request.session().cloned().unwrap();
//!
//! // Request 2: the message is still there
//! let mut request = Request::new("/").with_session(session);
//! middleware.process(&mut request, |_| Response::ok()).unwrap();
//! assert_eq!(request.flash().unwrap().unwrap().get("message").unwrap(), "Saved!");
//! ```
//!
//! ## Lifecycle
//!
//! | Operation          | Current request | Next request | Request after |
//! |--------------------|-----------------|--------------|---------------|
//! | `set`              | visible         | visible      | removed       |
//! | `set` + `keep`     | visible         | visible      | visible       |
//! | `now().set`        | visible         | removed      |               |
//! | `set` + `discard`  | visible         | removed      |               |
//!
//! ## Module Overview
//!
//! - [`scope`]: the flash itself and its snapshot format
//! - [`codec`]: byte encodings and payload signing
//! - [`storage`]: backends that persist flashes between requests
//! - [`context`]: request, response and template views of the flash
//! - [`middleware`]: loads, ages and persists the flash around each request
//! - [`config`]: startup configuration

pub mod codec;
pub mod config;
pub mod context;
pub mod middleware;
pub mod scope;
pub mod storage;

// Re-export commonly used types for convenience
pub use codec::{Codec, CodecError, Signer};
pub use config::{CodecKind, ConfigError, FlashConfig, StorageKind};
pub use context::{template_context, Request, Response, CONTEXT_VAR};
pub use middleware::{keep_messages, FlashMiddleware, MiddlewareError};
pub use scope::{FlashScope, Now, ScopeError, Snapshot, Status};
pub use storage::{CookieStorage, FlashStorage, SessionStorage, StorageError};

/// Version of flashscope
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
