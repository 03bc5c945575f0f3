//! Flash Middleware Module
//!
//! This module ties the flash scope to the request-response cycle. It loads the
//! user's flash before the view runs, ages it, and persists whatever is left
//! once the response is ready.
//!
//! ## Architecture
//!
//! ```text
//! Incoming Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ FlashStorage    │  load()   (storage module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ FlashMiddleware │  (this module)
//! │                 │
//! │  - Advance      │
//! │  - Attach       │
//! │  - Persist      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ View            │  request.flash_mut()
//! └─────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! - A value set during request N is visible in N and N+1, then removed
//! - `keep` (or the [`keep_messages`] wrapper) grants one more request
//! - `now().set` and `discard` limit a value to the current request

pub mod handler;

// Re-export the middleware and the view wrapper
pub use handler::{keep_messages, FlashMiddleware, MiddlewareError, StaticPredicate};
