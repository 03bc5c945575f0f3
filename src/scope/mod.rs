//! Flash Scope Module
//!
//! This module provides the flash scope itself: an ordered key-value map whose
//! entries expire after a bounded number of requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 FlashScope                  │
//! │  entries: key -> value  (insertion order)   │
//! │  status:  key -> fresh | used               │
//! └──────────────┬───────────────────┬──────────┘
//!                │ borrows           │ copies
//!                ▼                   ▼
//!        ┌──────────────┐    ┌──────────────┐
//!        │     Now      │    │   Snapshot   │
//!        │ (immediate)  │    │ (persisted)  │
//!        └──────────────┘    └──────────────┘
//! ```
//!
//! - [`FlashScope`]: the mutable store and its lifecycle rules
//! - [`Now`]: a view whose writes expire after the current request
//! - [`Snapshot`]: the serializable form used by storage backends and codecs

pub mod flash;
pub mod now;
pub mod snapshot;

// Re-export commonly used types
pub use flash::{FlashScope, ScopeError, Status};
pub use now::Now;
pub use snapshot::Snapshot;
