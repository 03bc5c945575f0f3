//! Request Context Module
//!
//! This module models the pieces of an HTTP exchange the flash needs: request
//! attributes, the session, cookies, and the template rendering context.
//!
//! The live [`FlashScope`](crate::FlashScope) is published under one fixed
//! name, [`CONTEXT_VAR`], both as a request attribute and as a template
//! variable.

pub mod request;
pub mod template;

// Re-export commonly used types
pub use request::{Cookie, InvalidFlashObject, Request, Response, Session};
pub use template::{template_context, TemplateContext};

/// Name under which the flash is exposed to handlers and templates
pub const CONTEXT_VAR: &str = "flash";
