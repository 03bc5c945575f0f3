//! Request and response model.
//!
//! These types are the boundary between the flash machinery and whatever web
//! framework embeds it. An adapter copies the incoming session and cookies into
//! a [`Request`], runs the middleware, and copies the outgoing cookies from the
//! [`Response`] back.

use crate::context::CONTEXT_VAR;
use crate::scope::FlashScope;
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use thiserror::Error;

/// Raised when the request attribute reserved for the flash holds something
/// other than a [`FlashScope`].
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid flash object under request attribute '{attribute}'")]
pub struct InvalidFlashObject {
    pub attribute: &'static str,
}

/// A per-user session: string keys mapped to JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    values: HashMap<String, Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An incoming request as seen by the flash middleware.
#[derive(Default)]
pub struct Request {
    /// Request path, used by static-asset predicates
    path: String,
    /// Typed, named attributes attached during processing
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,
    /// The user's session, if a session layer runs before the flash
    session: Option<Session>,
    /// Cookies sent by the client
    cookies: HashMap<String, String>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("path", &self.path)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("session", &self.session)
            .field("cookies", &self.cookies)
            .finish()
    }
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Gets the attribute `name` if it holds a `T`.
    pub fn attribute<T: Any>(&self, name: &str) -> Option<&T> {
        self.attributes
            .get(name)
            .and_then(|boxed| (**boxed).downcast_ref::<T>())
    }

    pub fn attribute_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.attributes
            .get_mut(name)
            .and_then(|boxed| (**boxed).downcast_mut::<T>())
    }

    pub fn set_attribute<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.attributes.insert(name.into(), Box::new(value));
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.attributes.remove(name)
    }

    // ========================================================================
    // Flash access
    // ========================================================================

    /// Returns the flash attached to this request.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(flash))` when a flash is attached
    /// - `Ok(None)` when nothing is attached under the flash attribute
    /// - `Err(InvalidFlashObject)` when something else is attached there
    pub fn flash(&self) -> Result<Option<&FlashScope>, InvalidFlashObject> {
        match self.attributes.get(CONTEXT_VAR) {
            None => Ok(None),
            Some(boxed) => (**boxed)
                .downcast_ref::<FlashScope>()
                .map(Some)
                .ok_or(InvalidFlashObject {
                    attribute: CONTEXT_VAR,
                }),
        }
    }

    pub fn flash_mut(&mut self) -> Result<Option<&mut FlashScope>, InvalidFlashObject> {
        match self.attributes.get_mut(CONTEXT_VAR) {
            None => Ok(None),
            Some(boxed) => (**boxed)
                .downcast_mut::<FlashScope>()
                .map(Some)
                .ok_or(InvalidFlashObject {
                    attribute: CONTEXT_VAR,
                }),
        }
    }

    /// Attaches `flash` under the flash attribute, replacing whatever was there.
    pub fn set_flash(&mut self, flash: FlashScope) {
        self.set_attribute(CONTEXT_VAR, flash);
    }

    /// Detaches and returns the flash.
    ///
    /// An attribute of the wrong type is left in place and reported as
    /// [`InvalidFlashObject`].
    pub fn take_flash(&mut self) -> Result<Option<FlashScope>, InvalidFlashObject> {
        let Some(boxed) = self.attributes.remove(CONTEXT_VAR) else {
            return Ok(None);
        };

        match boxed.downcast::<FlashScope>() {
            Ok(flash) => Ok(Some(*flash)),
            Err(other) => {
                self.attributes.insert(CONTEXT_VAR.to_string(), other);
                Err(InvalidFlashObject {
                    attribute: CONTEXT_VAR,
                })
            }
        }
    }

    // ========================================================================
    // Session & cookies
    // ========================================================================

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }
}

/// A cookie set by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub value: String,
    /// `Some(0)` expires the cookie immediately
    pub max_age: Option<i64>,
}

/// An outgoing response as seen by the flash middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    body: String,
    cookies: IndexMap<String, Cookie>,
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            cookies: IndexMap::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(
            name.into(),
            Cookie {
                value: value.into(),
                max_age: None,
            },
        );
    }

    /// Sets an empty cookie that expires immediately.
    pub fn delete_cookie(&mut self, name: impl Into<String>) {
        self.cookies.insert(
            name.into(),
            Cookie {
                value: String::new(),
                max_age: Some(0),
            },
        );
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn cookies(&self) -> impl Iterator<Item = (&str, &Cookie)> {
        self.cookies.iter().map(|(name, cookie)| (name.as_str(), cookie))
    }
}
