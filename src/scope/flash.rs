//! The Flash Scope
//!
//! This module implements [`FlashScope`], a small ordered key-value map whose
//! entries live for a bounded number of request-response cycles.
//!
//! ## Lifecycle
//!
//! Every entry carries a [`Status`] flag. The middleware calls
//! [`FlashScope::advance`] once when a request arrives, *before* the handler
//! runs:
//!
//! ```text
//!   request N            request N+1           request N+2
//! ┌──────────────┐     ┌──────────────┐      ┌──────────────┐
//! │ advance()    │     │ advance()    │      │ advance()    │
//! │ set("m", X)  │────>│ "m" is used  │─────>│ "m" removed  │
//! │ "m" is fresh │     │ "m" visible  │      │              │
//! └──────────────┘     └──────────────┘      └──────────────┘
//! ```
//!
//! - `set` stores a value as **fresh**: visible now and during the next request.
//! - `now().set` stores a value as **used**: visible now, removed by the next
//!   `advance`.
//! - `discard` marks an entry as used, `keep` marks it fresh again.
//! - `advance` removes used entries and marks the survivors as used.
//!
//! Every entry held by the scope is visible to readers. The flag only decides
//! whether the next `advance` removes it.

use crate::scope::now::Now;
use crate::scope::snapshot::Snapshot;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by flash scope operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScopeError {
    /// Indexed access or deletion of a key that is not in the scope
    #[error("key not found in flash: '{0}'")]
    KeyNotFound(String),

    /// Persisted data does not have the shape of a flash snapshot
    #[error("invalid flash snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Lifecycle flag of a flash entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Survives the next `advance`
    #[default]
    Fresh,
    /// Removed by the next `advance`
    Used,
}

/// A per-user map of short-lived values.
///
/// # Example
///
/// ```
/// use flashscope::FlashScope;
///
/// let mut flash = FlashScope::new();
/// flash.set("message", "Saved!");
/// assert_eq!(flash.get("message").unwrap(), "Saved!");
///
/// // Next request: still visible
/// flash.advance();
/// assert!(flash.contains("message"));
///
/// // The request after that: gone
/// flash.advance();
/// assert!(!flash.contains("message"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlashScope {
    /// The stored values, in insertion order
    entries: IndexMap<String, Value>,
    /// Lifecycle flags. A key missing here is fresh.
    status: IndexMap<String, Status>,
}

impl PartialEq for FlashScope {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
            && self
                .entries
                .keys()
                .all(|key| self.status_of(key) == other.status_of(key))
    }
}

impl FlashScope {
    /// Creates an empty flash scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a flash scope from its persisted JSON form.
    ///
    /// The value must be an object holding exactly an `entries` object and a
    /// `status` object whose keys all appear in `entries`.
    pub fn from_snapshot(data: &Value) -> Result<Self, ScopeError> {
        Snapshot::from_value(data)?.try_into()
    }

    /// Builds a scope from already validated parts.
    pub(crate) fn from_parts(
        entries: IndexMap<String, Value>,
        status: IndexMap<String, Status>,
    ) -> Self {
        Self { entries, status }
    }

    /// Returns an independent copy of the scope's entries and flags.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.clone(),
            status: self.status.clone(),
        }
    }

    /// Returns the snapshot of this scope as a JSON value.
    pub fn to_value(&self) -> Value {
        self.to_snapshot().to_value()
    }

    #[inline]
    fn status_of(&self, key: &str) -> Status {
        self.status.get(key).copied().unwrap_or_default()
    }

    // ========================================================================
    // READ OPERATIONS
    // ========================================================================

    /// Returns true if a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Gets the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<&Value, ScopeError> {
        self.entries
            .get(key)
            .ok_or_else(|| ScopeError::KeyNotFound(key.to_owned()))
    }

    /// Gets the value stored under `key`, or `default` if there is none.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.entries.get(key) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }

    /// Returns whether the entry under `key` is marked used.
    ///
    /// Returns `None` if the key is not in the scope.
    pub fn is_used(&self, key: &str) -> Option<bool> {
        self.entries
            .contains_key(key)
            .then(|| self.status_of(key) == Status::Used)
    }

    /// Returns the stored keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the stored values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    /// Returns every entry, used or fresh, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the scope holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Stores a value that stays visible during this request and the next one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.status.insert(key.clone(), Status::Fresh);
        self.entries.insert(key, value.into());
    }

    /// Stores several values at once, exactly like repeated [`set`](Self::set).
    pub fn put_many<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.set(key, value);
        }
    }

    /// Appends values to the list stored under `key`.
    ///
    /// A missing key starts a new list. A scalar already stored under the key
    /// becomes the first element of the list. The entry is marked fresh.
    pub fn add<I>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let key = key.into();
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Value::Array(Vec::new()));

        if !entry.is_array() {
            let scalar = entry.take();
            *entry = Value::Array(vec![scalar]);
        }
        if let Value::Array(list) = entry {
            list.extend(values.into_iter().map(Into::into));
        }

        self.status.insert(key, Status::Fresh);
    }

    /// Removes and returns the value under `key`.
    pub fn delete(&mut self, key: &str) -> Result<Value, ScopeError> {
        self.pop(key)
            .ok_or_else(|| ScopeError::KeyNotFound(key.to_owned()))
    }

    /// Removes and returns the value under `key`, if any.
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        self.status.shift_remove(key);
        self.entries.shift_remove(key)
    }

    /// Removes every entry, regardless of its status.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.status.clear();
    }

    /// Returns a view whose writes are visible only during this request.
    pub fn now(&mut self) -> Now<'_> {
        Now::new(self)
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Marks `key` for removal on the next `advance`. Missing keys are ignored.
    pub fn discard(&mut self, key: &str) {
        if self.entries.contains_key(key) {
            self.status.insert(key.to_owned(), Status::Used);
        }
    }

    /// Marks every entry for removal on the next `advance`.
    pub fn discard_all(&mut self) {
        for key in self.entries.keys() {
            self.status.insert(key.clone(), Status::Used);
        }
    }

    /// Cancels a pending removal of `key`, keeping it for one more request.
    ///
    /// Keeping a fresh or missing key does nothing.
    pub fn keep(&mut self, key: &str) {
        if let Some(status) = self.status.get_mut(key) {
            *status = Status::Fresh;
        }
    }

    /// Keeps every entry for one more request.
    pub fn keep_all(&mut self) {
        for status in self.status.values_mut() {
            *status = Status::Fresh;
        }
    }

    /// Keeps the given keys, or every entry when `keys` is empty.
    pub fn keep_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        if keys.is_empty() {
            self.keep_all();
        } else {
            for key in keys {
                self.keep(key.as_ref());
            }
        }
    }

    /// Ages the scope by one request.
    ///
    /// Removes every entry marked used, then marks the remaining entries used
    /// so they expire on the following call unless kept.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn advance(&mut self) -> usize {
        let before = self.entries.len();

        let status = &self.status;
        self.entries
            .retain(|key, _| status.get(key) != Some(&Status::Used));

        self.status = self
            .entries
            .keys()
            .map(|key| (key.clone(), Status::Used))
            .collect();

        before - self.entries.len()
    }
}
