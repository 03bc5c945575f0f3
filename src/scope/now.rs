//! Immediate values.
//!
//! [`Now`] is a borrowed view over a [`FlashScope`]. Whatever it writes is
//! visible to the current request and marked used right away, so the next
//! `advance` removes it.

use crate::scope::flash::{FlashScope, ScopeError};
use serde_json::Value;

/// Write-through view that stores values for the current request only.
///
/// # Example
///
/// ```
/// use flashscope::FlashScope;
///
/// let mut flash = FlashScope::new();
/// flash.now().set("notice", "Nice!");
/// assert!(flash.contains("notice"));
///
/// flash.advance();
/// assert!(!flash.contains("notice"));
/// ```
#[derive(Debug)]
pub struct Now<'a> {
    scope: &'a mut FlashScope,
}

impl<'a> Now<'a> {
    pub(crate) fn new(scope: &'a mut FlashScope) -> Self {
        Self { scope }
    }

    /// Stores a value visible only until the next `advance`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.scope.set(key.clone(), value);
        self.scope.discard(&key);
    }

    /// Applies [`set`](Self::set) to every pair.
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

    /// Appends values like [`FlashScope::add`], then marks the entry used.
    pub fn add<I>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let key = key.into();
        self.scope.add(key.clone(), values);
        self.scope.discard(&key);
    }

    /// Reads through to the underlying scope.
    pub fn get(&self, key: &str) -> Result<&Value, ScopeError> {
        self.scope.get(key)
    }

    /// Returns true if the underlying scope holds `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.scope.contains(key)
    }
}
