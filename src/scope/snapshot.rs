//! Flash Snapshots
//!
//! A [`Snapshot`] is the serializable form of a [`FlashScope`]. Storage
//! backends and codecs persist snapshots, never live scopes.
//!
//! ## Format
//!
//! ```text
//! {
//!   "entries": { "message": "Saved!", "count": 3 },
//!   "status":  { "message": "used",   "count": "fresh" }
//! }
//! ```
//!
//! A key listed in `entries` but not in `status` is fresh. Every key listed in
//! `status` must also be listed in `entries`.

use crate::scope::flash::{FlashScope, ScopeError, Status};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the section holding the stored values
pub const ENTRIES: &str = "entries";

/// Name of the section holding the lifecycle flags
pub const STATUS: &str = "status";

/// Persistable copy of a flash scope's entries and flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub entries: IndexMap<String, Value>,
    pub status: IndexMap<String, Status>,
}

impl Snapshot {
    /// Parses and validates a snapshot from its JSON form.
    ///
    /// Fails with [`ScopeError::InvalidSnapshot`] when the value is not an
    /// object, when a section is missing or is not an object, when an extra
    /// section is present, or when a flag is neither `"fresh"` nor `"used"`.
    pub fn from_value(data: &Value) -> Result<Self, ScopeError> {
        let object = data
            .as_object()
            .ok_or_else(|| invalid(format!("expected an object, found {}", kind(data))))?;

        let entries = section(object, ENTRIES)?;
        let status = section(object, STATUS)?;

        if let Some(extra) = object.keys().find(|k| *k != ENTRIES && *k != STATUS) {
            return Err(invalid(format!("unexpected section '{}'", extra)));
        }

        let status = status
            .iter()
            .map(|(key, flag)| {
                let flag = match flag.as_str() {
                    Some("fresh") => Status::Fresh,
                    Some("used") => Status::Used,
                    _ => {
                        return Err(invalid(format!(
                            "invalid status for key '{}': {}",
                            key, flag
                        )))
                    }
                };
                Ok((key.clone(), flag))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        let entries = entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self { entries, status })
    }

    /// Returns the snapshot as a JSON value.
    pub fn to_value(&self) -> Value {
        let entries: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let status: Map<String, Value> = self
            .status
            .iter()
            .map(|(key, flag)| {
                let flag = match flag {
                    Status::Fresh => "fresh",
                    Status::Used => "used",
                };
                (key.clone(), Value::from(flag))
            })
            .collect();

        let mut object = Map::new();
        object.insert(ENTRIES.to_string(), Value::Object(entries));
        object.insert(STATUS.to_string(), Value::Object(status));
        Value::Object(object)
    }
}

impl TryFrom<Snapshot> for FlashScope {
    type Error = ScopeError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        if let Some(orphan) = snapshot
            .status
            .keys()
            .find(|key| !snapshot.entries.contains_key(*key))
        {
            return Err(invalid(format!(
                "status for key '{}' without a matching entry",
                orphan
            )));
        }

        Ok(FlashScope::from_parts(snapshot.entries, snapshot.status))
    }
}

fn section<'a>(object: &'a Map<String, Value>, name: &str) -> Result<&'a Map<String, Value>, ScopeError> {
    match object.get(name) {
        Some(Value::Object(section)) => Ok(section),
        Some(other) => Err(invalid(format!(
            "section '{}' must be an object, found {}",
            name,
            kind(other)
        ))),
        None => Err(invalid(format!("missing section '{}'", name))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invalid(reason: String) -> ScopeError {
    ScopeError::InvalidSnapshot(reason)
}
