//! Identity of objects passed to `save` and `delete`.
//!
//! # Design
//! Whether an object carries an identifier is the only thing that decides
//! between create and update (for `save`) or delete-by-id and
//! delete-by-filter (for `delete`). `Persistable` makes that check an
//! explicit predicate instead of relying on whatever field happens to exist.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An object that may carry a backend identifier.
pub trait Persistable {
    /// The identifier as it appears in a resource path, if any.
    fn id(&self) -> Option<String>;

    fn has_id(&self) -> bool {
        self.id().is_some()
    }
}

/// Backend identifier, numeric or textual on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Num(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Num(n.into())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Num(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}

/// Generic persistable shape: an optional `id` next to the flattened fields
/// of `T`. The `id` key is left out of the JSON entirely when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(data: T) -> Self {
        Self { id: None, data }
    }

    pub fn with_id(id: impl Into<Id>, data: T) -> Self {
        Self {
            id: Some(id.into()),
            data,
        }
    }
}

impl<T> Persistable for Record<T> {
    fn id(&self) -> Option<String> {
        match &self.id {
            Some(Id::Text(s)) if s.is_empty() => None,
            Some(id) => Some(id.to_string()),
            None => None,
        }
    }
}

/// Looks at the `id` field of a JSON object. Strings and numbers count,
/// except for the empty string; `0` is a valid identifier.
impl Persistable for Value {
    fn id(&self) -> Option<String> {
        match self.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl<P: Persistable> Persistable for Option<P> {
    fn id(&self) -> Option<String> {
        self.as_ref().and_then(Persistable::id)
    }
}

impl<P: Persistable + ?Sized> Persistable for &P {
    fn id(&self) -> Option<String> {
        (**self).id()
    }
}
