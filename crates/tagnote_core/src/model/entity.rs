//! Opaque entity identity model.
//!
//! # Responsibility
//! - Define the caller-owned identity shape (`kind` + `key`) that tag and
//!   comment records point at.
//! - Keep identity rendering stable so storage lookups stay comparable.
//!
//! # Invariants
//! - `EntityKey` renders once at construction and never changes afterwards.
//! - The core never dereferences an `EntityRef` back into a live entity;
//!   references are weak by design.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, comparable entity identifier rendered to a stable string.
///
/// Callers own the real identity (an integer row id, a UUID, a slug). The
/// core only needs equality and storage, so every source type is rendered to
/// text once, up front.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wraps an already-rendered identity value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the stable textual form used by storage.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for EntityKey {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for EntityKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Weak reference to one caller-owned entity.
///
/// `kind` names a participating entity type (see the registry module for the
/// registration contract); `key` is the rendered identity within that kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Registered entity kind name, lowercase snake_case.
    pub kind: String,
    /// Rendered identity, unique within `kind` by caller contract.
    pub key: EntityKey,
}

impl EntityRef {
    /// Builds a reference from a kind name and any convertible key value.
    pub fn new(kind: impl Into<String>, key: impl Into<EntityKey>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}
