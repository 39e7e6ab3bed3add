//! Runtime registration table for participating entity types.
//!
//! # Responsibility
//! - Bind each participating Rust type to a kind name and an explicit
//!   identity-extraction function.
//! - Mint `EntityRef` values for registered types.
//!
//! # Invariants
//! - Kind names are lowercase snake_case and unique.
//! - One registration per Rust type; identity extraction is always the
//!   supplied function, never field discovery by reflection.
//! - The registry is plain data built at startup; services consume
//!   `EntityRef` values and never depend on it.

use crate::model::entity::{EntityKey, EntityRef};
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::{type_name, Any, TypeId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static KIND_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid kind name regex"));

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Kind name is not lowercase snake_case.
    InvalidKind(String),
    /// Kind name is already taken by another type.
    DuplicateKind(String),
    /// The Rust type is already registered under another kind.
    DuplicateType(&'static str),
    /// The Rust type was never registered.
    TypeNotRegistered(&'static str),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(kind) => write!(f, "entity kind name is invalid: `{kind}`"),
            Self::DuplicateKind(kind) => write!(f, "entity kind already registered: `{kind}`"),
            Self::DuplicateType(type_name) => {
                write!(f, "entity type already registered: {type_name}")
            }
            Self::TypeNotRegistered(type_name) => {
                write!(f, "entity type not registered: {type_name}")
            }
        }
    }
}

impl Error for RegistryError {}

struct Registration {
    kind: String,
    // Holds a `fn(&E) -> EntityKey`, type-erased; keyed by `TypeId::of::<E>()`
    // so the downcast in `entity_ref` always succeeds.
    extractor: Box<dyn Any + Send + Sync>,
}

/// Startup-time table of entity kinds and their identity extractors.
#[derive(Default)]
pub struct EntityRegistry {
    by_type: BTreeMap<TypeId, Registration>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one entity type under a kind name.
    ///
    /// The extraction function is the type's capability contract: it maps
    /// a live entity to its comparable identity.
    ///
    /// # Errors
    /// - [`RegistryError::InvalidKind`] when the name is not lowercase
    ///   snake_case.
    /// - [`RegistryError::DuplicateKind`] when the name is taken.
    /// - [`RegistryError::DuplicateType`] when `E` is already bound.
    pub fn register<E: 'static>(
        &mut self,
        kind: &str,
        extract: fn(&E) -> EntityKey,
    ) -> Result<(), RegistryError> {
        if !KIND_NAME_RE.is_match(kind) {
            return Err(RegistryError::InvalidKind(kind.to_string()));
        }
        if self.is_registered_kind(kind) {
            return Err(RegistryError::DuplicateKind(kind.to_string()));
        }
        if self.by_type.contains_key(&TypeId::of::<E>()) {
            return Err(RegistryError::DuplicateType(type_name::<E>()));
        }

        self.by_type.insert(
            TypeId::of::<E>(),
            Registration {
                kind: kind.to_string(),
                extractor: Box::new(extract),
            },
        );
        Ok(())
    }

    /// Mints a weak reference for a registered entity.
    pub fn entity_ref<E: 'static>(&self, entity: &E) -> Result<EntityRef, RegistryError> {
        let registration = self
            .by_type
            .get(&TypeId::of::<E>())
            .ok_or(RegistryError::TypeNotRegistered(type_name::<E>()))?;
        let extract = registration
            .extractor
            .downcast_ref::<fn(&E) -> EntityKey>()
            .ok_or(RegistryError::TypeNotRegistered(type_name::<E>()))?;
        Ok(EntityRef {
            kind: registration.kind.clone(),
            key: extract(entity),
        })
    }

    /// Returns the kind name a type was registered under.
    pub fn kind_of<E: 'static>(&self) -> Result<&str, RegistryError> {
        self.by_type
            .get(&TypeId::of::<E>())
            .map(|registration| registration.kind.as_str())
            .ok_or(RegistryError::TypeNotRegistered(type_name::<E>()))
    }

    /// Whether a kind name is taken.
    pub fn is_registered_kind(&self, kind: &str) -> bool {
        self.by_type
            .values()
            .any(|registration| registration.kind == kind)
    }

    /// Returns all registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .by_type
            .values()
            .map(|registration| registration.kind.clone())
            .collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
