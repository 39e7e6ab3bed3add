//! Domain model for entity tagging and commenting.
//!
//! # Responsibility
//! - Define the records shared by repositories and services.
//! - Keep pure logic (normalization, desired-set building, reconciliation
//!   planning) free of any storage dependency.
//!
//! # Invariants
//! - Entities are referenced weakly by `kind` + `key`; the core never owns
//!   or mutates the referenced objects.
//! - Tag identity is the normalized label, unique across the whole catalog.

pub mod comment;
pub mod entity;
pub mod tag;
