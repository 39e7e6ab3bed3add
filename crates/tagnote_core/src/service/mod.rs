//! Use-case facades over the repository layer.
//!
//! # Responsibility
//! - Validate caller input before any storage access happens.
//! - Orchestrate reconciliation retries and cancellation checkpoints.
//! - Keep services storage-agnostic behind the repository traits.

pub mod comment_service;
pub mod tag_service;
