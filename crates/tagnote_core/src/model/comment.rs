//! Comment domain model.
//!
//! # Responsibility
//! - Define the entity-scoped annotation record.
//! - Validate body text before any storage work happens.
//!
//! # Invariants
//! - A persisted comment never changes; there is no edit operation.
//! - The commenter is optional and both halves of it are absent together.

use crate::model::entity::EntityRef;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate comment row id.
pub type CommentId = i64;

/// Maximum comment body length in characters, matching the column bound.
pub const MAX_COMMENT_CHARS: usize = 65_535;

/// One authored annotation attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Stable row id; ascending ids define listing order per entity.
    pub id: CommentId,
    /// The annotated entity (weak reference).
    pub entity: EntityRef,
    /// Authoring principal, or `None` for an anonymous comment.
    pub commenter: Option<EntityRef>,
    /// Immutable body text.
    pub body: String,
}

/// Body validation failure raised before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// Body is empty or whitespace-only after trimming.
    Blank,
    /// Body exceeds [`MAX_COMMENT_CHARS`].
    TooLong { length: usize, max: usize },
}

impl Display for BodyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "comment body is blank"),
            Self::TooLong { length, max } => {
                write!(f, "comment body of {length} chars exceeds maximum of {max}")
            }
        }
    }
}

impl Error for BodyError {}

/// Checks a comment body against the non-empty and length bounds.
pub fn validate_body(body: &str) -> Result<(), BodyError> {
    if body.trim().is_empty() {
        return Err(BodyError::Blank);
    }
    let length = body.chars().count();
    if length > MAX_COMMENT_CHARS {
        return Err(BodyError::TooLong {
            length,
            max: MAX_COMMENT_CHARS,
        });
    }
    Ok(())
}
