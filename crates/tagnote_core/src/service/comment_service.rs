//! Comment use-case service.
//!
//! # Responsibility
//! - Validate comment bodies before storage access.
//! - Provide append/remove/list entry points over the comment repository.
//!
//! # Invariants
//! - A `None` commenter is a valid, anonymous authorship.
//! - Comments are immutable after insert; there is no edit entry point.

use crate::cancel::{CancellationToken, OperationCancelled};
use crate::model::comment::{validate_body, BodyError, Comment, CommentId};
use crate::model::entity::EntityRef;
use crate::repo::comment_repo::CommentRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for comment use-cases.
#[derive(Debug)]
pub enum CommentServiceError {
    /// Body is empty or whitespace-only.
    EmptyBody,
    /// Body exceeds the column bound.
    BodyTooLong { length: usize, max: usize },
    /// Target comment does not exist.
    CommentNotFound(CommentId),
    /// The caller cancelled the operation at a checkpoint.
    Cancelled,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CommentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "comment body is blank"),
            Self::BodyTooLong { length, max } => {
                write!(f, "comment body of {length} chars exceeds maximum of {max}")
            }
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::Cancelled => write!(f, "operation cancelled by caller"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CommentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BodyError> for CommentServiceError {
    fn from(value: BodyError) -> Self {
        match value {
            BodyError::Blank => Self::EmptyBody,
            BodyError::TooLong { length, max } => Self::BodyTooLong { length, max },
        }
    }
}

impl From<OperationCancelled> for CommentServiceError {
    fn from(_: OperationCancelled) -> Self {
        Self::Cancelled
    }
}

impl From<RepoError> for CommentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::CommentNotFound(id) => Self::CommentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Comment service facade over repository implementations.
pub struct CommentService<R: CommentRepository> {
    repo: R,
}

impl<R: CommentRepository> CommentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends one comment to the entity and returns the persisted record.
    ///
    /// # Errors
    /// - [`CommentServiceError::EmptyBody`] / [`CommentServiceError::BodyTooLong`]
    ///   on bad input, before any storage access.
    pub fn add_comment(
        &self,
        entity: &EntityRef,
        commenter: Option<&EntityRef>,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<Comment, CommentServiceError> {
        cancel.checkpoint()?;
        validate_body(body)?;

        let comment = self.repo.insert_comment(entity, commenter, body)?;
        info!(
            "event=add_comment module=comment_service status=ok entity_kind={} \
             comment_id={} anonymous={}",
            entity.kind,
            comment.id,
            commenter.is_none()
        );
        Ok(comment)
    }

    /// Removes one comment by id.
    ///
    /// # Errors
    /// - [`CommentServiceError::CommentNotFound`] when no such row exists;
    ///   the table is left unchanged.
    pub fn remove_comment(
        &self,
        id: CommentId,
        cancel: &CancellationToken,
    ) -> Result<(), CommentServiceError> {
        cancel.checkpoint()?;
        self.repo.delete_comment(id)?;
        info!("event=remove_comment module=comment_service status=ok comment_id={id}");
        Ok(())
    }

    /// Lists the entity's comments in insertion order, anonymous ones
    /// included.
    pub fn list_comments(
        &self,
        entity: &EntityRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>, CommentServiceError> {
        cancel.checkpoint()?;
        Ok(self.repo.list_for_entity(entity)?)
    }
}
