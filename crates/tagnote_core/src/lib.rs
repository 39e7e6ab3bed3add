//! Core domain logic for entity tagging and commenting.
//! This crate is the single source of truth for reconciliation invariants.

pub mod cancel;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use cancel::{CancellationToken, OperationCancelled};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::comment::{validate_body, BodyError, Comment, CommentId, MAX_COMMENT_CHARS};
pub use model::entity::{EntityKey, EntityRef};
pub use model::tag::{
    normalize_label, DesiredTags, LabelError, LinkedTag, ReconcilePlan, Tag, TagId, TagSetOutcome,
    TaggedEntity, MAX_LABEL_CHARS,
};
pub use registry::{EntityRegistry, RegistryError};
pub use repo::comment_repo::{CommentRepository, SqliteCommentRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::{RepoError, RepoResult};
pub use service::comment_service::{CommentService, CommentServiceError};
pub use service::tag_service::{TagService, TagServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
