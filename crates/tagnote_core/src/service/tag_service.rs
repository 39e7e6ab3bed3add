//! Tag reconciliation use-case service.
//!
//! # Responsibility
//! - Validate and de-duplicate desired label sets before storage access.
//! - Drive reconciliation attempts, absorbing uniqueness races with a
//!   bounded retry.
//! - Provide the read paths: tags of one entity, entities by any-of labels,
//!   whole-catalog listing.
//!
//! # Invariants
//! - `DuplicateKey` never reaches the caller; after the attempt budget is
//!   spent the call fails with `RetryExhausted` instead.
//! - Cancellation is observed only between attempts, never inside one.
//! - Repeating `set_tags` with an unchanged set performs zero writes.

use crate::cancel::{CancellationToken, OperationCancelled};
use crate::model::entity::EntityRef;
use crate::model::tag::{normalize_label, DesiredTags, LabelError, Tag, TagSetOutcome};
use crate::repo::tag_repo::TagRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reconciliation attempts per `set_tags` call before giving up.
const MAX_SET_TAGS_ATTEMPTS: u32 = 3;

/// Service error for tag use-cases.
#[derive(Debug)]
pub enum TagServiceError {
    /// A desired label is empty or whitespace-only.
    InvalidLabel(String),
    /// A desired label exceeds the catalog column bound.
    LabelTooLong { length: usize, max: usize },
    /// Every reconciliation attempt lost a uniqueness race.
    RetryExhausted { attempts: u32 },
    /// The caller cancelled the operation at a checkpoint.
    Cancelled,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TagServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLabel(label) => write!(f, "invalid tag label: `{label}`"),
            Self::LabelTooLong { length, max } => {
                write!(f, "tag label of {length} chars exceeds maximum of {max}")
            }
            Self::RetryExhausted { attempts } => write!(
                f,
                "tag reconciliation lost a uniqueness race {attempts} times; giving up"
            ),
            Self::Cancelled => write!(f, "operation cancelled by caller"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TagServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LabelError> for TagServiceError {
    fn from(value: LabelError) -> Self {
        match value {
            LabelError::Blank(label) => Self::InvalidLabel(label),
            LabelError::TooLong { length, max } => Self::LabelTooLong { length, max },
        }
    }
}

impl From<OperationCancelled> for TagServiceError {
    fn from(_: OperationCancelled) -> Self {
        Self::Cancelled
    }
}

impl From<RepoError> for TagServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Tag service facade over repository implementations.
pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Reconciles the entity's tag set to exactly `labels`.
    ///
    /// Labels are de-duplicated by case-insensitive identity (later input
    /// wins the display text); an empty slice removes every tag while
    /// leaving catalog rows in place. The returned outcome carries the
    /// write counts of the committed attempt, so an idempotent repeat
    /// reports all zeros.
    ///
    /// # Errors
    /// - [`TagServiceError::InvalidLabel`] / [`TagServiceError::LabelTooLong`]
    ///   on bad input, before any storage access.
    /// - [`TagServiceError::RetryExhausted`] when every attempt lost a
    ///   catalog uniqueness race to concurrent writers.
    /// - [`TagServiceError::Cancelled`] when the token trips at a
    ///   checkpoint between attempts.
    pub fn set_tags(
        &mut self,
        entity: &EntityRef,
        labels: &[String],
        cancel: &CancellationToken,
    ) -> Result<TagSetOutcome, TagServiceError> {
        cancel.checkpoint()?;
        let desired = DesiredTags::from_labels(labels)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            cancel.checkpoint()?;
            match self.repo.set_entity_tags(entity, &desired) {
                Ok(outcome) => {
                    info!(
                        "event=set_tags module=tag_service status=ok entity_kind={} desired={} \
                         tags_created={} links_added={} links_removed={} attempt={attempt}",
                        entity.kind,
                        desired.len(),
                        outcome.tags_created,
                        outcome.links_added,
                        outcome.links_removed
                    );
                    return Ok(outcome);
                }
                Err(RepoError::DuplicateKey { detail }) => {
                    if attempt >= MAX_SET_TAGS_ATTEMPTS {
                        warn!(
                            "event=set_tags module=tag_service status=error entity_kind={} \
                             error_code=retry_exhausted attempt={attempt}",
                            entity.kind
                        );
                        return Err(TagServiceError::RetryExhausted { attempts: attempt });
                    }
                    // Lost the catalog race; a fresh attempt re-reads the
                    // winner's committed rows and resolves against them.
                    warn!(
                        "event=set_tags module=tag_service status=retry entity_kind={} \
                         attempt={attempt} detail={detail}",
                        entity.kind
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Returns the entity's tag display names in link insertion order.
    ///
    /// Ordering is a contract of this implementation: links that survive
    /// reconciliation keep their position and newly added tags append.
    pub fn get_tags(
        &self,
        entity: &EntityRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TagServiceError> {
        cancel.checkpoint()?;
        let links = self.repo.list_entity_tags(entity)?;
        Ok(links.into_iter().map(|linked| linked.tag.name).collect())
    }

    /// Finds entities tagged with **any** of the given labels.
    ///
    /// Query labels are normalized, never validated: blank or unknown
    /// labels simply match nothing. Each entity appears once, ordered by
    /// its earliest matching link.
    pub fn tagged_entities(
        &self,
        labels: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<EntityRef>, TagServiceError> {
        cancel.checkpoint()?;
        let normalized: BTreeSet<String> = labels
            .iter()
            .map(|label| normalize_label(label))
            .collect();
        let normalized: Vec<String> = normalized.into_iter().collect();
        let matches = self.repo.entities_with_any(&normalized)?;
        Ok(matches.into_iter().map(|hit| hit.entity).collect())
    }

    /// Lists the whole catalog sorted by normalized name.
    ///
    /// Includes orphaned tags no entity references anymore.
    pub fn list_tags(&self, cancel: &CancellationToken) -> Result<Vec<Tag>, TagServiceError> {
        cancel.checkpoint()?;
        Ok(self.repo.list_catalog()?)
    }
}

#[cfg(test)]
mod tests {
    use super::{TagService, TagServiceError, MAX_SET_TAGS_ATTEMPTS};
    use crate::cancel::CancellationToken;
    use crate::model::entity::EntityRef;
    use crate::model::tag::{DesiredTags, LinkedTag, Tag, TagSetOutcome, TaggedEntity};
    use crate::repo::tag_repo::TagRepository;
    use crate::repo::{RepoError, RepoResult};
    use std::cell::Cell;

    /// Repository double that fails the first N attempts with DuplicateKey.
    struct RacingRepo {
        failures_left: Cell<u32>,
        attempts: Cell<u32>,
    }

    impl RacingRepo {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: Cell::new(times),
                attempts: Cell::new(0),
            }
        }
    }

    impl TagRepository for RacingRepo {
        fn set_entity_tags(
            &mut self,
            _entity: &EntityRef,
            desired: &DesiredTags,
        ) -> RepoResult<TagSetOutcome> {
            self.attempts.set(self.attempts.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(RepoError::DuplicateKey {
                    detail: "UNIQUE constraint failed: tags.normalized_name".to_string(),
                });
            }
            Ok(TagSetOutcome {
                tags_created: desired.len(),
                links_added: desired.len(),
                links_removed: 0,
            })
        }

        fn list_entity_tags(&self, _entity: &EntityRef) -> RepoResult<Vec<LinkedTag>> {
            Ok(Vec::new())
        }

        fn entities_with_any(&self, _normalized: &[String]) -> RepoResult<Vec<TaggedEntity>> {
            Ok(Vec::new())
        }

        fn list_catalog(&self) -> RepoResult<Vec<Tag>> {
            Ok(Vec::new())
        }
    }

    fn entity() -> EntityRef {
        EntityRef::new("article", "a-1")
    }

    #[test]
    fn set_tags_recovers_from_a_lost_race() {
        let mut service = TagService::new(RacingRepo::failing(1));
        let outcome = service
            .set_tags(&entity(), &["new".to_string()], &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.links_added, 1);
        assert_eq!(service.repo.attempts.get(), 2);
    }

    #[test]
    fn set_tags_gives_up_after_the_attempt_budget() {
        let mut service = TagService::new(RacingRepo::failing(MAX_SET_TAGS_ATTEMPTS));
        let err = service
            .set_tags(&entity(), &["new".to_string()], &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(
            err,
            TagServiceError::RetryExhausted { attempts } if attempts == MAX_SET_TAGS_ATTEMPTS
        ));
        assert_eq!(service.repo.attempts.get(), MAX_SET_TAGS_ATTEMPTS);
    }

    #[test]
    fn set_tags_rejects_blank_labels_before_storage() {
        let mut service = TagService::new(RacingRepo::failing(0));
        let err = service
            .set_tags(&entity(), &["  ".to_string()], &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, TagServiceError::InvalidLabel(_)));
        assert_eq!(service.repo.attempts.get(), 0);
    }

    #[test]
    fn cancelled_token_stops_before_any_attempt() {
        let mut service = TagService::new(RacingRepo::failing(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .set_tags(&entity(), &["tag".to_string()], &cancel)
            .unwrap_err();
        assert!(matches!(err, TagServiceError::Cancelled));
        assert_eq!(service.repo.attempts.get(), 0);
    }

    #[test]
    fn tagged_entities_deduplicates_query_labels_by_identity() {
        let service = TagService::new(RacingRepo::failing(0));
        let result = service
            .tagged_entities(
                &["Go".to_string(), "GO".to_string()],
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(result.is_empty());
    }
}
