//! Tag domain model and pure reconciliation planning.
//!
//! # Responsibility
//! - Define catalog (`Tag`) and association (`LinkedTag`) records.
//! - Normalize label text into its case-insensitive identity.
//! - Turn raw label input into a validated, de-duplicated desired set.
//! - Compute the minimal create/delete plan against current associations.
//!
//! # Invariants
//! - `normalize_label` is pure and changes case only; it never trims.
//! - Labels that normalize identically collapse to one desired entry, the
//!   later input winning the display text.
//! - Planning never proposes removing and adding the same identity at once.

use crate::model::entity::EntityRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate catalog row id.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TagId = i64;

/// Maximum label length in characters, matching the catalog column bound.
pub const MAX_LABEL_CHARS: usize = 256;

/// Maps a raw label to its canonical comparison identity.
///
/// Unicode uppercase mapping, locale-invariant and deterministic. Case is the
/// only transformation: surrounding whitespace is preserved, so `" rust "`
/// and `"rust"` are distinct identities.
pub fn normalize_label(label: &str) -> String {
    label.to_uppercase()
}

/// One catalog row: display text plus its normalized identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Stable catalog row id.
    pub id: TagId,
    /// Display text exactly as first supplied by a writer.
    pub name: String,
    /// Canonical uppercase identity, unique across the whole catalog.
    pub normalized_name: String,
}

/// Read model for one association joined with its catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedTag {
    /// Association row id; ascending ids define tag ordering per entity.
    pub link_id: i64,
    /// The catalog row this association points at.
    pub tag: Tag,
}

/// Label validation failure raised while building a desired set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// Label is empty or whitespace-only after trimming.
    Blank(String),
    /// Label exceeds [`MAX_LABEL_CHARS`].
    TooLong { length: usize, max: usize },
}

impl Display for LabelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(label) => write!(f, "blank tag label: `{label}`"),
            Self::TooLong { length, max } => {
                write!(f, "tag label of {length} chars exceeds maximum of {max}")
            }
        }
    }
}

impl Error for LabelError {}

/// Validated, de-duplicated target tag set for one entity.
///
/// Keys are normalized identities; values are the display text each identity
/// should carry if its catalog row does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredTags {
    entries: BTreeMap<String, String>,
}

impl DesiredTags {
    /// Builds the desired set from caller-supplied labels.
    ///
    /// Labels are taken in input order; when two normalize identically the
    /// later one supplies the display text. An empty slice is a valid input
    /// and means "remove every tag".
    ///
    /// # Errors
    /// - [`LabelError::Blank`] when a label trims to nothing.
    /// - [`LabelError::TooLong`] when a label exceeds [`MAX_LABEL_CHARS`].
    pub fn from_labels(labels: &[String]) -> Result<Self, LabelError> {
        let mut entries = BTreeMap::new();
        for label in labels {
            if label.trim().is_empty() {
                return Err(LabelError::Blank(label.clone()));
            }
            let length = label.chars().count();
            if length > MAX_LABEL_CHARS {
                return Err(LabelError::TooLong {
                    length,
                    max: MAX_LABEL_CHARS,
                });
            }
            entries.insert(normalize_label(label), label.clone());
        }
        Ok(Self { entries })
    }

    /// Number of distinct identities in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty (a full-clear request).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the given normalized identity is part of the set.
    pub fn contains_normalized(&self, normalized: &str) -> bool {
        self.entries.contains_key(normalized)
    }

    /// Display text to use when creating a row for `normalized`.
    pub fn display_for(&self, normalized: &str) -> Option<&str> {
        self.entries.get(normalized).map(String::as_str)
    }

    /// Iterates `(normalized, display)` pairs in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(normalized, display)| (normalized.as_str(), display.as_str()))
    }
}

/// Minimal write set turning current associations into the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Association row ids to delete, in current link order.
    pub remove_link_ids: Vec<i64>,
    /// Normalized identities with no current association, in identity order.
    pub missing_normalized: Vec<String>,
}

impl ReconcilePlan {
    /// Partitions current associations against the desired set.
    pub fn build(current: &[LinkedTag], desired: &DesiredTags) -> Self {
        let remove_link_ids = current
            .iter()
            .filter(|linked| !desired.contains_normalized(&linked.tag.normalized_name))
            .map(|linked| linked.link_id)
            .collect();

        let current_normalized: BTreeSet<&str> = current
            .iter()
            .map(|linked| linked.tag.normalized_name.as_str())
            .collect();
        let missing_normalized = desired
            .iter()
            .filter(|(normalized, _)| !current_normalized.contains(normalized))
            .map(|(normalized, _)| normalized.to_string())
            .collect();

        Self {
            remove_link_ids,
            missing_normalized,
        }
    }

    /// Whether applying this plan would write nothing.
    pub fn is_noop(&self) -> bool {
        self.remove_link_ids.is_empty() && self.missing_normalized.is_empty()
    }
}

/// Write counts observed by one `set_tags` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagSetOutcome {
    /// Catalog rows created because no identity existed yet.
    pub tags_created: usize,
    /// Associations inserted for this entity.
    pub links_added: usize,
    /// Associations deleted from this entity.
    pub links_removed: usize,
}

impl TagSetOutcome {
    /// Whether the call changed nothing (idempotent repeat).
    pub fn is_noop(&self) -> bool {
        self.tags_created == 0 && self.links_added == 0 && self.links_removed == 0
    }
}

/// Read model pairing an entity with the first link that matched a query.
///
/// Used by the any-of label query to keep result ordering deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEntity {
    /// The matched entity.
    pub entity: EntityRef,
    /// Smallest association id that matched the query for this entity.
    pub first_link_id: i64,
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_label, DesiredTags, LabelError, LinkedTag, ReconcilePlan, Tag, MAX_LABEL_CHARS,
    };

    fn linked(link_id: i64, tag_id: i64, name: &str) -> LinkedTag {
        LinkedTag {
            link_id,
            tag: Tag {
                id: tag_id,
                name: name.to_string(),
                normalized_name: normalize_label(name),
            },
        }
    }

    #[test]
    fn normalize_is_case_only() {
        assert_eq!(normalize_label("rust"), "RUST");
        assert_eq!(normalize_label(" rust "), " RUST ");
        assert_eq!(normalize_label("straße"), "STRASSE");
        assert_eq!(normalize_label("Go"), normalize_label("gO"));
    }

    #[test]
    fn desired_set_deduplicates_with_last_write_wins() {
        let desired = DesiredTags::from_labels(&[
            "Go".to_string(),
            "rust".to_string(),
            "GO".to_string(),
        ])
        .unwrap();

        assert_eq!(desired.len(), 2);
        assert_eq!(desired.display_for("GO"), Some("GO"));
        assert_eq!(desired.display_for("RUST"), Some("rust"));
    }

    #[test]
    fn desired_set_rejects_blank_labels() {
        let err = DesiredTags::from_labels(&["ok".to_string(), "   ".to_string()]).unwrap_err();
        assert!(matches!(err, LabelError::Blank(label) if label == "   "));
    }

    #[test]
    fn desired_set_rejects_overlong_labels() {
        let long = "x".repeat(MAX_LABEL_CHARS + 1);
        let err = DesiredTags::from_labels(&[long]).unwrap_err();
        assert!(matches!(
            err,
            LabelError::TooLong { length, max }
                if length == MAX_LABEL_CHARS + 1 && max == MAX_LABEL_CHARS
        ));
    }

    #[test]
    fn empty_input_is_a_valid_clear_request() {
        let desired = DesiredTags::from_labels(&[]).unwrap();
        assert!(desired.is_empty());
    }

    #[test]
    fn plan_is_noop_when_sets_match() {
        let current = vec![linked(1, 10, "work"), linked(2, 11, "home")];
        let desired =
            DesiredTags::from_labels(&["WORK".to_string(), "Home".to_string()]).unwrap();

        let plan = ReconcilePlan::build(&current, &desired);
        assert!(plan.is_noop());
    }

    #[test]
    fn plan_partitions_removals_and_missing() {
        let current = vec![linked(1, 10, "a"), linked(2, 11, "b")];
        let desired = DesiredTags::from_labels(&["b".to_string(), "c".to_string()]).unwrap();

        let plan = ReconcilePlan::build(&current, &desired);
        assert_eq!(plan.remove_link_ids, vec![1]);
        assert_eq!(plan.missing_normalized, vec!["C".to_string()]);
    }

    #[test]
    fn plan_clears_everything_for_empty_desired_set() {
        let current = vec![linked(7, 10, "a"), linked(9, 11, "b")];
        let desired = DesiredTags::from_labels(&[]).unwrap();

        let plan = ReconcilePlan::build(&current, &desired);
        assert_eq!(plan.remove_link_ids, vec![7, 9]);
        assert!(plan.missing_normalized.is_empty());
    }
}
