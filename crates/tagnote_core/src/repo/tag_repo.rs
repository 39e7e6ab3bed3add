//! Tag catalog and association persistence over SQLite.
//!
//! # Responsibility
//! - Provide the storage binding behind tag reconciliation and tag queries.
//! - Apply one reconciliation attempt atomically inside a single
//!   `IMMEDIATE` transaction.
//! - Keep the catalog shared across all entity kinds.
//!
//! # Invariants
//! - `set_entity_tags` either commits the whole plan or persists nothing.
//! - A uniqueness race with a concurrent writer surfaces as
//!   `RepoError::DuplicateKey` and leaves the attempt rolled back; the
//!   service layer decides whether to retry.
//! - Per-entity tag ordering is ascending link id; reconciliation never
//!   touches links that survive, so positions are stable across calls.

use crate::db::migrations::latest_version;
use crate::model::entity::EntityRef;
use crate::model::tag::{
    DesiredTags, LinkedTag, ReconcilePlan, Tag, TagId, TagSetOutcome, TaggedEntity,
};
use crate::repo::{
    connection_user_version, table_exists, table_has_column, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

/// Repository interface for tag reconciliation and queries.
pub trait TagRepository {
    /// Runs one reconciliation attempt for the entity against the desired
    /// set. Returns the write counts of the committed attempt.
    fn set_entity_tags(
        &mut self,
        entity: &EntityRef,
        desired: &DesiredTags,
    ) -> RepoResult<TagSetOutcome>;
    /// Lists the entity's associations joined with catalog rows, in link
    /// insertion order.
    fn list_entity_tags(&self, entity: &EntityRef) -> RepoResult<Vec<LinkedTag>>;
    /// Finds entities linked to any of the normalized identities, each
    /// entity once, ordered by its earliest matching link id.
    fn entities_with_any(&self, normalized: &[String]) -> RepoResult<Vec<TaggedEntity>>;
    /// Lists the whole catalog sorted by normalized name.
    fn list_catalog(&self) -> RepoResult<Vec<Tag>>;
}

/// SQLite-backed tag repository.
#[derive(Debug)]
pub struct SqliteTagRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tag_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn set_entity_tags(
        &mut self,
        entity: &EntityRef,
        desired: &DesiredTags,
    ) -> RepoResult<TagSetOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_entity_links(&tx, entity)?;
        let plan = ReconcilePlan::build(&current, desired);
        if plan.is_noop() {
            tx.commit()?;
            return Ok(TagSetOutcome::default());
        }

        // Resolve the missing identities against the catalog, then create
        // rows for whatever is still unresolved. A concurrent writer that
        // inserts the same normalized name first makes the INSERT fail the
        // UNIQUE constraint; the error converts to DuplicateKey and the
        // dropped transaction rolls the attempt back.
        let mut resolved = find_by_normalized(&tx, &plan.missing_normalized)?;
        let mut tags_created = 0usize;
        for normalized in &plan.missing_normalized {
            if resolved.contains_key(normalized.as_str()) {
                continue;
            }
            let display = desired.display_for(normalized).unwrap_or(normalized);
            tx.execute(
                "INSERT INTO tags (name, normalized_name) VALUES (?1, ?2);",
                params![display, normalized.as_str()],
            )?;
            resolved.insert(normalized.clone(), tx.last_insert_rowid());
            tags_created += 1;
        }

        let mut links_added = 0usize;
        for normalized in &plan.missing_normalized {
            // Every missing identity is resolved at this point.
            if let Some(tag_id) = resolved.get(normalized.as_str()) {
                tx.execute(
                    "INSERT INTO tag_links (tag_id, entity_kind, entity_key)
                     VALUES (?1, ?2, ?3);",
                    params![tag_id, entity.kind.as_str(), entity.key.as_str()],
                )?;
                links_added += 1;
            }
        }

        let mut links_removed = 0usize;
        for link_id in &plan.remove_link_ids {
            links_removed += tx.execute("DELETE FROM tag_links WHERE id = ?1;", [link_id])?;
        }

        tx.commit()?;
        Ok(TagSetOutcome {
            tags_created,
            links_added,
            links_removed,
        })
    }

    fn list_entity_tags(&self, entity: &EntityRef) -> RepoResult<Vec<LinkedTag>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, t.id, t.name, t.normalized_name
             FROM tag_links l
             INNER JOIN tags t ON t.id = l.tag_id
             WHERE l.entity_kind = ?1
               AND l.entity_key = ?2
             ORDER BY l.id ASC;",
        )?;
        let mut rows = stmt.query(params![entity.kind.as_str(), entity.key.as_str()])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(LinkedTag {
                link_id: row.get(0)?,
                tag: Tag {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    normalized_name: row.get(3)?,
                },
            });
        }
        Ok(links)
    }

    fn entities_with_any(&self, normalized: &[String]) -> RepoResult<Vec<TaggedEntity>> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = sql_placeholders(normalized.len());
        let sql = format!(
            "SELECT l.entity_kind, l.entity_key, MIN(l.id) AS first_link_id
             FROM tag_links l
             INNER JOIN tags t ON t.id = l.tag_id
             WHERE t.normalized_name IN ({placeholders})
             GROUP BY l.entity_kind, l.entity_key
             ORDER BY first_link_id ASC;"
        );
        let bind_values: Vec<Value> = normalized
            .iter()
            .map(|name| Value::Text(name.clone()))
            .collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let key: String = row.get(1)?;
            entities.push(TaggedEntity {
                entity: EntityRef::new(kind, key),
                first_link_id: row.get(2)?,
            });
        }
        Ok(entities)
    }

    fn list_catalog(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, normalized_name
             FROM tags
             ORDER BY normalized_name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                normalized_name: row.get(2)?,
            });
        }
        Ok(tags)
    }
}

fn load_entity_links(tx: &Transaction<'_>, entity: &EntityRef) -> RepoResult<Vec<LinkedTag>> {
    let mut stmt = tx.prepare(
        "SELECT l.id, t.id, t.name, t.normalized_name
         FROM tag_links l
         INNER JOIN tags t ON t.id = l.tag_id
         WHERE l.entity_kind = ?1
           AND l.entity_key = ?2
         ORDER BY l.id ASC;",
    )?;
    let mut rows = stmt.query(params![entity.kind.as_str(), entity.key.as_str()])?;
    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        links.push(LinkedTag {
            link_id: row.get(0)?,
            tag: Tag {
                id: row.get(1)?,
                name: row.get(2)?,
                normalized_name: row.get(3)?,
            },
        });
    }
    Ok(links)
}

fn find_by_normalized(
    tx: &Transaction<'_>,
    normalized: &[String],
) -> RepoResult<BTreeMap<String, TagId>> {
    let mut resolved = BTreeMap::new();
    if normalized.is_empty() {
        return Ok(resolved);
    }

    let placeholders = sql_placeholders(normalized.len());
    let sql = format!(
        "SELECT normalized_name, id
         FROM tags
         WHERE normalized_name IN ({placeholders});"
    );
    let bind_values: Vec<Value> = normalized
        .iter()
        .map(|name| Value::Text(name.clone()))
        .collect();

    let mut stmt = tx.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let id: TagId = row.get(1)?;
        resolved.insert(name, id);
    }
    Ok(resolved)
}

fn sql_placeholders(count: usize) -> String {
    let mut placeholders = String::new();
    for index in 1..=count {
        if index > 1 {
            placeholders.push_str(", ");
        }
        placeholders.push('?');
        placeholders.push_str(&index.to_string());
    }
    placeholders
}

fn ensure_tag_connection_ready(conn: &Connection) -> RepoResult<()> {
    let version = connection_user_version(conn)?;
    if version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version: latest_version(),
            actual_version: version,
        });
    }

    for table in ["tags", "tag_links"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in ["id", "name", "normalized_name"] {
        if !table_has_column(conn, "tags", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "tags",
                column,
            });
        }
    }

    for column in ["id", "tag_id", "entity_kind", "entity_key"] {
        if !table_has_column(conn, "tag_links", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "tag_links",
                column,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::sql_placeholders;

    #[test]
    fn placeholders_are_numbered_from_one() {
        assert_eq!(sql_placeholders(1), "?1");
        assert_eq!(sql_placeholders(3), "?1, ?2, ?3");
    }
}
