//! Comment persistence over SQLite.
//!
//! # Responsibility
//! - Provide append/remove/list storage for entity-scoped comments.
//! - Keep commenter columns paired: both set or both NULL.
//!
//! # Invariants
//! - Per-entity listing order is ascending comment id.
//! - Deleting a missing id is reported as `CommentNotFound`, not silently
//!   ignored.

use crate::db::migrations::latest_version;
use crate::model::comment::{Comment, CommentId};
use crate::model::entity::EntityRef;
use crate::repo::{
    connection_user_version, table_exists, table_has_column, RepoError, RepoResult,
};
use rusqlite::{params, Connection};

/// Repository interface for comment operations.
pub trait CommentRepository {
    /// Inserts one comment and returns the persisted record with its id.
    fn insert_comment(
        &self,
        entity: &EntityRef,
        commenter: Option<&EntityRef>,
        body: &str,
    ) -> RepoResult<Comment>;
    /// Deletes one comment by id.
    fn delete_comment(&self, id: CommentId) -> RepoResult<()>;
    /// Lists all comments for the entity in insertion order.
    fn list_for_entity(&self, entity: &EntityRef) -> RepoResult<Vec<Comment>>;
}

/// SQLite-backed comment repository.
#[derive(Debug)]
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_comment_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn insert_comment(
        &self,
        entity: &EntityRef,
        commenter: Option<&EntityRef>,
        body: &str,
    ) -> RepoResult<Comment> {
        self.conn.execute(
            "INSERT INTO comments (entity_kind, entity_key, commenter_kind, commenter_key, body)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                entity.kind.as_str(),
                entity.key.as_str(),
                commenter.map(|who| who.kind.as_str()),
                commenter.map(|who| who.key.as_str()),
                body,
            ],
        )?;

        Ok(Comment {
            id: self.conn.last_insert_rowid(),
            entity: entity.clone(),
            commenter: commenter.cloned(),
            body: body.to_string(),
        })
    }

    fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::CommentNotFound(id));
        }
        Ok(())
    }

    fn list_for_entity(&self, entity: &EntityRef) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, commenter_kind, commenter_key, body
             FROM comments
             WHERE entity_kind = ?1
               AND entity_key = ?2
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query(params![entity.kind.as_str(), entity.key.as_str()])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            let commenter_kind: Option<String> = row.get(1)?;
            let commenter_key: Option<String> = row.get(2)?;
            let commenter = match (commenter_kind, commenter_key) {
                (Some(kind), Some(key)) => Some(EntityRef::new(kind, key)),
                (None, None) => None,
                _ => {
                    return Err(RepoError::InvalidData(
                        "comment row has a half-set commenter reference".to_string(),
                    ))
                }
            };
            comments.push(Comment {
                id: row.get(0)?,
                entity: entity.clone(),
                commenter,
                body: row.get(3)?,
            });
        }
        Ok(comments)
    }
}

fn ensure_comment_connection_ready(conn: &Connection) -> RepoResult<()> {
    let version = connection_user_version(conn)?;
    if version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version: latest_version(),
            actual_version: version,
        });
    }

    if !table_exists(conn, "comments")? {
        return Err(RepoError::MissingRequiredTable("comments"));
    }

    for column in ["id", "entity_kind", "entity_key", "commenter_kind", "commenter_key", "body"] {
        if !table_has_column(conn, "comments", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "comments",
                column,
            });
        }
    }

    Ok(())
}
