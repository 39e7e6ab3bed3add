//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage binding contracts consumed by the service layer.
//! - Isolate SQLite query details from reconciliation/business orchestration.
//! - Classify uniqueness-constraint races distinctly from other failures.
//!
//! # Invariants
//! - Repository constructors verify schema readiness before first use.
//! - Multi-statement writes happen inside one transaction; an error rolls
//!   the whole transaction back before propagating.

use crate::db::DbError;
use crate::model::comment::CommentId;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod comment_repo;
pub mod tag_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for tag and comment persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Transport/engine failure; fatal for the current operation.
    Db(DbError),
    /// A uniqueness constraint fired because a concurrent writer won the
    /// race. Recoverable by re-running the attempt against fresh state.
    DuplicateKey { detail: String },
    /// `remove_comment` referenced an id that does not exist.
    CommentNotFound(CommentId),
    /// Persisted state violates a model invariant.
    InvalidData(String),
    /// Connection has no schema applied at all.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Connection is migrated but a required table is absent.
    MissingRequiredTable(&'static str),
    /// Connection is migrated but a required column is absent.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { detail } => {
                write!(f, "concurrent writer won a uniqueness race: {detail}")
            }
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection has schema version {actual_version}, expected {expected_version}; \
                 open it through db::open_db first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, Some(message)) = &value {
            if code.code == rusqlite::ErrorCode::ConstraintViolation
                && message.contains("UNIQUE constraint failed")
            {
                return Self::DuplicateKey {
                    detail: message.clone(),
                };
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn connection_user_version(conn: &Connection) -> RepoResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(
    conn: &Connection,
    table: &str,
    column: &str,
) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
