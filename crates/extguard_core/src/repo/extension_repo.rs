//! Extension repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the minimal query surface over the `extensions` table.
//! - Provide the unit-of-work seam every service operation runs inside.
//!
//! # Invariants
//! - `(owner, name, category)` uniqueness is enforced by the schema; a losing
//!   insert surfaces as `RepoError::ConstraintViolation`, never as a duplicate.
//! - Deletes are no-ops when nothing matches.
//! - Id-based deletes are always scoped to the owner.

use crate::db::DbError;
use crate::model::extension::{
    ExtensionCategory, ExtensionId, ExtensionRecord, ExtensionSummary,
};
use rusqlite::{ffi, params, Connection, ErrorCode, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for extension persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// `(owner, name, category)` already exists.
    ConstraintViolation {
        name: String,
        category: ExtensionCategory,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation { name, category } => {
                write!(f, "{category} extension `{name}` already exists for owner")
            }
            Self::InvalidData(message) => {
                write!(f, "invalid persisted extension data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::ConstraintViolation { .. } | Self::InvalidData(_) => None,
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
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query surface required by the validation and toggle service.
pub trait ExtensionRepository {
    fn exists(&self, owner: &str, name: &str, category: ExtensionCategory) -> RepoResult<bool>;
    fn count(&self, owner: &str, category: ExtensionCategory) -> RepoResult<u32>;
    /// Lists records in insertion order.
    fn list(&self, owner: &str, category: ExtensionCategory)
        -> RepoResult<Vec<ExtensionSummary>>;
    /// Inserts one record. Fails with `ConstraintViolation` on duplicates.
    fn save(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<ExtensionRecord>;
    fn delete_by_name_owner_category(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<()>;
    /// Deletes only when both `id` and `owner` match.
    fn delete_by_id_and_owner(&self, id: ExtensionId, owner: &str) -> RepoResult<()>;
}

/// Unit-of-work provider.
///
/// The closure result decides the outcome: `Ok` commits, `Err` rolls back.
pub trait ExtensionStore {
    /// Runs `f` inside a write transaction that holds the write lock from the
    /// first statement on.
    fn in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>;

    /// Runs `f` inside a deferred transaction for a consistent read snapshot.
    fn in_read_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed extension repository over one connection or transaction.
pub struct SqliteExtensionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExtensionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ExtensionRepository for SqliteExtensionRepository<'_> {
    fn exists(&self, owner: &str, name: &str, category: ExtensionCategory) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM extensions
                WHERE owner = ?1 AND name = ?2 AND category = ?3
            );",
            params![owner, name, category.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn count(&self, owner: &str, category: ExtensionCategory) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM extensions WHERE owner = ?1 AND category = ?2;",
            params![owner, category.as_str()],
            |row| row.get(0),
        )?;
        u32::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("extension count out of range: {count}")))
    }

    fn list(
        &self,
        owner: &str,
        category: ExtensionCategory,
    ) -> RepoResult<Vec<ExtensionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name
             FROM extensions
             WHERE owner = ?1 AND category = ?2
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query(params![owner, category.as_str()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(ExtensionSummary {
                id: row.get("id")?,
                name: row.get("name")?,
            });
        }
        Ok(items)
    }

    fn save(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<ExtensionRecord> {
        let inserted = self.conn.execute(
            "INSERT INTO extensions (owner, name, category) VALUES (?1, ?2, ?3);",
            params![owner, name, category.as_str()],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(RepoError::ConstraintViolation {
                    name: name.to_string(),
                    category,
                });
            }
            return Err(err.into());
        }

        let id = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, name, category, created_at
             FROM extensions
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::InvalidData(format!(
                "inserted extension {id} missing on read-back"
            )));
        };

        let category_text: String = row.get("category")?;
        let stored_category = ExtensionCategory::from_db(&category_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid category `{category_text}` in extensions.category"
            ))
        })?;

        Ok(ExtensionRecord {
            id: row.get("id")?,
            owner: row.get("owner")?,
            name: row.get("name")?,
            category: stored_category,
            created_at: row.get("created_at")?,
        })
    }

    fn delete_by_name_owner_category(
        &self,
        owner: &str,
        name: &str,
        category: ExtensionCategory,
    ) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM extensions WHERE owner = ?1 AND name = ?2 AND category = ?3;",
            params![owner, name, category.as_str()],
        )?;
        Ok(())
    }

    fn delete_by_id_and_owner(&self, id: ExtensionId, owner: &str) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM extensions WHERE id = ?1 AND owner = ?2;",
            params![id, owner],
        )?;
        Ok(())
    }
}

/// SQLite unit-of-work over a migrated connection.
pub struct SqliteExtensionStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteExtensionStore<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    fn run<T, E, F>(&mut self, behavior: TransactionBehavior, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(behavior)
            .map_err(RepoError::from)?;
        // Dropping `tx` on the error path rolls it back.
        let outcome = f(&SqliteExtensionRepository::new(&tx))?;
        tx.commit().map_err(RepoError::from)?;
        Ok(outcome)
    }
}

impl ExtensionStore for SqliteExtensionStore<'_> {
    fn in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.run(TransactionBehavior::Immediate, f)
    }

    fn in_read_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExtensionRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.run(TransactionBehavior::Deferred, f)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
