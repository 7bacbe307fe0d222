pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
mod validate;

pub use error::{DbError, Result};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Single-writer handle over the chat schema. Every call holds the
/// connection lock for its whole duration, so concurrent writers are
/// serialized and the storage constraints decide between them.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file and bring it up to the latest schema.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self::connect(path)?;
        db.migrate()?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self::connect_in_memory()?;
        db.migrate()?;
        Ok(db)
    }

    /// Open without touching the schema. Callers drive migrations themselves.
    pub fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn connect_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply every pending migration. Returns how many ran.
    pub fn migrate(&self) -> Result<usize> {
        self.with_conn_mut(migrations::run)
    }

    /// Apply pending migrations up to and including `target`.
    pub fn migrate_to(&self, target: &str) -> Result<usize> {
        self.with_conn_mut(|conn| migrations::run_to(conn, target))
    }

    /// Apply exactly one migration. `Ok(false)` means it was already applied.
    pub fn apply_migration(&self, id: &str) -> Result<bool> {
        let migration = migrations::find(id)?;
        self.with_conn_mut(|conn| migrations::apply(conn, migration))
    }

    pub fn applied_migrations(&self) -> Result<Vec<String>> {
        self.with_conn(migrations::applied)
    }

    pub fn pending_migrations(&self) -> Result<Vec<&'static str>> {
        self.with_conn(|conn| {
            Ok(migrations::pending(conn)?
                .into_iter()
                .map(|m| m.id)
                .collect())
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        f(&mut conn)
    }
}
