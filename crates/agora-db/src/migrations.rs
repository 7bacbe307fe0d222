use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{DbError, Result};

/// One ordered schema change. A migration only runs once every id in
/// `depends_on` is recorded in the ledger.
#[derive(Debug)]
pub struct Migration {
    pub id: &'static str,
    pub depends_on: &'static [&'static str],
    pub sql: &'static str,
}

pub const INITIAL: Migration = Migration {
    id: "0001_initial",
    depends_on: &[],
    sql: "
        CREATE TABLE users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );

        CREATE TABLE chat_groups (
            id                          TEXT PRIMARY KEY,
            name                        TEXT NOT NULL CHECK (length(name) <= 255),
            description                 TEXT,
            created_at                  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            created_by                  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            avatar                      TEXT,
            updated_at                  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            subscription_amount         TEXT NOT NULL DEFAULT '0.00',
            deposit_amount              TEXT NOT NULL DEFAULT '0.00',
            restrict_messages_to_admins INTEGER NOT NULL DEFAULT 0,
            allows_subscription         INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_chat_groups_created_by ON chat_groups(created_by);

        CREATE TABLE chat_rooms (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL CHECK (length(name) <= 255),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            is_group    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE participants (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            is_admin    INTEGER NOT NULL DEFAULT 0,
            status      TEXT NOT NULL DEFAULT 'approved'
                        CHECK (status IN ('pending', 'approved', 'denied')),
            joined_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            muted       INTEGER NOT NULL DEFAULT 0,
            role        TEXT NOT NULL DEFAULT 'member' CHECK (length(role) <= 50),
            UNIQUE (group_id, user_id)
        );

        CREATE INDEX idx_participants_user ON participants(user_id);

        CREATE TABLE messages (
            id              TEXT PRIMARY KEY,
            chat_room_id    TEXT NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
            sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content         TEXT NOT NULL,
            timestamp       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
            type            TEXT NOT NULL DEFAULT 'text' CHECK (length(type) <= 20),
            is_read         INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX idx_messages_room ON messages(chat_room_id, timestamp);
        CREATE INDEX idx_messages_sender ON messages(sender_id);

        CREATE TABLE message_reads (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            reader_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            read_at     TEXT NOT NULL,
            PRIMARY KEY (message_id, reader_id)
        );

        CREATE INDEX idx_message_reads_reader ON message_reads(reader_id);

        -- Creation stamps are written once
        CREATE TRIGGER users_created_at_immutable
            BEFORE UPDATE OF created_at ON users
            WHEN NEW.created_at IS NOT OLD.created_at
        BEGIN
            SELECT RAISE(ABORT, 'users.created_at is immutable');
        END;

        CREATE TRIGGER chat_groups_created_at_immutable
            BEFORE UPDATE OF created_at ON chat_groups
            WHEN NEW.created_at IS NOT OLD.created_at
        BEGIN
            SELECT RAISE(ABORT, 'chat_groups.created_at is immutable');
        END;

        CREATE TRIGGER chat_rooms_created_at_immutable
            BEFORE UPDATE OF created_at ON chat_rooms
            WHEN NEW.created_at IS NOT OLD.created_at
        BEGIN
            SELECT RAISE(ABORT, 'chat_rooms.created_at is immutable');
        END;

        CREATE TRIGGER participants_joined_at_immutable
            BEFORE UPDATE OF joined_at ON participants
            WHEN NEW.joined_at IS NOT OLD.joined_at
        BEGIN
            SELECT RAISE(ABORT, 'participants.joined_at is immutable');
        END;

        CREATE TRIGGER messages_timestamp_immutable
            BEFORE UPDATE OF timestamp ON messages
            WHEN NEW.timestamp IS NOT OLD.timestamp
        BEGIN
            SELECT RAISE(ABORT, 'messages.timestamp is immutable');
        END;
    ",
};

/// Link chat rooms to the group that owns them. Purely additive: existing
/// rooms keep their data and get a NULL group.
pub const ADD_ASSOCIATED_GROUP: Migration = Migration {
    id: "0002_add_associated_group_id",
    depends_on: &["0001_initial"],
    sql: "
        ALTER TABLE chat_rooms
            ADD COLUMN associated_group_id TEXT NULL
            REFERENCES chat_groups(id) ON DELETE CASCADE;

        CREATE INDEX idx_chat_rooms_group ON chat_rooms(associated_group_id);
    ",
};

/// Every known migration, in application order.
pub static MIGRATIONS: &[Migration] = &[INITIAL, ADD_ASSOCIATED_GROUP];

pub fn find(id: &str) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.id == id)
        .ok_or_else(|| DbError::UnknownMigration(id.to_string()))
}

fn ensure_ledger(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id          TEXT PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM schema_migrations WHERE id = ?1",
        [id],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Ids recorded in the ledger, oldest first.
pub fn applied(conn: &Connection) -> Result<Vec<String>> {
    ensure_ledger(conn)?;
    let mut stmt = conn.prepare("SELECT id FROM schema_migrations ORDER BY applied_at, id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

pub fn pending(conn: &Connection) -> Result<Vec<&'static Migration>> {
    let done = applied(conn)?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !done.iter().any(|id| id == m.id))
        .collect())
}

/// Apply a single migration inside its own transaction.
///
/// Returns `Ok(false)` without touching the schema if the migration is
/// already recorded, and `DependencyOrder` if a dependency is not.
pub fn apply(conn: &mut Connection, migration: &Migration) -> Result<bool> {
    ensure_ledger(conn)?;
    let tx = conn.transaction()?;

    if is_applied(&tx, migration.id)? {
        debug!("Migration {} already applied", migration.id);
        return Ok(false);
    }

    for &requires in migration.depends_on {
        if !is_applied(&tx, requires)? {
            return Err(DbError::DependencyOrder {
                migration: migration.id,
                requires,
            });
        }
    }

    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        rusqlite::params![migration.id, Utc::now()],
    )?;
    tx.commit()?;

    info!("Applied migration {}", migration.id);
    Ok(true)
}

/// Apply everything pending. Returns how many migrations ran.
pub fn run(conn: &mut Connection) -> Result<usize> {
    let Some(last) = MIGRATIONS.last() else {
        return Ok(0);
    };
    run_to(conn, last.id)
}

/// Apply pending migrations in order up to and including `target`.
pub fn run_to(conn: &mut Connection, target: &str) -> Result<usize> {
    let end = MIGRATIONS
        .iter()
        .position(|m| m.id == target)
        .ok_or_else(|| DbError::UnknownMigration(target.to_string()))?;

    let mut ran = 0;
    for migration in &MIGRATIONS[..=end] {
        if apply(conn, migration)? {
            ran += 1;
        }
    }

    if ran > 0 {
        info!("Database migrations complete ({} applied)", ran);
    }
    Ok(ran)
}
