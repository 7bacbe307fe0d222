use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use agora_types::api::NewChatRoom;
use agora_types::models::ChatRoom;

use super::{OptionalExt, expect_changed};
use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{CHAT_ROOM_COLUMNS, chat_room_from_row};
use crate::validate;

impl Database {
    pub fn create_chat_room(&self, req: NewChatRoom) -> Result<ChatRoom> {
        let name = validate::required("chat_room", "name", &req.name)?;
        let name = validate::max_len("chat_room", "name", name, validate::NAME_MAX)?.to_string();
        let now = Utc::now();
        let room = ChatRoom {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
            is_group: req.is_group.unwrap_or(false),
            associated_group_id: req.associated_group_id,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_rooms (id, name, created_at, updated_at, is_group, associated_group_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    room.id.to_string(),
                    room.name,
                    room.created_at,
                    room.updated_at,
                    room.is_group,
                    room.associated_group_id.map(|id| id.to_string()),
                ],
            )
            .map_err(|e| DbError::from_write("chat_room", e))?;
            Ok(())
        })?;

        debug!("Created chat room {} ({})", room.id, room.name);
        Ok(room)
    }

    pub fn get_chat_room(&self, id: Uuid) -> Result<Option<ChatRoom>> {
        self.with_conn(|conn| query_chat_room(conn, id))
    }

    /// Rooms owned by a group (the group's `chat_rooms`).
    pub fn chat_rooms_for_group(&self, group_id: Uuid) -> Result<Vec<ChatRoom>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_ROOM_COLUMNS} FROM chat_rooms
                 WHERE associated_group_id = ?1
                 ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([group_id.to_string()], chat_room_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn rename_chat_room(&self, id: Uuid, name: &str) -> Result<ChatRoom> {
        let name = validate::required("chat_room", "name", name)?;
        let name = validate::max_len("chat_room", "name", name, validate::NAME_MAX)?;
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_rooms SET name = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![id.to_string(), name, Utc::now()],
                )
                .map_err(|e| DbError::from_write("chat_room", e))?;
            expect_changed(changed, "chat_room", id)?;
            fetch_chat_room(conn, id)
        })
    }

    /// Attach the room to a group, or detach it with `None`. `is_group` is
    /// left as it is.
    pub fn set_associated_group(&self, id: Uuid, group_id: Option<Uuid>) -> Result<ChatRoom> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_rooms SET associated_group_id = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![id.to_string(), group_id.map(|g| g.to_string()), Utc::now()],
                )
                .map_err(|e| DbError::from_write("chat_room", e))?;
            expect_changed(changed, "chat_room", id)?;
            fetch_chat_room(conn, id)
        })
    }

    /// Removes the room and every message in it.
    pub fn delete_chat_room(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM chat_rooms WHERE id = ?1", [id.to_string()])?;
            expect_changed(changed, "chat_room", id)
        })?;
        info!("Deleted chat room {}", id);
        Ok(())
    }
}

fn query_chat_room(conn: &Connection, id: Uuid) -> Result<Option<ChatRoom>> {
    conn.query_row(
        &format!("SELECT {CHAT_ROOM_COLUMNS} FROM chat_rooms WHERE id = ?1"),
        [id.to_string()],
        chat_room_from_row,
    )
    .optional()
}

fn fetch_chat_room(conn: &Connection, id: Uuid) -> Result<ChatRoom> {
    query_chat_room(conn, id)?.ok_or_else(|| DbError::NotFound {
        entity: "chat_room",
        id: id.to_string(),
    })
}
