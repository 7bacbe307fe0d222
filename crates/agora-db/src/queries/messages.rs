use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use agora_types::api::NewMessage;
use agora_types::models::{Message, ReadReceipt};

use super::{OptionalExt, expect_changed};
use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{MESSAGE_COLUMNS, message_from_row, read_receipt_from_row};
use crate::validate;

impl Database {
    pub fn send_message(&self, req: NewMessage) -> Result<Message> {
        validate::required("message", "content", &req.content)?;
        if let Some(kind) = &req.kind {
            validate::max_len("message", "type", kind.as_str(), validate::KIND_MAX)?;
        }
        let message = Message {
            id: Uuid::new_v4(),
            chat_room_id: req.chat_room_id,
            sender_id: req.sender_id,
            content: req.content,
            timestamp: Utc::now(),
            kind: req.kind.unwrap_or_default(),
            is_read: false,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_room_id, sender_id, content, timestamp, type, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![
                    message.id.to_string(),
                    message.chat_room_id.to_string(),
                    message.sender_id.to_string(),
                    message.content,
                    message.timestamp,
                    message.kind.as_str(),
                ],
            )
            .map_err(|e| DbError::from_write("message", e))?;
            Ok(())
        })?;

        debug!("Stored {} message {} in room {}", message.kind, message.id, message.chat_room_id);
        Ok(message)
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                [id.to_string()],
                message_from_row,
            )
            .optional()
        })
    }

    /// Messages in a room, oldest first. `limit` caps the count from the start.
    pub fn messages_for_room(&self, chat_room_id: Uuid, limit: Option<u32>) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE chat_room_id = ?1
                 ORDER BY timestamp ASC, rowid ASC
                 LIMIT ?2"
            ))?;

            // SQLite treats a negative LIMIT as unbounded
            let limit = limit.map_or(-1, i64::from);
            let rows = stmt
                .query_map(rusqlite::params![chat_room_id.to_string(), limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record that `reader_id` has read the message. Reading twice keeps the
    /// first receipt.
    pub fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<ReadReceipt> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE messages SET is_read = 1 WHERE id = ?1",
                [message_id.to_string()],
            )?;
            expect_changed(changed, "message", message_id)?;

            tx.execute(
                "INSERT OR IGNORE INTO message_reads (message_id, reader_id, read_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![message_id.to_string(), reader_id.to_string(), Utc::now()],
            )
            .map_err(|e| DbError::from_write("read_receipt", e))?;

            let receipt = tx.query_row(
                "SELECT message_id, reader_id, read_at FROM message_reads
                 WHERE message_id = ?1 AND reader_id = ?2",
                [message_id.to_string(), reader_id.to_string()],
                read_receipt_from_row,
            )?;
            tx.commit()?;
            Ok(receipt)
        })
    }

    pub fn read_receipts(&self, message_id: Uuid) -> Result<Vec<ReadReceipt>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, reader_id, read_at FROM message_reads
                 WHERE message_id = ?1
                 ORDER BY read_at, rowid",
            )?;
            let rows = stmt
                .query_map([message_id.to_string()], read_receipt_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_message(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM messages WHERE id = ?1", [id.to_string()])?;
            expect_changed(changed, "message", id)
        })
    }
}
