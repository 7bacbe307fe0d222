//! Row mapping between SQLite rows and the agora-types records.
//! Column lists here must stay in step with the mappers below them.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use uuid::Uuid;

use agora_types::models::{ChatRoom, Group, Message, Participant, ReadReceipt, User};
use agora_types::{MembershipStatus, MessageKind, ParticipantRole};

pub const USER_COLUMNS: &str = "id, username, created_at";

pub const GROUP_COLUMNS: &str = "id, name, description, created_at, created_by, avatar, updated_at, \
     subscription_amount, deposit_amount, restrict_messages_to_admins, allows_subscription";

pub const CHAT_ROOM_COLUMNS: &str = "id, name, created_at, updated_at, is_group, associated_group_id";

pub const PARTICIPANT_COLUMNS: &str =
    "id, group_id, user_id, is_admin, status, joined_at, muted, role";

pub const MESSAGE_COLUMNS: &str = "id, chat_room_id, sender_id, content, timestamp, type, is_read";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

pub fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        created_by: uuid_at(row, 4)?,
        avatar: row.get(5)?,
        updated_at: row.get(6)?,
        subscription_amount: decimal_at(row, 7)?,
        deposit_amount: decimal_at(row, 8)?,
        restrict_messages_to_admins: row.get(9)?,
        allows_subscription: row.get(10)?,
    })
}

pub fn chat_room_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRoom> {
    Ok(ChatRoom {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        is_group: row.get(4)?,
        associated_group_id: optional_uuid_at(row, 5)?,
    })
}

pub fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    let status: String = row.get(4)?;
    Ok(Participant {
        id: uuid_at(row, 0)?,
        group_id: uuid_at(row, 1)?,
        user_id: uuid_at(row, 2)?,
        is_admin: row.get(3)?,
        status: MembershipStatus::parse(&status)
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(4, status, Type::Text))?,
        joined_at: row.get(5)?,
        muted: row.get(6)?,
        role: ParticipantRole::from(row.get::<_, String>(7)?),
    })
}

pub fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_at(row, 0)?,
        chat_room_id: uuid_at(row, 1)?,
        sender_id: uuid_at(row, 2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
        kind: MessageKind::from(row.get::<_, String>(5)?),
        is_read: row.get(6)?,
    })
}

pub fn read_receipt_from_row(row: &Row<'_>) -> rusqlite::Result<ReadReceipt> {
    Ok(ReadReceipt {
        message_id: uuid_at(row, 0)?,
        reader_id: uuid_at(row, 1)?,
        read_at: row.get(2)?,
    })
}

// Ids and amounts are stored as TEXT

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Uuid::parse_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
