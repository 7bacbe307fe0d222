use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kinds::{MembershipStatus, MessageKind, ParticipantRole};

/// Accounts belong to the auth service; only what foreign keys need is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub avatar: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub subscription_amount: Decimal,
    pub deposit_amount: Decimal,
    pub restrict_messages_to_admins: bool,
    pub allows_subscription: bool,
}

/// A direct conversation or a group room. `associated_group_id` links the
/// room to a group; a group can own several rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_group: bool,
    pub associated_group_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    pub muted: bool,
    pub role: ParticipantRole,
}

impl Participant {
    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }

    pub fn is_denied(&self) -> bool {
        self.status == MembershipStatus::Denied
    }

    pub fn is_pending(&self) -> bool {
        self.status == MembershipStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Set once any reader has acknowledged the message. Per-reader state
    /// lives in [`ReadReceipt`].
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: Uuid,
    pub reader_id: Uuid,
    pub read_at: DateTime<Utc>,
}

/// A group together with everyone enrolled in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDetails {
    pub group: Group,
    pub participants: Vec<Participant>,
}
