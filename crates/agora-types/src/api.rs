//! Creation and update inputs. Any field left as `None` takes the column
//! default when the row is written.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::kinds::{MembershipStatus, MessageKind, ParticipantRole};

// -- Groups --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewGroup {
    pub name: String,
    pub created_by: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub subscription_amount: Option<Decimal>,
    #[serde(default)]
    pub deposit_amount: Option<Decimal>,
    #[serde(default)]
    pub restrict_messages_to_admins: Option<bool>,
    #[serde(default)]
    pub allows_subscription: Option<bool>,
}

impl NewGroup {
    pub fn new(name: impl Into<String>, created_by: Uuid) -> Self {
        Self {
            name: name.into(),
            created_by,
            description: None,
            avatar: None,
            subscription_amount: None,
            deposit_amount: None,
            restrict_messages_to_admins: None,
            allows_subscription: None,
        }
    }
}

/// Partial update. `description` and `avatar` use a nested option: an absent
/// key leaves the field alone (`None`), an explicit `null` clears it
/// (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub avatar: Option<Option<String>>,
    #[serde(default)]
    pub subscription_amount: Option<Decimal>,
    #[serde(default)]
    pub deposit_amount: Option<Decimal>,
    #[serde(default)]
    pub restrict_messages_to_admins: Option<bool>,
    #[serde(default)]
    pub allows_subscription: Option<bool>,
}

// Only called when the key is present; absence falls back to `default`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Chat rooms --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewChatRoom {
    pub name: String,
    /// Defaults to `false`, whether or not a group is associated.
    #[serde(default)]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub associated_group_id: Option<Uuid>,
}

impl NewChatRoom {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_group: None,
            associated_group_id: None,
        }
    }

    pub fn for_group(name: impl Into<String>, group_id: Uuid) -> Self {
        Self {
            name: name.into(),
            is_group: None,
            associated_group_id: Some(group_id),
        }
    }
}

// -- Participants --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewParticipant {
    pub group_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub status: Option<MembershipStatus>,
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub role: Option<ParticipantRole>,
}

impl NewParticipant {
    pub fn new(group_id: Uuid, user_id: Uuid) -> Self {
        Self {
            group_id,
            user_id,
            is_admin: None,
            status: None,
            muted: None,
            role: None,
        }
    }
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessage {
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: Option<MessageKind>,
}

impl NewMessage {
    pub fn text(chat_room_id: Uuid, sender_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            chat_room_id,
            sender_id,
            content: content.into(),
            kind: None,
        }
    }
}
