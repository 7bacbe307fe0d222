use std::fmt;

use serde::{Deserialize, Serialize};

// -- Message kind --

/// What a message carries. Stored as its lowercase tag; tags this build
/// doesn't know about survive a round trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Audio,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "image" => Self::Image,
            "audio" => Self::Audio,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Participant role --

/// Free-form role label of a participant. `is_admin` on the participant is
/// the flag that grants rights; the role is descriptive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParticipantRole {
    #[default]
    Member,
    Admin,
    Other(String),
}

impl ParticipantRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for ParticipantRole {
    fn from(label: &str) -> Self {
        match label {
            "member" => Self::Member,
            "admin" => Self::Admin,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParticipantRole {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<ParticipantRole> for String {
    fn from(role: ParticipantRole) -> Self {
        match role {
            ParticipantRole::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Membership status --

/// Where a participant stands in a group. Replaces the independent
/// approved/denied flags so the two can never both be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    #[default]
    Approved,
    Denied,
}

impl MembershipStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Denied];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == tag)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_defaults_to_text() {
        assert_eq!(MessageKind::default(), MessageKind::Text);
        assert_eq!(MessageKind::default().as_str(), "text");
    }

    #[test]
    fn unknown_message_kind_is_preserved() {
        let kind = MessageKind::from("sticker");
        assert_eq!(kind, MessageKind::Other("sticker".into()));
        assert_eq!(String::from(kind), "sticker");
    }

    #[test]
    fn message_kind_serializes_as_tag() {
        let json = serde_json::to_string(&MessageKind::Audio).unwrap();
        assert_eq!(json, "\"audio\"");

        let parsed: MessageKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(parsed, MessageKind::Other("video".into()));
    }

    #[test]
    fn role_round_trips_custom_labels() {
        assert_eq!(ParticipantRole::from("admin"), ParticipantRole::Admin);
        let custom = ParticipantRole::from("treasurer");
        assert_eq!(custom.as_str(), "treasurer");
        assert_eq!(ParticipantRole::from(custom.to_string()), custom);
    }

    #[test]
    fn membership_status_parses_its_own_tags() {
        for status in MembershipStatus::ALL {
            assert_eq!(MembershipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MembershipStatus::parse("banned"), None);
        assert_eq!(MembershipStatus::default(), MembershipStatus::Approved);
    }
}
