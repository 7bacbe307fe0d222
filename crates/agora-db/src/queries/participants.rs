use chrono::Utc;
use rusqlite::ToSql;
use tracing::{debug, info};
use uuid::Uuid;

use agora_types::api::NewParticipant;
use agora_types::models::Participant;
use agora_types::{MembershipStatus, ParticipantRole};

use super::{OptionalExt, expect_changed};
use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{PARTICIPANT_COLUMNS, participant_from_row};
use crate::validate;

impl Database {
    /// Enrol a user in a group. A user appears at most once per group; a
    /// second enrolment is a `UniquenessViolation`.
    pub fn add_participant(&self, req: NewParticipant) -> Result<Participant> {
        if let Some(role) = &req.role {
            validate::max_len("participant", "role", role.as_str(), validate::ROLE_MAX)?;
        }
        let participant = Participant {
            id: Uuid::new_v4(),
            group_id: req.group_id,
            user_id: req.user_id,
            is_admin: req.is_admin.unwrap_or(false),
            status: req.status.unwrap_or_default(),
            joined_at: Utc::now(),
            muted: req.muted.unwrap_or(false),
            role: req.role.unwrap_or_default(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO participants (id, group_id, user_id, is_admin, status, joined_at, muted, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    participant.id.to_string(),
                    participant.group_id.to_string(),
                    participant.user_id.to_string(),
                    participant.is_admin,
                    participant.status.as_str(),
                    participant.joined_at,
                    participant.muted,
                    participant.role.as_str(),
                ],
            )
            .map_err(|e| DbError::from_write("participant", e))?;
            Ok(())
        })?;

        debug!(
            "User {} joined group {} as {} ({})",
            participant.user_id, participant.group_id, participant.role, participant.status
        );
        Ok(participant)
    }

    /// Join as an approved member.
    pub fn join_group(&self, group_id: Uuid, user_id: Uuid) -> Result<Participant> {
        self.add_participant(NewParticipant::new(group_id, user_id))
    }

    /// Ask to join; the membership stays pending until approved or denied.
    pub fn request_to_join(&self, group_id: Uuid, user_id: Uuid) -> Result<Participant> {
        self.add_participant(NewParticipant {
            status: Some(MembershipStatus::Pending),
            ..NewParticipant::new(group_id, user_id)
        })
    }

    pub fn get_participant(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE group_id = ?1 AND user_id = ?2"
                ),
                [group_id.to_string(), user_id.to_string()],
                participant_from_row,
            )
            .optional()
        })
    }

    pub fn participants_for_group(&self, group_id: Uuid) -> Result<Vec<Participant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM participants
                 WHERE group_id = ?1
                 ORDER BY joined_at, rowid"
            ))?;
            let rows = stmt
                .query_map([group_id.to_string()], participant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_membership_status(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        status: MembershipStatus,
    ) -> Result<Participant> {
        self.update_participant(group_id, user_id, "status", &status.as_str())
    }

    pub fn set_admin(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) -> Result<Participant> {
        self.update_participant(group_id, user_id, "is_admin", &is_admin)
    }

    pub fn set_muted(&self, group_id: Uuid, user_id: Uuid, muted: bool) -> Result<Participant> {
        self.update_participant(group_id, user_id, "muted", &muted)
    }

    pub fn set_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: &ParticipantRole,
    ) -> Result<Participant> {
        let role = validate::max_len("participant", "role", role.as_str(), validate::ROLE_MAX)?;
        self.update_participant(group_id, user_id, "role", &role)
    }

    pub fn remove_participant(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM participants WHERE group_id = ?1 AND user_id = ?2",
                [group_id.to_string(), user_id.to_string()],
            )?;
            expect_changed(changed, "participant", format!("({group_id}, {user_id})"))
        })?;
        info!("Removed user {} from group {}", user_id, group_id);
        Ok(())
    }

    /// `column` is always one of the fixed names passed by the setters above.
    fn update_participant(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        column: &'static str,
        value: &dyn ToSql,
    ) -> Result<Participant> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    &format!("UPDATE participants SET {column} = ?3 WHERE group_id = ?1 AND user_id = ?2"),
                    rusqlite::params![group_id.to_string(), user_id.to_string(), value],
                )
                .map_err(|e| DbError::from_write("participant", e))?;
            expect_changed(changed, "participant", format!("({group_id}, {user_id})"))?;

            Ok(conn.query_row(
                &format!(
                    "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE group_id = ?1 AND user_id = ?2"
                ),
                [group_id.to_string(), user_id.to_string()],
                participant_from_row,
            )?)
        })
    }
}
