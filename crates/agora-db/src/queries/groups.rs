use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use agora_types::api::{GroupUpdate, NewGroup};
use agora_types::models::{Group, GroupDetails};
use agora_types::{MembershipStatus, ParticipantRole};

use super::{OptionalExt, expect_changed};
use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{GROUP_COLUMNS, PARTICIPANT_COLUMNS, group_from_row, participant_from_row};
use crate::validate;

impl Database {
    /// Create a group and enrol its creator as an approved admin, atomically.
    pub fn create_group(&self, req: NewGroup) -> Result<Group> {
        let name = validate::required("group", "name", &req.name)?;
        let name = validate::max_len("group", "name", name, validate::NAME_MAX)?.to_string();
        let subscription = validate::amount(
            "subscription_amount",
            req.subscription_amount.unwrap_or(Decimal::ZERO),
        )?;
        let deposit = validate::amount("deposit_amount", req.deposit_amount.unwrap_or(Decimal::ZERO))?;

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            created_at: now,
            created_by: req.created_by,
            avatar: req.avatar,
            updated_at: now,
            subscription_amount: subscription,
            deposit_amount: deposit,
            restrict_messages_to_admins: req.restrict_messages_to_admins.unwrap_or(false),
            allows_subscription: req.allows_subscription.unwrap_or(false),
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO chat_groups (id, name, description, created_at, created_by, avatar, updated_at,
                    subscription_amount, deposit_amount, restrict_messages_to_admins, allows_subscription)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    group.id.to_string(),
                    group.name,
                    group.description,
                    group.created_at,
                    group.created_by.to_string(),
                    group.avatar,
                    group.updated_at,
                    group.subscription_amount.to_string(),
                    group.deposit_amount.to_string(),
                    group.restrict_messages_to_admins,
                    group.allows_subscription,
                ],
            )
            .map_err(|e| DbError::from_write("group", e))?;

            tx.execute(
                "INSERT INTO participants (id, group_id, user_id, is_admin, status, joined_at, role)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    group.id.to_string(),
                    group.created_by.to_string(),
                    MembershipStatus::Approved.as_str(),
                    now,
                    ParticipantRole::Admin.as_str(),
                ],
            )
            .map_err(|e| DbError::from_write("participant", e))?;

            tx.commit()?;
            Ok(())
        })?;

        info!("Created group {} ({})", group.id, group.name);
        Ok(group)
    }

    pub fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        self.with_conn(|conn| query_group(conn, id))
    }

    /// Groups the user is enrolled in, whatever their membership status.
    pub fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let columns = GROUP_COLUMNS
                .split(", ")
                .map(|c| format!("g.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {columns}
                 FROM chat_groups g
                 INNER JOIN participants p ON p.group_id = g.id
                 WHERE p.user_id = ?1
                 ORDER BY g.created_at, g.rowid"
            ))?;

            let rows = stmt
                .query_map([user_id.to_string()], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The group and all of its participants in one read.
    pub fn group_details(&self, id: Uuid) -> Result<GroupDetails> {
        self.with_conn(|conn| {
            let group = query_group(conn, id)?.ok_or_else(|| DbError::NotFound {
                entity: "group",
                id: id.to_string(),
            })?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM participants
                 WHERE group_id = ?1
                 ORDER BY joined_at, rowid"
            ))?;
            let participants = stmt
                .query_map([id.to_string()], participant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(GroupDetails {
                group,
                participants,
            })
        })
    }

    /// Apply a partial update. `updated_at` is refreshed even when the
    /// update carries no field changes.
    pub fn update_group(&self, id: Uuid, update: GroupUpdate) -> Result<Group> {
        let group = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut group = query_group(&tx, id)?.ok_or_else(|| DbError::NotFound {
                entity: "group",
                id: id.to_string(),
            })?;

            if let Some(name) = update.name {
                let name = validate::required("group", "name", &name)?;
                group.name = validate::max_len("group", "name", name, validate::NAME_MAX)?.to_string();
            }
            if let Some(description) = update.description {
                group.description = description;
            }
            if let Some(avatar) = update.avatar {
                group.avatar = avatar;
            }
            if let Some(amount) = update.subscription_amount {
                group.subscription_amount = validate::amount("subscription_amount", amount)?;
            }
            if let Some(amount) = update.deposit_amount {
                group.deposit_amount = validate::amount("deposit_amount", amount)?;
            }
            if let Some(flag) = update.restrict_messages_to_admins {
                group.restrict_messages_to_admins = flag;
            }
            if let Some(flag) = update.allows_subscription {
                group.allows_subscription = flag;
            }
            group.updated_at = Utc::now();

            tx.execute(
                "UPDATE chat_groups SET name = ?2, description = ?3, avatar = ?4, updated_at = ?5,
                    subscription_amount = ?6, deposit_amount = ?7,
                    restrict_messages_to_admins = ?8, allows_subscription = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    group.name,
                    group.description,
                    group.avatar,
                    group.updated_at,
                    group.subscription_amount.to_string(),
                    group.deposit_amount.to_string(),
                    group.restrict_messages_to_admins,
                    group.allows_subscription,
                ],
            )
            .map_err(|e| DbError::from_write("group", e))?;

            tx.commit()?;
            Ok(group)
        })?;

        debug!("Updated group {}", id);
        Ok(group)
    }

    /// Removes the group with its participants, its chat rooms and their
    /// messages.
    pub fn delete_group(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM chat_groups WHERE id = ?1", [id.to_string()])?;
            expect_changed(changed, "group", id)
        })?;
        info!("Deleted group {}", id);
        Ok(())
    }
}

fn query_group(conn: &Connection, id: Uuid) -> Result<Option<Group>> {
    conn.query_row(
        &format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1"),
        [id.to_string()],
        group_from_row,
    )
    .optional()
}
