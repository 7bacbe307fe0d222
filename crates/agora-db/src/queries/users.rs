use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use agora_types::models::User;

use super::{OptionalExt, expect_changed};
use crate::Database;
use crate::error::{DbError, Result};
use crate::models::{USER_COLUMNS, user_from_row};
use crate::validate;

impl Database {
    /// Register the local shadow of an account owned by the auth service.
    pub fn create_user(&self, username: &str) -> Result<User> {
        let username = validate::required("user", "username", username)?;
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user.id.to_string(), user.username, user.created_at],
            )
            .map_err(|e| DbError::from_write("user", e))?;
            Ok(())
        })?;

        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id.to_string()],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                user_from_row,
            )
            .optional()
        })
    }

    /// Removes the user together with the groups they created, their
    /// memberships, their messages and their read receipts.
    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            expect_changed(changed, "user", id)
        })?;
        info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbError};

    #[test]
    fn create_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice").unwrap();

        assert_eq!(db.get_user(alice.id).unwrap().unwrap().username, "alice");
        assert_eq!(db.get_user_by_username("alice").unwrap().unwrap().id, alice.id);
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice").unwrap();
        let err = db.create_user("alice").unwrap_err();
        assert!(matches!(
            err,
            DbError::UniquenessViolation { entity: "user", ref key } if key == "username"
        ));
    }

    #[test]
    fn deleting_unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.delete_user(uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "user", .. }));
    }
}
