use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity}.{field} is required")]
    RequiredField { entity: &'static str, field: String },

    #[error("{entity} {key} already exists")]
    UniquenessViolation { entity: &'static str, key: String },

    #[error("{entity} references a missing row: {detail}")]
    ReferentialIntegrity { entity: &'static str, detail: String },

    #[error("migration {migration} requires {requires} to be applied first")]
    DependencyOrder {
        migration: &'static str,
        requires: &'static str,
    },

    #[error("{entity}.{field} is longer than {max} characters")]
    TooLong {
        entity: &'static str,
        field: &'static str,
        max: usize,
    },

    #[error("{entity} fails a check constraint: {detail}")]
    CheckViolation { entity: &'static str, detail: String },

    #[error("{field} does not fit decimal(10,2): {value}")]
    InvalidAmount { field: &'static str, value: String },

    #[error("unknown migration: {0}")]
    UnknownMigration(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    /// Classify a failed write against `entity`. Constraint failures become
    /// the matching taxonomy variant; anything else passes through.
    pub(crate) fn from_write(entity: &'static str, err: rusqlite::Error) -> Self {
        let (code, message) = match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                (e.extended_code, msg.clone().unwrap_or_default())
            }
            _ => return Self::Sqlite(err),
        };

        match code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Self::UniquenessViolation {
                    entity,
                    key: constrained_columns(&message),
                }
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ReferentialIntegrity {
                entity,
                detail: message,
            },
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::RequiredField {
                entity,
                field: constrained_columns(&message),
            },
            ffi::SQLITE_CONSTRAINT_CHECK => Self::CheckViolation {
                entity,
                detail: message,
            },
            _ => Self::Sqlite(err),
        }
    }
}

/// "UNIQUE constraint failed: participants.group_id, participants.user_id"
/// becomes "(group_id, user_id)"; a single column is returned bare.
fn constrained_columns(message: &str) -> String {
    let Some((_, list)) = message.split_once(": ") else {
        return message.to_string();
    };
    let columns: Vec<&str> = list
        .split(", ")
        .map(|qualified| qualified.rsplit('.').next().unwrap_or(qualified))
        .collect();
    match columns.as_slice() {
        [single] => single.to_string(),
        many => format!("({})", many.join(", ")),
    }
}
