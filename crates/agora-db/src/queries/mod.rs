//! Record operations, grouped by table. Each one runs under the connection
//! lock; operations that touch more than one row use a transaction.

mod groups;
mod messages;
mod participants;
mod rooms;
mod users;

use crate::error::{DbError, Result};

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Turn "no row changed" into `NotFound`.
fn expect_changed(changed: usize, entity: &'static str, id: impl ToString) -> Result<()> {
    if changed == 0 {
        return Err(DbError::NotFound {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}
