//! Mapping of `sqlx` failures onto the storage error taxonomy.
//!
//! Every failure is logged where it happens and then classified:
//!
//! | `sqlx` error                                   | `StorageError`  |
//! | ---------------------------------------------- | --------------- |
//! | pool timed out, pool closed, I/O, TLS           | `Connection`    |
//! | unique, foreign key, check or not-null failure | `Constraint`    |
//! | anything else                                  | `Database`      |

use storefront_core::{Error, error::StorageError};

pub trait DatabaseResultExt<T> {
    /// Log and classify a database failure, using `context` as the message.
    fn map_db_err(self, context: &str) -> Result<T, Error>;
}

impl<T> DatabaseResultExt<T> for Result<T, sqlx::Error> {
    fn map_db_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(classify(&e, context))
        })
    }
}

fn classify(error: &sqlx::Error, context: &str) -> StorageError {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Connection(context.to_string()),
        sqlx::Error::Database(db) if is_constraint_violation(db.as_ref()) => {
            StorageError::Constraint(format!("{context}: {}", db.message()))
        }
        _ => StorageError::Database(context.to_string()),
    }
}

fn is_constraint_violation(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.is_unique_violation()
        || db.is_foreign_key_violation()
        || db.is_check_violation()
        || matches!(db.kind(), sqlx::error::ErrorKind::NotNullViolation)
}
