//! Versioned schema migrations.
//!
//! Each storage backend implements [`Migration`] once per schema change and a
//! [`MigrationManager`] that records applied versions in a bookkeeping table
//! (`_storefront_migrations` unless overridden).

use async_trait::async_trait;
use sqlx::Database;
use storefront_core::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<MigrationError> for storefront_core::Error {
    fn from(err: MigrationError) -> Self {
        tracing::error!(error = %err, "Migration failed");
        storefront_core::Error::Storage(StorageError::Migration(err.to_string()))
    }
}

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix timestamp in seconds
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_storefront_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations in version order
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Roll back applied migrations, newest first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Reject a migration list whose versions are not unique.
///
/// Managers call this before touching the database so a bad list never
/// leaves the schema half migrated.
pub fn ensure_unique_versions<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    let mut versions: Vec<i64> = migrations.iter().map(|m| m.version()).collect();
    versions.sort_unstable();

    match versions.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(MigrationError::Migration(format!(
            "duplicate migration version {}",
            pair[0]
        ))),
        None => Ok(()),
    }
}

/// Migrations from `migrations` not yet in `applied`, sorted by version.
pub fn pending<'a, DB: Database>(
    migrations: &'a [Box<dyn Migration<DB>>],
    applied: &[MigrationRecord],
) -> Vec<&'a dyn Migration<DB>> {
    let mut pending: Vec<&'a dyn Migration<DB>> = migrations
        .iter()
        .map(|m| m.as_ref())
        .filter(|m| !applied.iter().any(|record| record.version == m.version()))
        .collect();
    pending.sort_by_key(|m| m.version());
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Sqlite, SqliteConnection};

    struct Noop(i64);

    #[async_trait]
    impl Migration<Sqlite> for Noop {
        async fn up<'a>(&'a self, _conn: &'a mut SqliteConnection) -> Result<()> {
            Ok(())
        }

        async fn down<'a>(&'a self, _conn: &'a mut SqliteConnection) -> Result<()> {
            Ok(())
        }

        fn version(&self) -> i64 {
            self.0
        }

        fn name(&self) -> &str {
            "Noop"
        }
    }

    fn record(version: i64) -> MigrationRecord {
        MigrationRecord {
            version,
            name: "Noop".to_string(),
            applied_at: 0,
        }
    }

    #[test]
    fn test_pending_skips_applied_and_sorts() {
        let migrations: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(3)), Box::new(Noop(1)), Box::new(Noop(2))];

        let pending = pending(&migrations, &[record(2)]);
        let versions: Vec<i64> = pending.iter().map(|m| m.version()).collect();
        assert_eq!(versions, vec![1, 3]);
    }

    #[test]
    fn test_duplicate_versions_are_rejected() {
        let migrations: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(1)), Box::new(Noop(2)), Box::new(Noop(1))];
        assert!(ensure_unique_versions(&migrations).is_err());

        let migrations: Vec<Box<dyn Migration<Sqlite>>> =
            vec![Box::new(Noop(1)), Box::new(Noop(2))];
        assert!(ensure_unique_versions(&migrations).is_ok());
    }

    #[test]
    fn test_converts_to_storage_error() {
        let err: storefront_core::Error = MigrationError::Migration("boom".to_string()).into();
        assert!(matches!(
            err,
            storefront_core::Error::Storage(StorageError::Migration(_))
        ));
    }
}
