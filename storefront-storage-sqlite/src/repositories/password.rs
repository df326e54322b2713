use async_trait::async_trait;
use sqlx::SqlitePool;
use storefront_core::{Error, UserId, repositories::PasswordRepository};

use crate::error::DatabaseResultExt;

/// Password hashes live in the `users` table but are never selected with
/// the rest of the profile.
pub struct SqlitePasswordRepository {
    pool: SqlitePool,
}

impl SqlitePasswordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordRepository for SqlitePasswordRepository {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = unixepoch() WHERE id = ?2")
            .bind(hash)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to set password hash")?;

        Ok(())
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        let result = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM users WHERE id = ?1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to get password hash")?;

        Ok(result.flatten())
    }
}
