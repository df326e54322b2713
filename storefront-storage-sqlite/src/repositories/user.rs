use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use storefront_core::{Error, User, UserId, repositories::UserRepository, storage::NewUser};

use crate::error::DatabaseResultExt;

const USER_COLUMNS: &str = "id, username, email, admin, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteUser {
    id: String,
    username: String,
    email: String,
    admin: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteUser> for User {
    fn from(row: SqliteUser) -> Self {
        User {
            id: UserId::new(&row.id),
            username: row.username,
            email: row.email,
            admin: row.admin,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_default(),
        }
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, SqliteUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to find user")?;

        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(&format!(
            r#"
            INSERT INTO users (id, username, email, admin, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.admin)
        .bind(user.password_hash.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to create user")?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.find_one("id", id.as_str()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.find_one("email", email).await
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        let rows = sqlx::query_as::<_, SqliteUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username"
        ))
        .fetch_all(&self.pool)
        .await
        .map_db_err("Failed to list users")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: &UserId) -> Result<(), Error> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_db_err("Failed to delete user")?;

        Ok(())
    }
}
