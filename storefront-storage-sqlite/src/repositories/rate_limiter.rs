use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use storefront_core::{
    Error,
    repositories::RateLimiterRepository,
    storage::{RateLimiterConfig, RateLimiterState},
};

use crate::error::DatabaseResultExt;

#[derive(Debug, sqlx::FromRow)]
struct SqliteRateLimiterState {
    key: String,
    points: i64,
    expire_at: i64,
    blocked_until: Option<i64>,
}

impl From<SqliteRateLimiterState> for RateLimiterState {
    fn from(row: SqliteRateLimiterState) -> Self {
        RateLimiterState {
            key: row.key,
            consumed_points: u32::try_from(row.points).unwrap_or(u32::MAX),
            window_expires_at: DateTime::from_timestamp_millis(row.expire_at).unwrap_or_default(),
            blocked_until: row
                .blocked_until
                .map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or_default()),
        }
    }
}

/// Counters stored in `rate_limiter_states`, timestamps in unix milliseconds.
///
/// `consume` is a single UPSERT so concurrent consumptions of one key are
/// serialized by SQLite.
pub struct SqliteRateLimiterRepository {
    pool: SqlitePool,
}

impl SqliteRateLimiterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimiterRepository for SqliteRateLimiterRepository {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimiterState>, Error> {
        let row = sqlx::query_as::<_, SqliteRateLimiterState>(
            r#"
            SELECT key, points, expire_at, blocked_until
            FROM rate_limiter_states
            WHERE key = ?1 AND COALESCE(blocked_until, expire_at) > ?2
            "#,
        )
        .bind(key)
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .map_db_err("Failed to read rate limiter state")?;

        Ok(row.map(Into::into))
    }

    async fn consume(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimiterState, Error> {
        let now_ms = now.timestamp_millis();
        let window_end = (now + config.duration).timestamp_millis();
        let block_end = config
            .blocks()
            .then(|| (now + config.block_duration).timestamp_millis());

        // A lapsed record (effective expiry <= now) restarts on a fresh window
        let row = sqlx::query_as::<_, SqliteRateLimiterState>(
            r#"
            INSERT INTO rate_limiter_states (key, points, expire_at, blocked_until)
            VALUES (?1, 1, ?3, CASE WHEN 1 > ?4 THEN ?5 ELSE NULL END)
            ON CONFLICT(key) DO UPDATE SET
                points = CASE
                    WHEN COALESCE(blocked_until, expire_at) <= ?2 THEN 1
                    ELSE points + 1
                END,
                expire_at = CASE
                    WHEN COALESCE(blocked_until, expire_at) <= ?2 THEN ?3
                    ELSE expire_at
                END,
                blocked_until = CASE
                    WHEN COALESCE(blocked_until, expire_at) <= ?2 THEN
                        CASE WHEN 1 > ?4 THEN ?5 ELSE NULL END
                    WHEN points + 1 > ?4 AND ?5 IS NOT NULL THEN
                        MAX(COALESCE(blocked_until, 0), ?5)
                    ELSE blocked_until
                END
            RETURNING key, points, expire_at, blocked_until
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .bind(window_end)
        .bind(i64::from(config.points))
        .bind(block_end)
        .fetch_one(&self.pool)
        .await
        .map_db_err("Failed to consume rate limiter point")?;

        Ok(row.into())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM rate_limiter_states WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_db_err("Failed to delete rate limiter state")?;

        Ok(())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            "DELETE FROM rate_limiter_states WHERE COALESCE(blocked_until, expire_at) <= ?1",
        )
        .bind(before.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_db_err("Failed to clean up rate limiter states")?;

        Ok(result.rows_affected())
    }
}
