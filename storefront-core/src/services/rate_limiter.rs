//! Persistent rate limiter.
//!
//! A [`RateLimiter`] counts points per key over an expiring window and, once
//! the count goes over the configured threshold, blocks the key for a fixed
//! duration. State lives behind a [`RateLimiterRepository`] so that several
//! server processes sharing one database see the same counters.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_core::services::{ConsumeOutcome, RateLimiter};
//! use storefront_core::storage::RateLimiterConfig;
//!
//! let limiter = RateLimiter::new(repository, RateLimiterConfig::ip_per_day(100));
//!
//! match limiter.consume("203.0.113.7").await? {
//!     ConsumeOutcome::Allowed(status) => { /* keep going */ }
//!     ConsumeOutcome::Throttled(status) => {
//!         // reject with Retry-After: status.retry_after_seconds()
//!     }
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    repositories::RateLimiterRepository,
    storage::{RateLimiterConfig, RateLimiterState},
};

/// Snapshot of a limiter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStatus {
    pub consumed_points: u32,
    pub remaining_points: u32,
    /// Milliseconds until the counter resets or the block lifts.
    pub ms_before_next: i64,
    pub blocked: bool,
}

impl RateLimiterStatus {
    fn from_state(
        state: &RateLimiterState,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            consumed_points: state.consumed_points,
            remaining_points: config.points.saturating_sub(state.consumed_points),
            ms_before_next: state.ms_before_next(now),
            blocked: state.consumed_points > config.points,
        }
    }

    /// Seconds a client should wait, rounded and never below one.
    pub fn retry_after_seconds(&self) -> u64 {
        let secs = (self.ms_before_next as f64 / 1000.0).round() as u64;
        secs.max(1)
    }
}

/// Result of consuming one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Allowed(RateLimiterStatus),
    Throttled(RateLimiterStatus),
}

impl ConsumeOutcome {
    pub fn status(&self) -> &RateLimiterStatus {
        match self {
            ConsumeOutcome::Allowed(status) | ConsumeOutcome::Throttled(status) => status,
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, ConsumeOutcome::Throttled(_))
    }
}

/// Rate limiter backed by a shared repository.
///
/// Keys given to this type are bare identifiers such as a client IP; the
/// limiter namespaces them with its configured prefix before touching storage,
/// so two limiters with different prefixes never see each other's counters.
pub struct RateLimiter<R: RateLimiterRepository> {
    repository: Arc<R>,
    config: RateLimiterConfig,
}

impl<R: RateLimiterRepository> RateLimiter<R> {
    pub fn new(repository: Arc<R>, config: RateLimiterConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Read the status of a key without consuming anything.
    ///
    /// Returns `None` when the key has no live counter.
    pub async fn get(&self, key: &str) -> Result<Option<RateLimiterStatus>, Error> {
        let now = Utc::now();
        let state = self
            .repository
            .get(&self.config.storage_key(key), now)
            .await?;

        Ok(state.map(|s| RateLimiterStatus::from_state(&s, &self.config, now)))
    }

    /// Consume one point for a key.
    ///
    /// Storage failures are returned as errors and never reported as
    /// [`ConsumeOutcome::Throttled`].
    pub async fn consume(&self, key: &str) -> Result<ConsumeOutcome, Error> {
        let now = Utc::now();
        let state = self
            .repository
            .consume(&self.config.storage_key(key), &self.config, now)
            .await?;

        let status = RateLimiterStatus::from_state(&state, &self.config, now);
        if status.blocked {
            tracing::warn!(
                limiter = %self.config.key_prefix,
                consumed_points = status.consumed_points,
                ms_before_next = status.ms_before_next,
                "Rate limit exceeded"
            );
            Ok(ConsumeOutcome::Throttled(status))
        } else {
            Ok(ConsumeOutcome::Allowed(status))
        }
    }

    /// Drop the counter for a key. Deleting an unknown key is a no-op.
    pub async fn delete(&self, key: &str) -> Result<(), Error> {
        self.repository.delete(&self.config.storage_key(key)).await
    }

    /// Start the background cleanup task.
    ///
    /// Periodically deletes counters whose window and block have both lapsed.
    /// Expired rows are already ignored by reads, so this only bounds table
    /// growth.
    pub fn start_cleanup_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let prefix = self.config.key_prefix.clone();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.cleanup_expired(Utc::now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(
                                    limiter = %prefix,
                                    count = count,
                                    "Cleaned up expired rate limiter records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    limiter = %prefix,
                                    error = %e,
                                    "Failed to cleanup rate limiter records"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!(
                            limiter = %prefix,
                            "Shutting down rate limiter cleanup task"
                        );
                        break;
                    }
                }
            }
        })
    }
}
