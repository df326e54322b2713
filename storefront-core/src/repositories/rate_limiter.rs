//! Repository trait for persistent rate limiter counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    storage::{RateLimiterConfig, RateLimiterState},
};

/// Repository for rate limiter counters.
///
/// Keys passed to this trait are full storage keys, already namespaced with
/// the limiter's prefix. The current time is supplied by the caller so that
/// every decision about window expiry is made against a single clock reading.
///
/// # Consistency
///
/// `consume` must be atomic per key: two concurrent consumptions of the same
/// key must both be counted. [`RateLimiterState::advance`] describes the state
/// transition an implementation has to reproduce.
#[async_trait]
pub trait RateLimiterRepository: Send + Sync + 'static {
    /// Read the state of a key without modifying it.
    ///
    /// Returns `None` when the key has never been consumed or its effective
    /// expiry is not after `now`.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<RateLimiterState>, Error>;

    /// Consume one point for a key and return the resulting state.
    ///
    /// # Arguments
    ///
    /// * `key` - The full storage key
    /// * `config` - Window length, threshold and block duration of the limiter
    /// * `now` - The current time
    async fn consume(
        &self,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimiterState, Error>;

    /// Remove the state for a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Delete every record whose effective expiry is not after `before`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
