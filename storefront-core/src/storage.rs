//! Storage-facing value types
//!
//! Inputs to the repositories (`New*`, updates) and the persisted rate limiter
//! record together with its configuration.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error, OrderId, ProductId, UserId,
    error::utilities::RequiredFieldExt,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub admin: bool,
    /// Stored in the same write as the profile when present.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

impl NewUser {
    pub fn builder() -> NewUserBuilder {
        NewUserBuilder::default()
    }
}

#[derive(Default)]
pub struct NewUserBuilder {
    id: Option<UserId>,
    username: Option<String>,
    email: Option<String>,
    admin: bool,
    password_hash: Option<String>,
}

impl NewUserBuilder {
    pub fn id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn password_hash(mut self, password_hash: String) -> Self {
        self.password_hash = Some(password_hash);
        self
    }

    pub fn build(self) -> Result<NewUser, Error> {
        Ok(NewUser {
            id: self.id.unwrap_or_default(),
            username: self.username.require_field("Username")?,
            email: self.email.require_field("Email")?,
            admin: self.admin,
            password_hash: self.password_hash,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
}

/// Partial update of a product; `None` fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
    }
}

/// A product reference with a quantity, as submitted for carts and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub total_price: f64,
    pub lines: Vec<CartLine>,
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Key prefix of the per-IP failed login limiter.
pub const IP_LIMITER_PREFIX: &str = "login_fail_ip_per_day";

/// Key prefix of the consecutive failures limiter keyed by `username_ip`.
pub const USERNAME_IP_LIMITER_PREFIX: &str = "login_fail_consecutive_username_and_ip";

pub const MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY: u32 = 100;
pub const MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP: u32 = 10;

/// IP limiter window and block when counting per day (the default).
pub const IP_LIMITER_WINDOW_DAY_SECS: i64 = 60 * 60 * 24;
/// Shorter IP limiter window, for deployments that prefer an hourly budget.
pub const IP_LIMITER_WINDOW_HOUR_SECS: i64 = 60 * 60;

pub const USERNAME_IP_LIMITER_WINDOW_SECS: i64 = 60 * 60 * 24 * 30;
pub const USERNAME_IP_LIMITER_BLOCK_SECS: i64 = 60 * 60;

/// Configuration of a single persistent rate limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Namespace prepended to every key, so limiters never share rows
    pub key_prefix: String,
    /// Points allowed within one window before the key counts as throttled
    pub points: u32,
    /// Length of the counting window
    pub duration: Duration,
    /// How long a key stays blocked once it goes over `points`; zero disables blocking
    pub block_duration: Duration,
}

impl RateLimiterConfig {
    pub fn new(key_prefix: impl Into<String>, points: u32, duration: Duration) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            points,
            duration,
            block_duration: Duration::zero(),
        }
    }

    pub fn with_block_duration(mut self, block_duration: Duration) -> Self {
        self.block_duration = block_duration;
        self
    }

    /// The failed-attempts-per-IP limiter with a one day window and block.
    pub fn ip_per_day(points: u32) -> Self {
        Self::new(
            IP_LIMITER_PREFIX,
            points,
            Duration::seconds(IP_LIMITER_WINDOW_DAY_SECS),
        )
        .with_block_duration(Duration::seconds(IP_LIMITER_WINDOW_DAY_SECS))
    }

    /// The consecutive failures limiter keyed by `username_ip`.
    pub fn consecutive_username_and_ip(points: u32) -> Self {
        Self::new(
            USERNAME_IP_LIMITER_PREFIX,
            points,
            Duration::seconds(USERNAME_IP_LIMITER_WINDOW_SECS),
        )
        .with_block_duration(Duration::seconds(USERNAME_IP_LIMITER_BLOCK_SECS))
    }

    /// Storage key for a caller supplied identifier.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    pub fn blocks(&self) -> bool {
        self.block_duration > Duration::zero()
    }
}

/// Configuration of the two limiters guarding login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginProtectionConfig {
    pub ip: RateLimiterConfig,
    pub username_ip: RateLimiterConfig,
}

impl Default for LoginProtectionConfig {
    fn default() -> Self {
        Self {
            ip: RateLimiterConfig::ip_per_day(MAX_WRONG_ATTEMPTS_BY_IP_PER_DAY),
            username_ip: RateLimiterConfig::consecutive_username_and_ip(
                MAX_CONSECUTIVE_FAILS_BY_USERNAME_AND_IP,
            ),
        }
    }
}

/// Persisted counter for one limiter key.
///
/// The record's effective expiry is `blocked_until` when set, otherwise
/// `window_expires_at`. Once it has passed the record is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterState {
    pub key: String,
    pub consumed_points: u32,
    pub window_expires_at: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl RateLimiterState {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.blocked_until.unwrap_or(self.window_expires_at)
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() > now
    }

    pub fn ms_before_next(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_milliseconds().max(0)
    }

    /// The state that results from consuming one point at `now`.
    ///
    /// This is the reference behaviour every repository must reproduce
    /// atomically: a missing or lapsed record restarts at one point on a fresh
    /// window, a live one is incremented on its existing window, and going over
    /// `config.points` sets or extends `blocked_until`.
    pub fn advance(
        previous: Option<&RateLimiterState>,
        key: &str,
        config: &RateLimiterConfig,
        now: DateTime<Utc>,
    ) -> RateLimiterState {
        let block_until = config.blocks().then(|| now + config.block_duration);

        match previous.filter(|state| state.is_live(now)) {
            None => RateLimiterState {
                key: key.to_string(),
                consumed_points: 1,
                window_expires_at: now + config.duration,
                blocked_until: if 1 > config.points { block_until } else { None },
            },
            Some(state) => {
                let consumed_points = state.consumed_points.saturating_add(1);
                let blocked_until = match block_until {
                    Some(until) if consumed_points > config.points => {
                        Some(state.blocked_until.map_or(until, |current| current.max(until)))
                    }
                    _ => state.blocked_until,
                };

                RateLimiterState {
                    key: key.to_string(),
                    consumed_points,
                    window_expires_at: state.window_expires_at,
                    blocked_until,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(points: u32) -> RateLimiterConfig {
        RateLimiterConfig::new("test", points, Duration::minutes(10))
            .with_block_duration(Duration::minutes(30))
    }

    #[test]
    fn test_default_login_protection_config() {
        let config = LoginProtectionConfig::default();
        assert_eq!(config.ip.points, 100);
        assert_eq!(config.ip.duration, Duration::days(1));
        assert_eq!(config.ip.block_duration, Duration::days(1));
        assert_eq!(config.username_ip.points, 10);
        assert_eq!(config.username_ip.duration, Duration::days(30));
        assert_eq!(config.username_ip.block_duration, Duration::hours(1));
        assert_ne!(config.ip.key_prefix, config.username_ip.key_prefix);
    }

    #[test]
    fn test_storage_key_is_prefixed() {
        let config = RateLimiterConfig::ip_per_day(5);
        assert_eq!(
            config.storage_key("10.0.0.1"),
            "login_fail_ip_per_day:10.0.0.1"
        );
    }

    #[test]
    fn test_advance_creates_fresh_state() {
        let now = Utc::now();
        let state = RateLimiterState::advance(None, "test:k", &config(3), now);

        assert_eq!(state.consumed_points, 1);
        assert_eq!(state.window_expires_at, now + Duration::minutes(10));
        assert!(state.blocked_until.is_none());
    }

    #[test]
    fn test_advance_increments_within_window() {
        let now = Utc::now();
        let first = RateLimiterState::advance(None, "test:k", &config(3), now);
        let second = RateLimiterState::advance(
            Some(&first),
            "test:k",
            &config(3),
            now + Duration::minutes(1),
        );

        assert_eq!(second.consumed_points, 2);
        assert_eq!(second.window_expires_at, first.window_expires_at);
    }

    #[test]
    fn test_advance_blocks_when_over_threshold() {
        let now = Utc::now();
        let cfg = config(2);
        let mut state = RateLimiterState::advance(None, "test:k", &cfg, now);
        state = RateLimiterState::advance(Some(&state), "test:k", &cfg, now);
        assert!(state.blocked_until.is_none());

        state = RateLimiterState::advance(Some(&state), "test:k", &cfg, now);
        assert_eq!(state.consumed_points, 3);
        assert_eq!(state.blocked_until, Some(now + Duration::minutes(30)));
        assert_eq!(state.ms_before_next(now), Duration::minutes(30).num_milliseconds());
    }

    #[test]
    fn test_advance_resets_after_window_rolls_over() {
        let now = Utc::now();
        let cfg = config(5);
        let state = RateLimiterState::advance(None, "test:k", &cfg, now);
        let later = now + Duration::minutes(11);

        let next = RateLimiterState::advance(Some(&state), "test:k", &cfg, later);
        assert_eq!(next.consumed_points, 1);
        assert_eq!(next.window_expires_at, later + Duration::minutes(10));
    }

    #[test]
    fn test_block_outlives_window() {
        let now = Utc::now();
        let cfg = config(1);
        let mut state = RateLimiterState::advance(None, "test:k", &cfg, now);
        state = RateLimiterState::advance(Some(&state), "test:k", &cfg, now);
        assert!(state.blocked_until.is_some());

        // Window is over but the block still holds the record alive
        let later = now + Duration::minutes(15);
        assert!(state.is_live(later));
        let next = RateLimiterState::advance(Some(&state), "test:k", &cfg, later);
        assert_eq!(next.consumed_points, 3);
        assert_eq!(next.blocked_until, Some(later + Duration::minutes(30)));
    }

    #[test]
    fn test_zero_block_duration_never_blocks() {
        let now = Utc::now();
        let cfg = RateLimiterConfig::new("test", 1, Duration::minutes(10));
        let mut state = RateLimiterState::advance(None, "test:k", &cfg, now);
        state = RateLimiterState::advance(Some(&state), "test:k", &cfg, now);

        assert_eq!(state.consumed_points, 2);
        assert!(state.blocked_until.is_none());
    }
}
