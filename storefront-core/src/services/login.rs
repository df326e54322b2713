//! Login brute-force protection.
//!
//! [`LoginGuard`] puts two persistent rate limiters in front of password
//! verification:
//!
//! - an IP limiter counting every failed attempt from a client address, and
//! - a username+IP limiter counting consecutive failures for one account from
//!   one address, keyed `"{username}_{ip}"`.
//!
//! Both are read before credentials are checked. When either is over its
//! threshold the attempt is refused without verifying the password and without
//! consuming more points. A failed attempt charges the IP limiter, and charges
//! the username+IP limiter only when the username exists. A successful login
//! clears the username+IP counter.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error, User,
    error::ValidationError,
    repositories::{PasswordRepository, RateLimiterRepository, UserRepository},
    services::{
        CredentialCheck, PasswordService,
        rate_limiter::{ConsumeOutcome, RateLimiter, RateLimiterStatus},
    },
    session::{Session, SessionProvider},
};

/// Result of a login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Accepted { user: User, session: Session },
    /// Wrong username or password, without saying which
    Rejected,
    Throttled { retry_after_seconds: u64 },
}

pub struct LoginGuard<U, P, L>
where
    U: UserRepository,
    P: PasswordRepository,
    L: RateLimiterRepository,
{
    password_service: Arc<PasswordService<U, P>>,
    session_provider: Arc<dyn SessionProvider>,
    session_duration: Duration,
    ip_limiter: RateLimiter<L>,
    username_ip_limiter: RateLimiter<L>,
}

impl<U, P, L> LoginGuard<U, P, L>
where
    U: UserRepository,
    P: PasswordRepository,
    L: RateLimiterRepository,
{
    pub fn new(
        password_service: Arc<PasswordService<U, P>>,
        session_provider: Arc<dyn SessionProvider>,
        session_duration: Duration,
        ip_limiter: RateLimiter<L>,
        username_ip_limiter: RateLimiter<L>,
    ) -> Self {
        Self {
            password_service,
            session_provider,
            session_duration,
            ip_limiter,
            username_ip_limiter,
        }
    }

    pub fn ip_limiter(&self) -> &RateLimiter<L> {
        &self.ip_limiter
    }

    pub fn username_ip_limiter(&self) -> &RateLimiter<L> {
        &self.username_ip_limiter
    }

    pub fn session_provider(&self) -> &Arc<dyn SessionProvider> {
        &self.session_provider
    }

    /// Key of the username+IP limiter for one account and client address.
    pub fn username_ip_key(username: &str, client_ip: &str) -> String {
        format!("{username}_{client_ip}")
    }

    /// Attempt a login.
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingField` for an empty username or password
    /// - `Error::Storage` when either limiter or the user store fails
    /// - `CryptoError::JwtSigning` when a session token cannot be issued
    pub async fn attempt_login(
        &self,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<LoginOutcome, Error> {
        if username.is_empty() {
            return Err(ValidationError::MissingField("Username is required".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("Password is required".to_string()).into());
        }

        let username_ip_key = Self::username_ip_key(username, client_ip);

        let (ip_status, username_ip_status) = tokio::try_join!(
            self.ip_limiter.get(client_ip),
            self.username_ip_limiter.get(&username_ip_key),
        )?;

        if let Some(retry_after_seconds) =
            Self::governing_retry(ip_status.as_ref(), username_ip_status.as_ref())
        {
            tracing::warn!(
                username = %username,
                client_ip = %client_ip,
                retry_after_seconds,
                "Login attempt refused while throttled"
            );
            return Ok(LoginOutcome::Throttled {
                retry_after_seconds,
            });
        }

        let check = self
            .password_service
            .verify_credentials(username, password)
            .await?;

        match check {
            CredentialCheck::Verified(user) => {
                if username_ip_status.is_some_and(|status| status.consumed_points > 0) {
                    self.username_ip_limiter.delete(&username_ip_key).await?;
                }

                let session = self
                    .session_provider
                    .create_session(&user.id, self.session_duration)
                    .await?;

                tracing::info!(user_id = %user.id, client_ip = %client_ip, "Login succeeded");
                Ok(LoginOutcome::Accepted { user, session })
            }
            check => {
                let charge_username_ip = check.user_exists();

                let (ip_outcome, username_ip_outcome) = tokio::try_join!(
                    self.ip_limiter.consume(client_ip),
                    async {
                        if charge_username_ip {
                            self.username_ip_limiter
                                .consume(&username_ip_key)
                                .await
                                .map(Some)
                        } else {
                            Ok(None)
                        }
                    },
                )?;

                let retry_after_seconds = [Some(ip_outcome), username_ip_outcome]
                    .into_iter()
                    .flatten()
                    .filter(ConsumeOutcome::is_throttled)
                    .map(|outcome| outcome.status().retry_after_seconds())
                    .max();

                match retry_after_seconds {
                    Some(retry_after_seconds) => {
                        tracing::warn!(
                            username = %username,
                            client_ip = %client_ip,
                            retry_after_seconds,
                            "Login failed and is now throttled"
                        );
                        Ok(LoginOutcome::Throttled {
                            retry_after_seconds,
                        })
                    }
                    None => {
                        tracing::debug!(client_ip = %client_ip, "Login failed");
                        Ok(LoginOutcome::Rejected)
                    }
                }
            }
        }
    }

    /// The IP limiter governs whenever it is over its threshold; the
    /// username+IP limiter is only consulted otherwise.
    fn governing_retry(
        ip_status: Option<&RateLimiterStatus>,
        username_ip_status: Option<&RateLimiterStatus>,
    ) -> Option<u64> {
        ip_status
            .filter(|status| status.blocked)
            .or_else(|| username_ip_status.filter(|status| status.blocked))
            .map(RateLimiterStatus::retry_after_seconds)
    }
}
