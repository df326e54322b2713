//! User accounts
//!
//! | Field        | Type       | Description                                   |
//! | ------------ | ---------- | --------------------------------------------- |
//! | `id`         | `UserId`   | The unique identifier for the user.           |
//! | `username`   | `String`   | Unique login name, 2 to 20 characters.        |
//! | `email`      | `String`   | Unique email address.                         |
//! | `admin`      | `bool`     | Whether the user may manage other resources.  |
//! | `created_at` | `DateTime` | The timestamp when the user was created.      |
//! | `updated_at` | `DateTime` | The timestamp when the user was last updated. |
//!
//! The password hash is never part of [`User`]; it is only reachable through
//! the password repository.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::{AuthError, utilities::RequiredFieldExt},
    id::prefixed_id,
};

prefixed_id!(
    /// A unique, stable identifier for a specific user
    UserId,
    "usr"
);

/// Public profile of a user, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    /// Whether this user may act on resources owned by `username`.
    pub fn can_act_for(&self, username: &str) -> bool {
        self.admin || self.username == username
    }

    /// Fails with `AuthError::Forbidden` unless [`User::can_act_for`] holds.
    pub fn ensure_can_act_for(&self, username: &str) -> Result<(), Error> {
        if self.can_act_for(username) {
            Ok(())
        } else {
            tracing::debug!(actor = %self.username, target = %username, "Ownership check failed");
            Err(AuthError::Forbidden.into())
        }
    }

    pub fn ensure_admin(&self) -> Result<(), Error> {
        if self.admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden.into())
        }
    }
}

#[derive(Default)]
pub struct UserBuilder {
    id: Option<UserId>,
    username: Option<String>,
    email: Option<String>,
    admin: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl UserBuilder {
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

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<User, Error> {
        let now = Utc::now();
        Ok(User {
            id: self.id.unwrap_or_default(),
            username: self.username.require_field("Username")?,
            email: self.email.require_field("Email")?,
            admin: self.admin,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
