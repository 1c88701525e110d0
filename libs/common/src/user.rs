//! User model shared by the HTTP services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Coarse authorization role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that names none of the known roles
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "agent" => Ok(Role::Agent),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User entity as stored in the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub is_superuser: bool,
    /// Set when staff deactivate the account; activation cannot undo it
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`User::from_row`]
pub const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     phone_number, role, is_active, email_verified, is_superuser, deactivated_at, created_at, \
     updated_at";

impl User {
    /// A fresh, inactive account with the default role
    pub fn new(email: &str, username: &str, password_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            role: Role::User,
            is_active: false,
            email_verified: false,
            is_superuser: false,
            deactivated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Map a row selected with [`USER_COLUMNS`]
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role = role
            .parse()
            .map_err(|e: UnknownRole| sqlx::Error::Decode(Box::new(e)))?;

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            role,
            is_active: row.try_get("is_active")?,
            email_verified: row.try_get("email_verified")?,
            is_superuser: row.try_get("is_superuser")?,
            deactivated_at: row.try_get("deactivated_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Admin role or superuser flag
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated_at.is_some()
    }

    /// Switch the account off for good
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.deactivated_at.get_or_insert_with(Utc::now);
    }
}

/// The authenticated principal of a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// True when the user owns at least one property
    pub is_owner: bool,
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Public representation of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
        }
    }
}
