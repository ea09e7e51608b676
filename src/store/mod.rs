//! Persistence for accounts, devices, hamsters and sensor readings.
//!
//! Handlers only see the [`Store`] trait. `PostgreSQL` backs it in production;
//! tests use an in-memory implementation.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("invalid stored value: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Normal,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Normal => "normal",
        }
    }

    /// Where the frontend should send the user after login.
    #[must_use]
    pub const fn redirect_hint(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Normal => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "normal" => Ok(Self::Normal),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Account row including the password hash. Never serialize this to clients.
#[derive(Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public view of an account.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<Account> for User {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Device {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub model: String,
    pub location: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeviceInput {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub model: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hamster {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<i32>,
    pub health_notes: Option<String>,
    pub device_id: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HamsterInput {
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub weight: Option<i32>,
    #[serde(default)]
    pub health_notes: Option<String>,
    #[serde(default)]
    pub device_id: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reading {
    pub id: i64,
    pub device_id: i64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReadingInput {
    pub temperature: f64,
    pub humidity: f64,
    /// Defaults to the time the reading is received.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;
    /// Returns [`StoreError::Conflict`] when the email is already registered.
    async fn insert_account(&self, account: NewAccount) -> Result<i64, StoreError>;
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn list_devices(&self) -> Result<Vec<Device>, StoreError>;
    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError>;
    async fn insert_device(
        &self,
        user_id: Option<i64>,
        device: DeviceInput,
    ) -> Result<i64, StoreError>;
    /// Returns `false` if the device does not exist.
    async fn update_device(&self, id: i64, device: DeviceInput) -> Result<bool, StoreError>;
    /// Returns `false` if the device does not exist.
    async fn delete_device(&self, id: i64) -> Result<bool, StoreError>;

    async fn insert_reading(
        &self,
        device_id: i64,
        reading: ReadingInput,
    ) -> Result<Reading, StoreError>;
    /// Newest first.
    async fn list_readings(&self, device_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError>;

    async fn list_hamsters(&self) -> Result<Vec<Hamster>, StoreError>;
    async fn insert_hamster(&self, user_id: i64, hamster: HamsterInput)
        -> Result<i64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" normal ".parse::<Role>(), Ok(Role::Normal));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn role_redirect_hints() {
        assert_eq!(Role::Admin.redirect_hint(), "/admin");
        assert_eq!(Role::Normal.redirect_hint(), "/dashboard");
    }

    #[test]
    fn account_debug_hides_hash() {
        let account = Account {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: Role::Normal,
        };
        let debug = format!("{account:?}");
        assert!(!debug.contains("argon2id"));
        assert!(debug.contains("alice@example.com"));
    }

    #[test]
    fn device_input_uses_type_field() -> anyhow::Result<()> {
        let input: DeviceInput = serde_json::from_value(serde_json::json!({
            "name": "cage-1",
            "type": "dht22",
            "model": "v2"
        }))?;
        assert_eq!(input.device_type, "dht22");
        assert_eq!(input.location, None);
        Ok(())
    }
}
