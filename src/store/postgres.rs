//! `PostgreSQL` implementation of [`Store`].

use super::{
    Account, Device, DeviceInput, Hamster, HamsterInput, NewAccount, Reading, ReadingInput, Role,
    Store, StoreError,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

fn db_span(operation: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation
    )
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create missing tables. Existing tables are left untouched.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(db_span("DDL"))
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(Account {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse::<Role>().map_err(StoreError::Corrupt)?,
    })
}

fn device_from_row(row: &PgRow) -> Result<Device, StoreError> {
    Ok(Device {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        device_type: row.try_get("device_type")?,
        model: row.try_get("model")?,
        location: row.try_get("location")?,
    })
}

fn hamster_from_row(row: &PgRow) -> Result<Hamster, StoreError> {
    Ok(Hamster {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        breed: row.try_get("breed")?,
        age: row.try_get("age")?,
        weight: row.try_get("weight")?,
        health_notes: row.try_get("health_notes")?,
        device_id: row.try_get("device_id")?,
    })
}

fn reading_from_row(row: &PgRow) -> Result<Reading, StoreError> {
    Ok(Reading {
        id: row.try_get("id")?,
        device_id: row.try_get("device_id")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role";
const DEVICE_COLUMNS: &str = "id, user_id, name, device_type, model, location";
const HAMSTER_COLUMNS: &str = "id, user_id, name, breed, age, weight, health_notes, device_id";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().instrument(db_span("ACQUIRE")).await?;
        conn.ping().instrument(db_span("PING")).await?;
        Ok(())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn insert_account(&self, account: NewAccount) -> Result<i64, StoreError> {
        let query =
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id";
        let row = sqlx::query(query)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict
                } else {
                    StoreError::Database(err)
                }
            })?;
        Ok(row.try_get("id")?)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        rows.iter().map(account_from_row).collect()
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let query = format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        rows.iter().map(device_from_row).collect()
    }

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        let query = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn insert_device(
        &self,
        user_id: Option<i64>,
        device: DeviceInput,
    ) -> Result<i64, StoreError> {
        let query = "INSERT INTO devices (user_id, name, device_type, model, location) VALUES ($1, $2, $3, $4, $5) RETURNING id";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(&device.name)
            .bind(&device.device_type)
            .bind(&device.model)
            .bind(&device.location)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await?;
        Ok(row.try_get("id")?)
    }

    async fn update_device(&self, id: i64, device: DeviceInput) -> Result<bool, StoreError> {
        let query = "UPDATE devices SET name = $2, device_type = $3, model = $4, location = $5 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(&device.name)
            .bind(&device.device_type)
            .bind(&device.model)
            .bind(&device.location)
            .execute(&self.pool)
            .instrument(db_span("UPDATE"))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_device(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE"))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_reading(
        &self,
        device_id: i64,
        reading: ReadingInput,
    ) -> Result<Reading, StoreError> {
        let query = "INSERT INTO readings (device_id, temperature, humidity, recorded_at) VALUES ($1, $2, $3, $4) RETURNING id, device_id, temperature, humidity, recorded_at";
        let row = sqlx::query(query)
            .bind(device_id)
            .bind(reading.temperature)
            .bind(reading.humidity)
            .bind(reading.recorded_at.unwrap_or_else(Utc::now))
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await?;
        reading_from_row(&row)
    }

    async fn list_readings(&self, device_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let query = "SELECT id, device_id, temperature, humidity, recorded_at FROM readings WHERE device_id = $1 ORDER BY recorded_at DESC, id DESC LIMIT $2";
        let rows = sqlx::query(query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        rows.iter().map(reading_from_row).collect()
    }

    async fn list_hamsters(&self) -> Result<Vec<Hamster>, StoreError> {
        let query = format!("SELECT {HAMSTER_COLUMNS} FROM hamsters ORDER BY id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;
        rows.iter().map(hamster_from_row).collect()
    }

    async fn insert_hamster(
        &self,
        user_id: i64,
        hamster: HamsterInput,
    ) -> Result<i64, StoreError> {
        let query = "INSERT INTO hamsters (user_id, name, breed, age, weight, health_notes, device_id) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(&hamster.name)
            .bind(&hamster.breed)
            .bind(hamster.age)
            .bind(hamster.weight)
            .bind(&hamster.health_notes)
            .bind(hamster.device_id)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT"))
            .await?;
        Ok(row.try_get("id")?)
    }
}
