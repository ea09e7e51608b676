//! In-memory [`Store`] used by tests.

use super::{
    Account, Device, DeviceInput, Hamster, HamsterInput, NewAccount, Reading, ReadingInput, Store,
    StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    next_id: i64,
    accounts: Vec<Account>,
    devices: Vec<Device>,
    hamsters: Vec<Hamster>,
    readings: Vec<Reading>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
    email_lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of `find_account_by_email` calls so far.
    pub(crate) fn email_lookups(&self) -> usize {
        self.email_lookups.load(Ordering::SeqCst)
    }

    /// Make account lookups fail until switched back.
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.email_lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict);
        }
        let id = tables.next_id();
        tables.accounts.push(Account {
            id,
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
        });
        Ok(id)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.tables.lock().await.accounts.clone())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.tables.lock().await.devices.clone())
    }

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.devices.iter().find(|d| d.id == id).cloned())
    }

    async fn insert_device(
        &self,
        user_id: Option<i64>,
        device: DeviceInput,
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.devices.push(Device {
            id,
            user_id,
            name: device.name,
            device_type: device.device_type,
            model: device.model,
            location: device.location,
        });
        Ok(id)
    }

    async fn update_device(&self, id: i64, device: DeviceInput) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(existing) = tables.devices.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        existing.name = device.name;
        existing.device_type = device.device_type;
        existing.model = device.model;
        existing.location = device.location;
        Ok(true)
    }

    async fn delete_device(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let before = tables.devices.len();
        tables.devices.retain(|d| d.id != id);
        let removed = tables.devices.len() < before;
        if removed {
            tables.readings.retain(|r| r.device_id != id);
        }
        Ok(removed)
    }

    async fn insert_reading(
        &self,
        device_id: i64,
        reading: ReadingInput,
    ) -> Result<Reading, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let stored = Reading {
            id,
            device_id,
            temperature: reading.temperature,
            humidity: reading.humidity,
            recorded_at: reading.recorded_at.unwrap_or_else(Utc::now),
        };
        tables.readings.push(stored.clone());
        Ok(stored)
    }

    async fn list_readings(&self, device_id: i64, limit: i64) -> Result<Vec<Reading>, StoreError> {
        let tables = self.tables.lock().await;
        let mut readings: Vec<Reading> = tables
            .readings
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        readings.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(readings)
    }

    async fn list_hamsters(&self) -> Result<Vec<Hamster>, StoreError> {
        Ok(self.tables.lock().await.hamsters.clone())
    }

    async fn insert_hamster(
        &self,
        user_id: i64,
        hamster: HamsterInput,
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.hamsters.push(Hamster {
            id,
            user_id,
            name: hamster.name,
            breed: hamster.breed,
            age: hamster.age,
            weight: hamster.weight,
            health_notes: hamster.health_notes,
            device_id: hamster.device_id,
        });
        Ok(id)
    }
}
