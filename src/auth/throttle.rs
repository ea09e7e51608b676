//! Per-identity brute-force guard for logins.
//!
//! Flow Overview:
//! 1) `acquire` before touching the account store. It reserves one attempt
//!    under the lock; a locked identity is refused.
//! 2) `ThrottlePermit::fail` after a wrong password (or unknown email).
//! 3) `ThrottlePermit::succeed` clears the identity.
//!
//! An identity is locked once `failures + in_flight >= max_attempts`, so a
//! burst of concurrent guesses never gets more than `max_attempts` password
//! checks per window. A permit dropped without an outcome (store failure,
//! cancelled request) gives its reservation back.
//!
//! The cooldown window runs from the first failure. Once it has elapsed the
//! failures are forgotten and the identity starts clean.
//!
//! The table lives for the lifetime of the process and is capped at
//! `max_entries`. Stale records are swept when room is needed and on every
//! failure; when the table is still full the record with the oldest activity
//! is evicted, idle records first.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub max_attempts: u32,
    pub cooldown: Duration,
    pub max_entries: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    Clean,
    Warming(u32),
    Locked { retry_after_seconds: u64 },
}

#[derive(Clone, Copy, Debug)]
struct ThrottleRecord {
    failures: u32,
    in_flight: u32,
    first_failure: i64,
    last_seen: i64,
}

impl ThrottleRecord {
    const fn new(now: i64) -> Self {
        Self {
            failures: 0,
            in_flight: 0,
            first_failure: now,
            last_seen: now,
        }
    }

    fn age(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.first_failure)).unwrap_or(0)
    }

    const fn is_idle(&self) -> bool {
        self.failures == 0 && self.in_flight == 0
    }
}

type Records = HashMap<String, ThrottleRecord>;

#[derive(Debug)]
pub struct ThrottleTracker {
    policy: ThrottlePolicy,
    records: Mutex<Records>,
}

/// One reserved login attempt. Consume it with [`fail`](Self::fail) or
/// [`succeed`](Self::succeed); dropping it releases the reservation uncounted.
#[derive(Debug)]
#[must_use]
pub struct ThrottlePermit<'a> {
    tracker: &'a ThrottleTracker,
    key: String,
    settled: bool,
}

impl ThrottlePermit<'_> {
    /// Count the attempt as failed and return the resulting state.
    pub fn fail(mut self, now: i64) -> ThrottleState {
        self.settled = true;
        self.tracker.settle_failure(&self.key, now)
    }

    /// Clear the identity's failures.
    pub fn succeed(mut self) {
        self.settled = true;
        self.tracker.settle_success(&self.key);
    }
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.release(&self.key);
        }
    }
}

impl ThrottleTracker {
    #[must_use]
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, record: &ThrottleRecord, now: i64) -> bool {
        record.failures > 0 && record.age(now) >= self.policy.cooldown.as_secs()
    }

    /// Forget expired failures. Returns `false` if nothing is left of the record.
    fn expire(&self, record: &mut ThrottleRecord, now: i64) -> bool {
        if self.is_stale(record, now) {
            record.failures = 0;
        }
        !record.is_idle()
    }

    fn state_of(&self, record: &ThrottleRecord, now: i64) -> ThrottleState {
        if record.failures >= self.policy.max_attempts {
            ThrottleState::Locked {
                retry_after_seconds: self
                    .policy
                    .cooldown
                    .as_secs()
                    .saturating_sub(record.age(now))
                    .max(1),
            }
        } else if record.failures.saturating_add(record.in_flight) >= self.policy.max_attempts {
            // Pending attempts may still succeed, ask the caller to come back soon.
            ThrottleState::Locked {
                retry_after_seconds: 1,
            }
        } else if record.failures == 0 {
            ThrottleState::Clean
        } else {
            ThrottleState::Warming(record.failures)
        }
    }

    /// Make room for one more record.
    fn reserve_slot(&self, records: &mut Records, now: i64) {
        if records.len() < self.policy.max_entries {
            return;
        }

        records.retain(|_, record| self.expire(record, now));

        if records.len() >= self.policy.max_entries {
            let oldest = records
                .iter()
                .min_by_key(|(_, record)| (record.in_flight > 0, record.last_seen))
                .map(|(oldest_key, _)| oldest_key.clone());
            if let Some(oldest) = oldest {
                records.remove(&oldest);
            }
        }
    }

    /// Current state of `key` without reserving an attempt.
    pub fn check(&self, key: &str, now: i64) -> ThrottleState {
        let mut records = self.records();
        let Some(record) = records.get_mut(key) else {
            return ThrottleState::Clean;
        };
        if !self.expire(record, now) {
            records.remove(key);
            return ThrottleState::Clean;
        }
        self.state_of(record, now)
    }

    /// Reserve one attempt for `key`.
    ///
    /// # Errors
    /// Returns the seconds to wait when the identity has used up its attempts,
    /// counting the ones still in flight.
    pub fn acquire(&self, key: &str, now: i64) -> Result<ThrottlePermit<'_>, u64> {
        let mut records = self.records();

        if !records.contains_key(key) {
            self.reserve_slot(&mut records, now);
        }

        let record = records
            .entry(key.to_string())
            .or_insert_with(|| ThrottleRecord::new(now));
        self.expire(record, now);

        if let ThrottleState::Locked {
            retry_after_seconds,
        } = self.state_of(record, now)
        {
            if record.is_idle() {
                records.remove(key);
            }
            return Err(retry_after_seconds);
        }

        record.in_flight += 1;
        record.last_seen = now;

        Ok(ThrottlePermit {
            tracker: self,
            key: key.to_string(),
            settled: false,
        })
    }

    fn settle_failure(&self, key: &str, now: i64) -> ThrottleState {
        let mut records = self.records();

        records.retain(|other, record| other == key || self.expire(record, now));

        if !records.contains_key(key) {
            self.reserve_slot(&mut records, now);
        }

        let record = records
            .entry(key.to_string())
            .or_insert_with(|| ThrottleRecord::new(now));
        self.expire(record, now);

        record.in_flight = record.in_flight.saturating_sub(1);
        if record.failures == 0 {
            record.first_failure = now;
        }
        record.failures = record.failures.saturating_add(1);
        record.last_seen = now;

        let record = *record;
        self.state_of(&record, now)
    }

    fn settle_success(&self, key: &str) {
        let mut records = self.records();
        if let Some(record) = records.get_mut(key) {
            record.failures = 0;
            record.in_flight = record.in_flight.saturating_sub(1);
            if record.is_idle() {
                records.remove(key);
            }
        }
    }

    fn release(&self, key: &str) {
        let mut records = self.records();
        if let Some(record) = records.get_mut(key) {
            record.in_flight = record.in_flight.saturating_sub(1);
            if record.is_idle() {
                records.remove(key);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
