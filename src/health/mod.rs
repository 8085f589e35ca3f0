mod policy;
mod store;

pub use policy::HealthPolicy;
pub use store::{HealthStore, MemoryHealthStore};

use crate::error::GatewayError;

/// Identifies one health record: a backend endpoint reached through one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HealthKey {
    pub endpoint: usize,
    pub source: usize,
}

/// Failure history for one `(endpoint, source)` pair.
///
/// The zero value stands in for a key that has never failed; stores never
/// materialize a record until the first failure is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthRecord {
    pub failures: u32,
    pub last_failure_unix: u64,
    pub in_cooldown: bool,
}

impl HealthRecord {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.failures == 0 && self.last_failure_unix == 0 && !self.in_cooldown
    }
}

/// Couples a [`HealthPolicy`] with a [`HealthStore`] backing.
///
/// Health tracking is advisory: concurrent requests may interleave reads and
/// writes of the same record and lose an increment, which is accepted.
pub struct HealthTracker<S = MemoryHealthStore> {
    policy: HealthPolicy,
    store: S,
}

impl<S: HealthStore> HealthTracker<S> {
    #[must_use]
    pub fn new(policy: HealthPolicy, store: S) -> Self {
        Self { policy, store }
    }

    /// Whether this key should be offered traffic at `now`.
    ///
    /// Never mutates the record: a key whose cooldown has elapsed is offered
    /// probation traffic while keeping its failure history, so a failed probe
    /// re-arms the full cooldown window immediately.
    #[must_use]
    pub fn is_available(&self, key: HealthKey, now: u64) -> bool {
        self.policy.is_available(&self.store.get(key), now)
    }

    pub fn record_failure(&self, key: HealthKey, now: u64) {
        let record = self.policy.record_failure(self.store.get(key), now);
        if record.in_cooldown {
            tracing::warn!(
                endpoint = key.endpoint,
                source = key.source,
                failures = record.failures,
                "health key entered cooldown"
            );
        }
        self.store.set(key, record);
    }

    pub fn record_success(&self, key: HealthKey) {
        if let Some(reset) = self.policy.record_success(&self.store.get(key)) {
            tracing::info!(
                endpoint = key.endpoint,
                source = key.source,
                "health key recovered"
            );
            self.store.set(key, reset);
        }
    }

    pub fn record_outcome<T>(&self, key: HealthKey, result: &Result<T, GatewayError>, now: u64) {
        match result {
            Ok(_) => self.record_success(key),
            Err(_) => self.record_failure(key, now),
        }
    }
}
