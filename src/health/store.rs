use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{HealthKey, HealthRecord};

/// Get/set contract for health record backings.
///
/// `get` on an unknown key returns the zero record; implementations must not
/// create an entry for it. Records are never deleted through this interface.
pub trait HealthStore: Send + Sync {
    fn get(&self, key: HealthKey) -> HealthRecord;
    fn set(&self, key: HealthKey, record: HealthRecord);
}

/// Process-local backing for single-process deployments. State is lost on
/// restart, which is the intended lifecycle for this store.
#[derive(Default)]
pub struct MemoryHealthStore {
    records: RwLock<FxHashMap<HealthKey, HealthRecord>>,
}

impl MemoryHealthStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl HealthStore for MemoryHealthStore {
    fn get(&self, key: HealthKey) -> HealthRecord {
        self.records.read().get(&key).copied().unwrap_or_default()
    }

    fn set(&self, key: HealthKey, record: HealthRecord) {
        self.records.write().insert(key, record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unknown_key_returns_zero_without_insert() {
        let store = MemoryHealthStore::default();
        let key = HealthKey {
            endpoint: 3,
            source: 1,
        };
        assert!(store.get(key).is_zero());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let store = MemoryHealthStore::default();
        let key = HealthKey {
            endpoint: 0,
            source: 1,
        };
        let record = HealthRecord {
            failures: 2,
            last_failure_unix: 99,
            in_cooldown: false,
        };
        store.set(key, record);
        assert_eq!(store.get(key), record);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryHealthStore::default();
        let a = HealthKey {
            endpoint: 0,
            source: 0,
        };
        let b = HealthKey {
            endpoint: 0,
            source: 1,
        };
        store.set(
            a,
            HealthRecord {
                failures: 1,
                last_failure_unix: 1,
                in_cooldown: false,
            },
        );
        assert!(store.get(b).is_zero());
    }
}
