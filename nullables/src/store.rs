//! Nullable store: thread-safe in-memory wallet storage for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use cirrus_store::{StoreError, WalletRecord, WalletStore};

/// An in-memory wallet store.
///
/// Counts saves and can be told to fail, so tests can observe exactly when
/// the wallet persists and how it reacts to a broken backend.
#[derive(Default)]
pub struct NullWalletStore {
    record: Mutex<Option<WalletRecord>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl NullWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `record`.
    pub fn with_record(record: WalletRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ..Self::default()
        }
    }

    /// The most recently saved record.
    pub fn record(&self) -> Option<WalletRecord> {
        self.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following save fail with a backend error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Option<WalletRecord>> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WalletStore for NullWalletStore {
    fn load_wallet(&self) -> Result<Option<WalletRecord>, StoreError> {
        Ok(self.lock().clone())
    }

    fn save_wallet(&self, record: &WalletRecord) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store configured to fail".into()));
        }
        *self.lock() = Some(record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store = NullWalletStore::new();
        assert!(store.load_wallet().unwrap().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn save_then_load() {
        let store = NullWalletStore::new();
        let record = WalletRecord {
            age: 4,
            ..WalletRecord::default()
        };
        store.save_wallet(&record).unwrap();
        assert_eq!(store.load_wallet().unwrap(), Some(record));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn failing_store_keeps_previous_record() {
        let original = WalletRecord {
            age: 1,
            ..WalletRecord::default()
        };
        let store = NullWalletStore::with_record(original.clone());
        store.set_fail_saves(true);
        assert!(matches!(
            store.save_wallet(&WalletRecord::default()),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.record(), Some(original));
        assert_eq!(store.save_count(), 0);
    }
}
