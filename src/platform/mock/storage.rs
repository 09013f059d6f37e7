//! Mock key-value store for testing
//!
//! Provides an in-memory durable store simulation with fault injection for
//! unit tests.

use heapless::{FnvIndexMap, String, Vec};

use crate::platform::error::StorageError;
use crate::platform::traits::KeyValueStore;
use crate::platform::Result;

/// Maximum number of stored records
const MAX_KEYS: usize = 8;

/// Maximum key length in bytes
const MAX_KEY_LEN: usize = 32;

/// Maximum value length in bytes
const MAX_VALUE_LEN: usize = 64;

/// Mock key-value store
///
/// Simulates durable storage in memory for testing. Supports:
/// - Put/get/delete operations with the crash-atomic-per-put contract
/// - Write/read/delete failure injection for testing error handling
/// - Value corruption injection for CRC validation tests
///
/// # Example
///
/// ```ignore
/// use fabsafe::platform::mock::MockKeyValueStore;
/// use fabsafe::platform::traits::KeyValueStore;
///
/// let mut store = MockKeyValueStore::new();
/// store.put("fs/ctx", &[1, 2, 3]).unwrap();
///
/// let mut buf = [0u8; 8];
/// let len = store.get("fs/ctx", &mut buf).unwrap();
/// assert_eq!(&buf[..len], &[1, 2, 3]);
/// ```
#[derive(Debug, Default)]
pub struct MockKeyValueStore {
    entries: FnvIndexMap<String<MAX_KEY_LEN>, Vec<u8, MAX_VALUE_LEN>, MAX_KEYS>,
    put_count: u32,
    fail_next_put: bool,
    fail_next_get: bool,
    fail_next_delete: bool,
}

impl MockKeyValueStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a record exists under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        Self::make_key(key)
            .map(|k| self.entries.contains_key(&k))
            .unwrap_or(false)
    }

    /// Number of completed put operations
    pub fn put_count(&self) -> u32 {
        self.put_count
    }

    /// Overwrite the stored value with a corrupt pattern (for testing error
    /// recovery)
    pub fn inject_corruption(&mut self, key: &str) {
        if let Ok(k) = Self::make_key(key) {
            if let Some(value) = self.entries.get_mut(&k) {
                for byte in value.iter_mut() {
                    *byte = 0xAA;
                }
            }
        }
    }

    /// Fail the next put with `StorageError::WriteFailed`
    pub fn fail_next_put(&mut self) {
        self.fail_next_put = true;
    }

    /// Fail the next get with `StorageError::ReadFailed`
    pub fn fail_next_get(&mut self) {
        self.fail_next_get = true;
    }

    /// Fail the next delete with `StorageError::DeleteFailed`
    pub fn fail_next_delete(&mut self) {
        self.fail_next_delete = true;
    }

    fn make_key(key: &str) -> core::result::Result<String<MAX_KEY_LEN>, StorageError> {
        String::try_from(key).map_err(|_| StorageError::CapacityExceeded)
    }
}

impl KeyValueStore for MockKeyValueStore {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if self.fail_next_put {
            self.fail_next_put = false;
            return Err(StorageError::WriteFailed.into());
        }

        let key = Self::make_key(key)?;
        let value =
            Vec::from_slice(value).map_err(|_| StorageError::CapacityExceeded)?;

        self.entries
            .insert(key, value)
            .map_err(|_| StorageError::CapacityExceeded)?;
        self.put_count += 1;
        Ok(())
    }

    fn get(&mut self, key: &str, buf: &mut [u8]) -> Result<usize> {
        if self.fail_next_get {
            self.fail_next_get = false;
            return Err(StorageError::ReadFailed.into());
        }

        let key = Self::make_key(key)?;
        let value = self.entries.get(&key).ok_or(StorageError::NotFound)?;

        if buf.len() < value.len() {
            return Err(StorageError::CapacityExceeded.into());
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.fail_next_delete {
            self.fail_next_delete = false;
            return Err(StorageError::DeleteFailed.into());
        }

        // Deleting an absent key is a no-op success
        let key = Self::make_key(key)?;
        self.entries.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;

    #[test]
    fn test_mock_store_put_get_roundtrip() {
        let mut store = MockKeyValueStore::new();
        store.put("fs/ctx", &[0xDE, 0xAD]).unwrap();

        let mut buf = [0u8; 16];
        let len = store.get("fs/ctx", &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0xDE, 0xAD]);
        assert_eq!(store.put_count(), 1);
    }

    #[test]
    fn test_mock_store_put_replaces_value() {
        let mut store = MockKeyValueStore::new();
        store.put("fs/ctx", &[1, 2, 3]).unwrap();
        store.put("fs/ctx", &[4]).unwrap();

        let mut buf = [0u8; 16];
        let len = store.get("fs/ctx", &mut buf).unwrap();
        assert_eq!(&buf[..len], &[4]);
    }

    #[test]
    fn test_mock_store_get_missing_key() {
        let mut store = MockKeyValueStore::new();
        let mut buf = [0u8; 16];

        let result = store.get("absent", &mut buf);
        assert_eq!(
            result,
            Err(PlatformError::Storage(StorageError::NotFound))
        );
    }

    #[test]
    fn test_mock_store_delete_is_idempotent() {
        let mut store = MockKeyValueStore::new();
        store.put("fs/ctx", &[1]).unwrap();

        store.delete("fs/ctx").unwrap();
        assert!(!store.contains_key("fs/ctx"));

        // Second delete succeeds as a no-op
        store.delete("fs/ctx").unwrap();
    }

    #[test]
    fn test_mock_store_buffer_too_small() {
        let mut store = MockKeyValueStore::new();
        store.put("fs/ctx", &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 2];
        let result = store.get("fs/ctx", &mut buf);
        assert_eq!(
            result,
            Err(PlatformError::Storage(StorageError::CapacityExceeded))
        );
    }

    #[test]
    fn test_mock_store_failure_injection() {
        let mut store = MockKeyValueStore::new();

        store.fail_next_put();
        assert_eq!(
            store.put("fs/ctx", &[1]),
            Err(PlatformError::Storage(StorageError::WriteFailed))
        );
        // Next put succeeds again
        store.put("fs/ctx", &[1]).unwrap();

        store.fail_next_get();
        let mut buf = [0u8; 16];
        assert_eq!(
            store.get("fs/ctx", &mut buf),
            Err(PlatformError::Storage(StorageError::ReadFailed))
        );

        store.fail_next_delete();
        assert_eq!(
            store.delete("fs/ctx"),
            Err(PlatformError::Storage(StorageError::DeleteFailed))
        );
    }

    #[test]
    fn test_mock_store_corruption_injection() {
        let mut store = MockKeyValueStore::new();
        store.put("fs/ctx", &[1, 2, 3]).unwrap();
        store.inject_corruption("fs/ctx");

        let mut buf = [0u8; 16];
        let len = store.get("fs/ctx", &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0xAA, 0xAA, 0xAA]);
    }
}
