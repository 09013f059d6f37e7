//! Durable key-value store trait
//!
//! This module defines the persistent storage interface that platform
//! implementations must provide. The fail-safe subsystem owns a single fixed
//! key and stores one small binary record under it.

use crate::platform::Result;

/// Durable key-value store trait
///
/// # Storage Characteristics
///
/// - Each `put` replaces the record atomically: after an unplanned restart a
///   reader observes either the previous record or the new one, never a
///   partial write
/// - Operations are bounded and local (no network round trip); callers may
///   invoke them synchronously from the event loop
pub trait KeyValueStore {
    /// Store a record under `key`, replacing any existing record
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Storage(StorageError::WriteFailed)` if the
    /// write fails, or `StorageError::CapacityExceeded` if the key or value
    /// does not fit the backing store.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Read the record stored under `key` into `buf`
    ///
    /// # Returns
    ///
    /// Number of bytes written to `buf`.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Storage(StorageError::NotFound)` if no record
    /// exists under `key`, `StorageError::CapacityExceeded` if `buf` is too
    /// small, or `StorageError::ReadFailed` if the read fails.
    fn get(&mut self, key: &str, buf: &mut [u8]) -> Result<usize>;

    /// Delete the record stored under `key`
    ///
    /// Deleting an absent key is a no-op success.
    fn delete(&mut self, key: &str) -> Result<()>;
}
