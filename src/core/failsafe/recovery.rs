//! Boot-time recovery of an interrupted commissioning window
//!
//! A device that crashed mid-window reboots with the fail-safe checkpoint
//! still in durable storage. The commissioning subsystem calls
//! [`recover_stale_fail_safe`] once at stack bring-up, before accepting new
//! commissioning traffic, so the stale window is rolled back
//! deterministically instead of leaving the device in limbo.

use crate::platform::error::StorageError;
use crate::platform::traits::KeyValueStore;
use crate::platform::PlatformError;

use super::checkpoint;
use super::context::ExpiryHandler;
use super::error::{FailSafeError, Result};

/// Detect and roll back a stale fail-safe from before a crash
///
/// When a checkpoint exists, the expiry handler receives the recorded
/// fabric and invocation flags (exactly as it would have on a live expiry)
/// and the record is deleted. A corrupt record is deleted and reported as a
/// storage error; recovery cannot run from it.
///
/// # Returns
///
/// `true` if a stale window was found and rolled back.
pub fn recover_stale_fail_safe<S: KeyValueStore, H: ExpiryHandler>(
    store: &mut S,
    handler: &mut H,
) -> Result<bool> {
    let stale = match checkpoint::load_from_storage(store) {
        Ok(Some(stale)) => stale,
        Ok(None) => return Ok(false),
        Err(FailSafeError::Storage(PlatformError::Storage(StorageError::CorruptRecord))) => {
            crate::log_error!("Discarding corrupt fail-safe checkpoint");
            checkpoint::clear_storage(store)?;
            return Err(FailSafeError::Storage(StorageError::CorruptRecord.into()));
        }
        Err(e) => return Err(e),
    };

    crate::log_warn!(
        "Stale fail-safe found for fabric {}; rolling back",
        stale.fabric_index
    );
    handler.on_fail_safe_expired(
        stale.fabric_index,
        stale.add_noc_invoked,
        stale.update_noc_invoked,
    );
    checkpoint::clear_storage(store)?;
    Ok(true)
}
