//! Global fail-safe context
//!
//! Provides the process-wide singleton used by the commissioning subsystem
//! and an armed-state mirror for synchronous call sites. This module
//! requires the Embassy runtime and is only available on embedded targets.

#![cfg(feature = "embassy")]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use super::context::FailSafeContext;
use super::{FabricIndex, FABRIC_INDEX_NONE};

/// Global fail-safe context (protected by Mutex)
///
/// Single source of truth for the commissioning window. Locked by the
/// commissioning task for arm/disarm/tracker operations and by the event
/// loop for expiry delivery.
pub static FAIL_SAFE: Mutex<CriticalSectionRawMutex, FailSafeContext> =
    Mutex::new(FailSafeContext::new());

/// Armed-state snapshot mirrored for synchronous call sites
#[derive(Debug, Clone, Copy)]
pub struct ArmedSnapshot {
    /// Whether a window is currently armed
    pub armed: bool,
    /// Fabric the window is scoped to
    pub fabric_index: FabricIndex,
}

/// Synchronous armed-state mirror (for use with critical_section)
///
/// Command handlers that cannot await the async mutex read this mirror
/// instead. The commissioning task refreshes it after every operation that
/// changes the armed state.
static ARMED_SNAPSHOT: critical_section::Mutex<core::cell::RefCell<ArmedSnapshot>> =
    critical_section::Mutex::new(core::cell::RefCell::new(ArmedSnapshot {
        armed: false,
        fabric_index: FABRIC_INDEX_NONE,
    }));

/// Check whether the fail-safe is armed
pub async fn is_fail_safe_armed() -> bool {
    FAIL_SAFE.lock().await.is_armed()
}

/// Check whether the fail-safe is armed for `fabric_index`
pub async fn is_fail_safe_armed_for(fabric_index: FabricIndex) -> bool {
    FAIL_SAFE.lock().await.is_armed_for(fabric_index)
}

/// Refresh the synchronous mirror from the context
///
/// Call after arm, disarm, tracker mutation, or expiry delivery.
pub async fn refresh_armed_snapshot() {
    let context = FAIL_SAFE.lock().await;
    let snapshot = ArmedSnapshot {
        armed: context.is_armed(),
        fabric_index: context.fabric_index(),
    };
    drop(context);

    critical_section::with(|cs| {
        *ARMED_SNAPSHOT.borrow_ref_mut(cs) = snapshot;
    });
}

/// Check whether the fail-safe is armed (synchronous, for command handlers)
pub fn is_fail_safe_armed_sync() -> bool {
    critical_section::with(|cs| ARMED_SNAPSHOT.borrow_ref(cs).armed)
}

/// Check whether the fail-safe is armed for `fabric_index` (synchronous)
pub fn is_fail_safe_armed_for_sync(fabric_index: FabricIndex) -> bool {
    critical_section::with(|cs| {
        let snapshot = *ARMED_SNAPSHOT.borrow_ref(cs);
        snapshot.armed && snapshot.fabric_index == fabric_index
    })
}
