//! Timer service trait
//!
//! This module defines the expiry-timer interface that platform
//! implementations must provide.

use crate::platform::Result;

/// Handle identifying a scheduled expiry registration
///
/// Handles are compared by the event loop to discard fired events that
/// belong to a superseded registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerHandle(pub u32);

/// Timer service trait
///
/// Platform implementations must provide this interface for scheduling the
/// fail-safe expiry deadline. Only one registration is ever outstanding:
/// callers cancel the previous registration before scheduling a new one.
///
/// # Safety Invariants
///
/// - Monotonic time source (never goes backwards)
/// - The service does not run callbacks; it reports the fired handle to the
///   event loop, which delivers it as an ordinary event on the same logical
///   thread as all other operations
pub trait TimerService {
    /// Get current time in milliseconds
    ///
    /// Returns a monotonic timestamp in milliseconds since platform
    /// initialization.
    fn now_ms(&self) -> u64;

    /// Schedule an expiry registration
    ///
    /// # Arguments
    ///
    /// * `duration_ms` - Interval until the registration fires, in milliseconds
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Timer(TimerError::SlotsExhausted)` if no timer
    /// slot is available, or `TimerError::InvalidDuration` for a zero
    /// duration.
    fn schedule_after(&mut self, duration_ms: u32) -> Result<TimerHandle>;

    /// Cancel a scheduled registration
    ///
    /// Cancelling a handle that has already fired or been superseded is a
    /// no-op success.
    fn cancel(&mut self, handle: TimerHandle) -> Result<()>;
}
