//! Fail-safe error types

use core::fmt;

use crate::platform::PlatformError;

/// Result type for fail-safe operations
pub type Result<T> = core::result::Result<T, FailSafeError>;

/// Fail-safe operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailSafeError {
    /// Tracker mutation attempted while no window is armed
    ///
    /// This is a caller contract violation: the dispatcher must check
    /// `is_armed_for` before letting a credential-mutating command run.
    InvalidState,
    /// Durable checkpoint commit, load, or clear failed
    ///
    /// In-memory state remains authoritative for the rest of the process
    /// lifetime; what is lost is recovery after a crash.
    Storage(PlatformError),
    /// Expiry timer could not be scheduled or cancelled
    Timer(PlatformError),
}

impl fmt::Display for FailSafeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailSafeError::InvalidState => {
                write!(f, "NOC command recorded while fail-safe disarmed")
            }
            FailSafeError::Storage(e) => write!(f, "Checkpoint storage failed: {}", e),
            FailSafeError::Timer(e) => write!(f, "Expiry timer failed: {}", e),
        }
    }
}
