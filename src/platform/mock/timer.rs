//! Mock timer service for testing
//!
//! Simulated time with manual advancement. The fired handle is handed back
//! to the test, which delivers it to the context the way the event loop
//! would.

use crate::platform::error::TimerError;
use crate::platform::traits::{TimerHandle, TimerService};
use crate::platform::Result;

/// Mock timer service
///
/// Tracks a single outstanding registration and a simulated monotonic clock.
/// Supports failure injection for timer-slot exhaustion.
///
/// # Example
///
/// ```ignore
/// use fabsafe::platform::mock::MockTimerService;
/// use fabsafe::platform::traits::TimerService;
///
/// let mut timer = MockTimerService::new();
/// let handle = timer.schedule_after(500).unwrap();
///
/// assert_eq!(timer.advance(499), None);
/// assert_eq!(timer.advance(1), Some(handle));
/// ```
#[derive(Debug, Default)]
pub struct MockTimerService {
    now_ms: u64,
    scheduled: Option<(TimerHandle, u64)>,
    fired: Option<TimerHandle>,
    next_handle: u32,
    schedule_count: u32,
    cancel_count: u32,
    fail_next_schedule: bool,
}

impl MockTimerService {
    /// Create a new mock timer service
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time by `ms`
    ///
    /// Returns the handle of the registration that fired, if its deadline
    /// was reached.
    pub fn advance(&mut self, ms: u64) -> Option<TimerHandle> {
        self.now_ms += ms;
        if let Some((handle, deadline_ms)) = self.scheduled {
            if deadline_ms <= self.now_ms {
                self.scheduled = None;
                self.fired = Some(handle);
                return Some(handle);
            }
        }
        None
    }

    /// Take the most recently fired handle, if any
    pub fn take_fired(&mut self) -> Option<TimerHandle> {
        self.fired.take()
    }

    /// Get the deadline of the outstanding registration
    pub fn scheduled_deadline_ms(&self) -> Option<u64> {
        self.scheduled.map(|(_, deadline_ms)| deadline_ms)
    }

    /// Number of schedule attempts (including failed ones)
    pub fn schedule_count(&self) -> u32 {
        self.schedule_count
    }

    /// Number of cancel calls
    pub fn cancel_count(&self) -> u32 {
        self.cancel_count
    }

    /// Fail the next schedule attempt with `TimerError::SlotsExhausted`
    pub fn fail_next_schedule(&mut self) {
        self.fail_next_schedule = true;
    }
}

impl TimerService for MockTimerService {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule_after(&mut self, duration_ms: u32) -> Result<TimerHandle> {
        self.schedule_count += 1;

        if self.fail_next_schedule {
            self.fail_next_schedule = false;
            return Err(TimerError::SlotsExhausted.into());
        }

        if duration_ms == 0 {
            return Err(TimerError::InvalidDuration.into());
        }

        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.scheduled = Some((handle, self.now_ms + u64::from(duration_ms)));
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) -> Result<()> {
        self.cancel_count += 1;

        // Stale handles (already fired or superseded) cancel as a no-op
        if let Some((scheduled, _)) = self.scheduled {
            if scheduled == handle {
                self.scheduled = None;
            }
        }
        Ok(())
    }
}
