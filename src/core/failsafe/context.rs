//! Fail-safe arm/disarm state machine
//!
//! Owns the armed window, the fabric it is scoped to, the invocation flags,
//! and the expiry deadline. Platform collaborators (timer service, durable
//! store) are passed in at the call sites by the commissioning dispatcher.
//!
//! # Concurrency
//!
//! All operations are expected to execute on the single commissioning event
//! loop. The expiry timer is the only asynchronous trigger, and its firing
//! is delivered to [`FailSafeContext::on_timer_fired`] as an ordinary event
//! on the same loop, so command processing and expiry never race. Access
//! from any other execution context requires external marshaling onto the
//! loop before calling in.

use crate::platform::traits::{KeyValueStore, TimerHandle, TimerService};

use super::checkpoint::{self, Checkpoint};
use super::error::{FailSafeError, Result};
use super::{FabricIndex, FABRIC_INDEX_NONE};

/// Grace window before deferred expiry cleanup runs (extended mode)
pub const GRACE_PERIOD_MS: u32 = 1_000;

/// Fail-safe window state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailSafeState {
    /// No window open
    #[default]
    Disarmed,
    /// Window open, expiry timer running
    Armed,
    /// Window expired with cleanup deferred until session closure or the
    /// grace timer (extended mode only)
    GracePeriod,
}

/// Receives the expiry notification
///
/// Implemented by the commissioning dispatcher, which owns rollback policy.
/// The handler is invoked with the fabric index and invocation flags
/// *before* they are cleared, so it can decide what to roll back (revoke a
/// partially-installed credential, revert network config).
pub trait ExpiryHandler {
    /// Called when the fail-safe window expires without a disarm
    fn on_fail_safe_expired(
        &mut self,
        fabric_index: FabricIndex,
        add_noc_invoked: bool,
        update_noc_invoked: bool,
    );
}

/// Commissioning fail-safe context
///
/// Process-wide singleton owned by the commissioning subsystem: created at
/// stack bring-up with [`FailSafeContext::new`], destroyed only at teardown.
/// At most one window is armed at any time; arming while armed resets the
/// window (controllers may legitimately extend or restart commissioning).
pub struct FailSafeContext {
    state: FailSafeState,
    fabric_index: FabricIndex,
    add_noc_invoked: bool,
    update_noc_invoked: bool,
    expiry_deadline_ms: u64,
    extended: bool,
    timer: Option<TimerHandle>,
}

impl FailSafeContext {
    /// Create a new disarmed context
    pub const fn new() -> Self {
        Self {
            state: FailSafeState::Disarmed,
            fabric_index: FABRIC_INDEX_NONE,
            add_noc_invoked: false,
            update_noc_invoked: false,
            expiry_deadline_ms: 0,
            extended: false,
            timer: None,
        }
    }

    /// Arm the fail-safe window for `fabric_index`
    ///
    /// Succeeds whether or not a window is already open: re-arming cancels
    /// the previous expiry timer, clears the invocation flags, and restarts
    /// the window. On a timer scheduling failure the error is returned and
    /// the window is not considered open.
    pub fn arm<T: TimerService>(
        &mut self,
        fabric_index: FabricIndex,
        duration_ms: u32,
        timer: &mut T,
    ) -> Result<()> {
        if let Some(handle) = self.timer.take() {
            timer.cancel(handle).map_err(FailSafeError::Timer)?;
        }
        self.add_noc_invoked = false;
        self.update_noc_invoked = false;

        let handle = match timer.schedule_after(duration_ms) {
            Ok(handle) => handle,
            Err(e) => {
                self.state = FailSafeState::Disarmed;
                self.fabric_index = FABRIC_INDEX_NONE;
                self.expiry_deadline_ms = 0;
                crate::log_error!("Fail-safe arm failed: no expiry timer available");
                return Err(FailSafeError::Timer(e));
            }
        };

        self.state = FailSafeState::Armed;
        self.fabric_index = fabric_index;
        self.expiry_deadline_ms = timer.now_ms() + u64::from(duration_ms);
        self.timer = Some(handle);
        crate::log_info!(
            "Fail-safe armed for fabric {} ({} ms)",
            fabric_index,
            duration_ms
        );
        Ok(())
    }

    /// Disarm the fail-safe window (the "commissioning succeeded" path)
    ///
    /// Idempotent: disarming while disarmed is a no-op success. In-memory
    /// state is cleared before the timer and checkpoint are released, so the
    /// window is closed even if a collaborator fails.
    pub fn disarm<T: TimerService, S: KeyValueStore>(
        &mut self,
        timer: &mut T,
        store: &mut S,
    ) -> Result<()> {
        if self.state == FailSafeState::Disarmed {
            return Ok(());
        }

        let handle = self.timer.take();
        self.reset();

        if let Some(handle) = handle {
            timer.cancel(handle).map_err(FailSafeError::Timer)?;
        }
        checkpoint::clear_storage(store)?;
        crate::log_info!("Fail-safe disarmed");
        Ok(())
    }

    /// Record that the add-NOC command ran in the current window
    ///
    /// Re-scopes the window to `fabric_index` (a provisional fabric receives
    /// its real index only once a credential command actually runs) and
    /// commits the checkpoint before returning. On a commit failure the
    /// in-memory flags stay set and remain authoritative for the rest of
    /// the process lifetime.
    pub fn set_add_noc_invoked<S: KeyValueStore>(
        &mut self,
        fabric_index: FabricIndex,
        store: &mut S,
    ) -> Result<()> {
        self.record_invocation(fabric_index)?;
        self.add_noc_invoked = true;
        self.commit(store)
    }

    /// Record that the update-NOC command ran in the current window
    ///
    /// Same re-scoping and commit contract as
    /// [`FailSafeContext::set_add_noc_invoked`].
    pub fn set_update_noc_invoked<S: KeyValueStore>(
        &mut self,
        fabric_index: FabricIndex,
        store: &mut S,
    ) -> Result<()> {
        self.record_invocation(fabric_index)?;
        self.update_noc_invoked = true;
        self.commit(store)
    }

    /// Handle the expiry timer event (the failure path)
    ///
    /// Called by the event loop when the timer service reports a fired
    /// registration. Events from a superseded registration are ignored. In
    /// extended mode the first firing enters the grace sub-state and
    /// schedules a shorter secondary timer; cleanup then runs on session
    /// closure or the second firing.
    pub fn on_timer_fired<T: TimerService, S: KeyValueStore, H: ExpiryHandler>(
        &mut self,
        handle: TimerHandle,
        timer: &mut T,
        store: &mut S,
        handler: &mut H,
    ) -> Result<()> {
        if self.timer != Some(handle) {
            crate::log_debug!("Ignoring stale fail-safe timer event");
            return Ok(());
        }
        self.timer = None;

        match self.state {
            FailSafeState::Disarmed => Ok(()),
            FailSafeState::Armed if self.extended => {
                match timer.schedule_after(GRACE_PERIOD_MS) {
                    Ok(handle) => {
                        self.state = FailSafeState::GracePeriod;
                        self.timer = Some(handle);
                        self.expiry_deadline_ms = timer.now_ms() + u64::from(GRACE_PERIOD_MS);
                        crate::log_warn!(
                            "Fail-safe expired for fabric {}; cleanup deferred",
                            self.fabric_index
                        );
                        Ok(())
                    }
                    // No grace slot available: run cleanup immediately
                    Err(_) => self.expire(store, handler),
                }
            }
            FailSafeState::Armed => self.expire(store, handler),
            FailSafeState::GracePeriod => self.expire(store, handler),
        }
    }

    /// Complete a deferred expiry early (extended mode)
    ///
    /// The dispatcher calls this when the secure session the grace period
    /// was held open for has closed. No-op outside the grace sub-state.
    pub fn notify_session_closed<T: TimerService, S: KeyValueStore, H: ExpiryHandler>(
        &mut self,
        timer: &mut T,
        store: &mut S,
        handler: &mut H,
    ) -> Result<()> {
        if self.state != FailSafeState::GracePeriod {
            return Ok(());
        }

        if let Some(handle) = self.timer.take() {
            timer.cancel(handle).map_err(FailSafeError::Timer)?;
        }
        self.expire(store, handler)
    }

    /// Expire the window immediately
    ///
    /// Administrative path: cancels any pending registration and runs the
    /// expiry cleanup now, bypassing the grace sub-state. No-op success when
    /// disarmed.
    pub fn force_expiry<T: TimerService, S: KeyValueStore, H: ExpiryHandler>(
        &mut self,
        timer: &mut T,
        store: &mut S,
        handler: &mut H,
    ) -> Result<()> {
        if self.state == FailSafeState::Disarmed {
            return Ok(());
        }

        if let Some(handle) = self.timer.take() {
            timer.cancel(handle).map_err(FailSafeError::Timer)?;
        }
        self.expire(store, handler)
    }

    /// Whether a window is currently armed
    pub fn is_armed(&self) -> bool {
        self.state == FailSafeState::Armed
    }

    /// Whether a window is armed and scoped to `fabric_index`
    ///
    /// The dispatcher checks this before permitting any fabric-scoped
    /// mutating command, rejecting cross-fabric operations.
    pub fn is_armed_for(&self, fabric_index: FabricIndex) -> bool {
        self.is_armed() && self.fabric_index == fabric_index
    }

    /// Whether expiry cleanup is deferred (grace sub-state)
    pub fn is_busy(&self) -> bool {
        self.state == FailSafeState::GracePeriod
    }

    /// Current window state
    pub fn state(&self) -> FailSafeState {
        self.state
    }

    /// Fabric the window is scoped to
    ///
    /// Valid only while armed or while invocation flags are pending
    /// cleanup; returns [`FABRIC_INDEX_NONE`] otherwise.
    pub fn fabric_index(&self) -> FabricIndex {
        self.fabric_index
    }

    /// Deadline of the running expiry (or grace) timer, in milliseconds
    pub fn expiry_deadline_ms(&self) -> u64 {
        self.expiry_deadline_ms
    }

    /// Whether the add-NOC command ran in the current window
    pub fn add_noc_command_invoked(&self) -> bool {
        self.add_noc_invoked
    }

    /// Whether the update-NOC command ran in the current window
    pub fn update_noc_command_invoked(&self) -> bool {
        self.update_noc_invoked
    }

    /// Whether any credential command ran in the current window
    pub fn noc_command_invoked(&self) -> bool {
        self.add_noc_invoked || self.update_noc_invoked
    }

    /// Enable or disable extended mode
    ///
    /// When enabled, expiry defers cleanup for a short grace period so a
    /// final status can still be delivered over the live secure session.
    pub fn set_extended(&mut self, extended: bool) {
        self.extended = extended;
    }

    /// Whether extended mode is engaged
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    fn record_invocation(&mut self, fabric_index: FabricIndex) -> Result<()> {
        if self.state != FailSafeState::Armed {
            crate::log_error!("NOC command recorded while fail-safe disarmed");
            return Err(FailSafeError::InvalidState);
        }

        // Last write wins; a second invocation naming a different fabric
        // points at a dispatcher-level bug
        if self.noc_command_invoked() && self.fabric_index != fabric_index {
            crate::log_warn!(
                "Fail-safe re-scoped from fabric {} to fabric {}",
                self.fabric_index,
                fabric_index
            );
        }
        self.fabric_index = fabric_index;
        Ok(())
    }

    fn commit<S: KeyValueStore>(&mut self, store: &mut S) -> Result<()> {
        let checkpoint = Checkpoint {
            fabric_index: self.fabric_index,
            add_noc_invoked: self.add_noc_invoked,
            update_noc_invoked: self.update_noc_invoked,
        };
        checkpoint::commit_to_storage(store, &checkpoint)
    }

    fn expire<S: KeyValueStore, H: ExpiryHandler>(
        &mut self,
        store: &mut S,
        handler: &mut H,
    ) -> Result<()> {
        crate::log_warn!("Fail-safe expired for fabric {}", self.fabric_index);
        // The handler sees the flags before they are cleared
        handler.on_fail_safe_expired(
            self.fabric_index,
            self.add_noc_invoked,
            self.update_noc_invoked,
        );
        self.reset();
        checkpoint::clear_storage(store)
    }

    fn reset(&mut self) {
        self.state = FailSafeState::Disarmed;
        self.fabric_index = FABRIC_INDEX_NONE;
        self.add_noc_invoked = false;
        self.update_noc_invoked = false;
        self.expiry_deadline_ms = 0;
        self.timer = None;
    }
}

impl Default for FailSafeContext {
    fn default() -> Self {
        Self::new()
    }
}
