//! Commissioning fail-safe window
//!
//! While a controller installs or rotates a device's operational credential
//! (NOC), an interrupted operation must not leave the device in an
//! inconsistent or unreachable state. The fail-safe context enforces this:
//!
//! - [`FailSafeContext`] owns the armed/disarmed window, the fabric it is
//!   scoped to, and the expiry deadline
//! - Credential-mutating commands are recorded while the window is open and
//!   checkpointed to durable storage before the recording call returns
//! - On expiry (or [`FailSafeContext::force_expiry`]) the registered
//!   [`ExpiryHandler`] receives the fabric and invocation flags so the
//!   commissioning dispatcher can roll back unconfirmed changes
//! - After an unplanned restart, [`recover_stale_fail_safe`] replays the
//!   checkpoint into the same handler and deletes it
//!
//! All operations are expected to run on the single commissioning event
//! loop; timer expiry is delivered to [`FailSafeContext::on_timer_fired`]
//! as an ordinary event on that loop.

pub mod checkpoint;
mod context;
pub mod error;
pub mod global;
mod recovery;

pub use checkpoint::{Checkpoint, NocCommandFlags, CHECKPOINT_KEY};
pub use context::{ExpiryHandler, FailSafeContext, FailSafeState, GRACE_PERIOD_MS};
pub use error::{FailSafeError, Result};
pub use recovery::recover_stale_fail_safe;

/// Administrative domain identifier assigned during commissioning
pub type FabricIndex = u8;

/// Reserved index meaning "no fabric"
pub const FABRIC_INDEX_NONE: FabricIndex = 0;
