//! Embassy platform integration
//!
//! This module provides an Embassy-backed timer service for the fail-safe
//! subsystem. It requires the Embassy runtime and is only available when the
//! `embassy` feature is enabled.

pub mod timer;

pub use timer::{
    expiry_task, EmbassyTimerService, TimerCommand, TimerCommandChannel, TimerFiredSignal,
};
