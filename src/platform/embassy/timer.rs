//! Embassy-backed timer service
//!
//! The service side implements [`TimerService`] by sending commands over a
//! channel to an async expiry task. The task owns the single outstanding
//! registration and publishes the fired handle on a signal; the
//! commissioning event loop consumes the signal and delivers the event to
//! the fail-safe context like any other command.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};

use crate::platform::error::TimerError;
use crate::platform::traits::{TimerHandle, TimerService};
use crate::platform::Result;

/// Commands accepted by the expiry task
#[derive(Debug, Clone, Copy)]
pub enum TimerCommand {
    /// Replace the outstanding registration
    Schedule {
        handle: TimerHandle,
        deadline_ms: u64,
    },
    /// Drop the outstanding registration if `handle` still owns it
    Cancel { handle: TimerHandle },
}

/// Channel carrying commands from the service to the expiry task
pub type TimerCommandChannel = Channel<CriticalSectionRawMutex, TimerCommand, 4>;

/// Signal carrying fired handles to the commissioning event loop
pub type TimerFiredSignal = Signal<CriticalSectionRawMutex, TimerHandle>;

/// Embassy-backed timer service
///
/// # Example
///
/// ```ignore
/// static TIMER_COMMANDS: TimerCommandChannel = Channel::new();
/// static TIMER_FIRED: TimerFiredSignal = Signal::new();
///
/// #[embassy_executor::main]
/// async fn main(spawner: Spawner) {
///     spawner.spawn(fail_safe_timer_task()).unwrap();
///     let mut timer = EmbassyTimerService::new(&TIMER_COMMANDS);
///     // pass `&mut timer` into FailSafeContext::arm / disarm
/// }
///
/// #[embassy_executor::task]
/// async fn fail_safe_timer_task() {
///     expiry_task(&TIMER_COMMANDS, &TIMER_FIRED).await;
/// }
/// ```
pub struct EmbassyTimerService {
    commands: &'static TimerCommandChannel,
    next_handle: u32,
}

impl EmbassyTimerService {
    /// Create a new service sending commands over `commands`
    pub fn new(commands: &'static TimerCommandChannel) -> Self {
        Self {
            commands,
            next_handle: 0,
        }
    }
}

impl TimerService for EmbassyTimerService {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    fn schedule_after(&mut self, duration_ms: u32) -> Result<TimerHandle> {
        if duration_ms == 0 {
            return Err(TimerError::InvalidDuration.into());
        }

        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = TimerHandle(self.next_handle);
        let deadline_ms = Instant::now().as_millis() + u64::from(duration_ms);

        self.commands
            .try_send(TimerCommand::Schedule {
                handle,
                deadline_ms,
            })
            .map_err(|_| TimerError::SlotsExhausted)?;
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) -> Result<()> {
        self.commands
            .try_send(TimerCommand::Cancel { handle })
            .map_err(|_| TimerError::SlotsExhausted)?;
        Ok(())
    }
}

/// Run the expiry task (call from the async executor)
///
/// Owns the single outstanding registration. When the deadline is reached
/// the fired handle is published on `fired`; the event loop then calls
/// `FailSafeContext::on_timer_fired` with it.
pub async fn expiry_task(commands: &'static TimerCommandChannel, fired: &'static TimerFiredSignal) {
    let mut armed: Option<(TimerHandle, u64)> = None;

    loop {
        match armed {
            None => {
                let command = commands.receive().await;
                apply_command(&mut armed, command);
            }
            Some((handle, deadline_ms)) => {
                let deadline = Instant::from_millis(deadline_ms);
                match select(Timer::at(deadline), commands.receive()).await {
                    Either::First(()) => {
                        armed = None;
                        fired.signal(handle);
                    }
                    Either::Second(command) => apply_command(&mut armed, command),
                }
            }
        }
    }
}

fn apply_command(armed: &mut Option<(TimerHandle, u64)>, command: TimerCommand) {
    match command {
        TimerCommand::Schedule {
            handle,
            deadline_ms,
        } => {
            *armed = Some((handle, deadline_ms));
        }
        TimerCommand::Cancel { handle } => {
            if let Some((current, _)) = *armed {
                if current == handle {
                    *armed = None;
                }
            }
        }
    }
}
