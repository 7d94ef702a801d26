//! Built-in plugins

mod repeater;
mod rerunner;
mod seeder;

pub use repeater::RepeaterPlugin;
pub use rerunner::RerunnerPlugin;
pub use seeder::SeederPlugin;

use crate::errors::{PacerError, Result};
use crate::interrupt::InterruptHandle;
use crate::scheduler::SharedScheduler;
use async_trait::async_trait;
use std::time::Duration;

/// Awaitable pause used between re-scheduled executions
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Resolve after `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Seconds from operator input; callers validate the value first
pub(crate) fn delay_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

/// Whether re-scheduling must stop: the run is stopping or the scheduler refuses work
pub(crate) fn halted(scheduler: &SharedScheduler, interrupt: &InterruptHandle) -> bool {
    interrupt.is_stopping() || scheduler.lock().is_interrupted()
}

/// Sleep `seconds`, returning early once the run is stopping
pub(crate) async fn pause(sleeper: &dyn Sleeper, seconds: f64, interrupt: &InterruptHandle) {
    if seconds <= 0.0 {
        return;
    }
    tokio::select! {
        () = sleeper.sleep(delay_duration(seconds)) => {}
        () = interrupt.stopped() => {}
    }
}

/// Reject delays that are negative, NaN or infinite
pub(crate) fn check_delay(flag: &str, seconds: f64) -> Result<()> {
    if seconds < 0.0 || seconds.is_nan() {
        return Err(PacerError::config(format!("{flag} must be >= 0.0")));
    }
    if seconds.is_infinite() {
        return Err(PacerError::config(format!("{flag} must be finite")));
    }
    Ok(())
}
