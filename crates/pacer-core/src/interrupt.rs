//! Run-wide interruption
//!
//! An [`InterruptHandle`] is a cooperative cancellation token. Raising it never
//! aborts the scenario in flight; the runner observes it between scenarios,
//! stops launching new work and proceeds to cleanup.
//!
//! Every raised reason is kept. Only designated reasons stop the run, so a
//! designated signal arriving after an ignored one still takes effect.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    /// Ctrl-C from the operator
    KeyboardInterrupt,
    /// Termination requested by the host process
    Terminate,
    /// Cancellation requested by an embedding runtime
    Cancelled,
    /// An event handler failed mid-run
    HandlerFailed(String),
}

impl InterruptReason {
    /// Signals a runner honours unless configured otherwise
    pub fn designated_defaults() -> Vec<Self> {
        vec![Self::KeyboardInterrupt, Self::Terminate, Self::Cancelled]
    }
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyboardInterrupt => f.write_str("keyboard interrupt"),
            Self::Terminate => f.write_str("terminate"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::HandlerFailed(message) => write!(f, "handler failed: {message}"),
        }
    }
}

struct Signals {
    /// Raised reasons in arrival order, without duplicates
    raised: Vec<InterruptReason>,
    designated: Vec<InterruptReason>,
}

impl Signals {
    fn stop_reason(&self) -> Option<&InterruptReason> {
        self.raised
            .iter()
            .find(|reason| self.designated.contains(reason))
    }
}

struct InterruptState {
    signals: Mutex<Signals>,
    /// Set once a designated reason has been raised
    stopping: AtomicBool,
    notify: Notify,
}

impl Default for InterruptState {
    fn default() -> Self {
        Self {
            signals: Mutex::new(Signals {
                raised: Vec::new(),
                designated: InterruptReason::designated_defaults(),
            }),
            stopping: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }
}

/// Cloneable cancellation token shared by the runner, plugins and signal sources
#[derive(Clone, Default)]
pub struct InterruptHandle {
    state: Arc<InterruptState>,
}

impl InterruptHandle {
    /// Handle honouring [`InterruptReason::designated_defaults`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reasons that stop the run
    ///
    /// Reasons raised earlier are re-evaluated against the new set.
    pub fn designate(&self, reasons: Vec<InterruptReason>) {
        let stopping = {
            let mut signals = self.state.signals.lock();
            signals.designated = reasons;
            signals.stop_reason().is_some()
        };
        self.state.stopping.store(stopping, Ordering::SeqCst);
        if stopping {
            self.state.notify.notify_waiters();
        }
    }

    /// Whether raising `reason` stops the run
    pub fn is_designated(&self, reason: &InterruptReason) -> bool {
        self.state.signals.lock().designated.contains(reason)
    }

    /// Record `reason`; a designated reason requests the run to stop
    pub fn raise(&self, reason: InterruptReason) {
        {
            let mut signals = self.state.signals.lock();
            if signals.raised.contains(&reason) {
                return;
            }
            if signals.designated.contains(&reason) {
                warn!(%reason, "run interruption requested");
                self.state.stopping.store(true, Ordering::SeqCst);
            } else {
                debug!(%reason, "undesignated interruption recorded");
            }
            signals.raised.push(reason);
        }
        self.state.notify.notify_waiters();
    }

    /// Whether any reason, designated or not, was raised
    pub fn is_raised(&self) -> bool {
        !self.state.signals.lock().raised.is_empty()
    }

    /// First reason raised
    pub fn reason(&self) -> Option<InterruptReason> {
        self.state.signals.lock().raised.first().cloned()
    }

    /// Every reason raised, in arrival order
    pub fn reasons(&self) -> Vec<InterruptReason> {
        self.state.signals.lock().raised.clone()
    }

    /// Whether a designated reason was raised
    pub fn is_stopping(&self) -> bool {
        self.state.stopping.load(Ordering::SeqCst)
    }

    /// First designated reason raised
    pub fn stop_reason(&self) -> Option<InterruptReason> {
        self.state.signals.lock().stop_reason().cloned()
    }

    /// Resolves once any reason has been raised
    pub async fn raised(&self) {
        self.wait_until(Self::is_raised).await;
    }

    /// Resolves once a designated reason has been raised
    pub async fn stopped(&self) {
        self.wait_until(Self::is_stopping).await;
    }

    async fn wait_until(&self, ready: fn(&Self) -> bool) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if ready(self) {
                return;
            }
            notified.await;
        }
    }

    /// Raise [`InterruptReason::KeyboardInterrupt`] on the first Ctrl-C
    pub fn listen_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.raise(InterruptReason::KeyboardInterrupt);
            }
        })
    }
}

impl fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("raised", &self.reasons())
            .field("stopping", &self.is_stopping())
            .finish()
    }
}
