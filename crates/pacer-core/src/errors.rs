//! Unified error type for the pacer core
//!
//! Configuration mistakes, wiring defects and handler failures all surface
//! through [`PacerError`]. Scenario failures are not errors: they are ordinary
//! terminal outcomes recorded on a [`crate::ScenarioResult`].

use crate::interrupt::InterruptReason;

/// Unified error type for all pacer operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PacerError {
    /// Invalid repeat/rerun/seed configuration, rejected before any scenario runs
    #[error("{message}")]
    Config {
        /// Operator-facing message, e.g. `--repeats must be >= 1`
        message: String,
    },

    /// A feature was wired against a scheduler that cannot support it
    #[error("Scheduler misuse: {message}")]
    SchedulerMisuse {
        /// Description of the wiring defect
        message: String,
    },

    /// An event handler failed; remaining handlers for that event were skipped
    #[error("Handler '{handler}' failed on {event}: {message}")]
    Handler {
        /// Name of the failing handler
        handler: String,
        /// Event kind being dispatched
        event: String,
        /// Underlying failure
        message: String,
    },

    /// The run was stopped by an interruption signal
    #[error("Interrupted: {reason}")]
    Interrupted {
        /// Signal that stopped the run
        reason: InterruptReason,
    },

    /// The scenario executor could not run a scenario at all
    #[error("Execution error: {message}")]
    Execution {
        /// Error message describing the execution failure
        message: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Config file error: {message}")]
    ConfigFile {
        /// Error message describing the I/O or parse failure
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl PacerError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scheduler misuse error
    pub fn scheduler_misuse(message: impl Into<String>) -> Self {
        Self::SchedulerMisuse {
            message: message.into(),
        }
    }

    /// Create a handler error
    pub fn handler(
        handler: impl Into<String>,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Handler {
            handler: handler.into(),
            event: event.into(),
            message: message.into(),
        }
    }

    /// Create an interruption error
    pub fn interrupted(reason: InterruptReason) -> Self {
        Self::Interrupted { reason }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a config file error
    pub fn config_file(message: impl Into<String>) -> Self {
        Self::ConfigFile {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error must abort startup before any scenario runs
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::ConfigFile { .. })
    }
}

/// Standard Result type for pacer operations
pub type Result<T> = std::result::Result<T, PacerError>;

impl From<std::io::Error> for PacerError {
    fn from(err: std::io::Error) -> Self {
        Self::config_file(err.to_string())
    }
}

impl From<toml::de::Error> for PacerError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_file(err.to_string())
    }
}
