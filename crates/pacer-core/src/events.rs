//! Lifecycle events flowing through the [`crate::Dispatcher`]

use crate::config::{RunArgs, RunConfig};
use crate::interrupt::InterruptHandle;
use crate::plugin::Registry;
use crate::report::Report;
use crate::result::{AggregatedResult, ScenarioResult};
use crate::scheduler::SharedScheduler;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Report shared with cleanup handlers, which append summary lines to it
pub type SharedReport = Arc<Mutex<Report>>;

/// Key of the dispatcher's handler table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Event::ConfigLoaded`]
    ConfigLoaded,
    /// [`Event::ArgParsed`]
    ArgParsed,
    /// [`Event::Startup`]
    Startup,
    /// [`Event::ScenarioRun`]
    ScenarioRun,
    /// [`Event::ScenarioPassed`]
    ScenarioPassed,
    /// [`Event::ScenarioFailed`]
    ScenarioFailed,
    /// [`Event::ScenarioSkipped`]
    ScenarioSkipped,
    /// [`Event::ScenarioReported`]
    ScenarioReported,
    /// [`Event::Cleanup`]
    Cleanup,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Immutable event payload
///
/// `Startup` and `Cleanup` carry shared collaborators that handlers are allowed
/// to mutate; the event itself is never replaced.
#[derive(Clone)]
pub enum Event {
    /// Project configuration is available; plugins may register factories
    ConfigLoaded {
        /// Project configuration
        config: Arc<RunConfig>,
        /// Collaborators plugins may replace
        registry: Arc<Registry>,
    },
    /// Operator values are final; plugins validate them here
    ArgParsed {
        /// Final operator values
        args: Arc<RunArgs>,
    },
    /// The scheduler holds the ordered discovered scenarios
    ///
    /// Plugins that schedule or wait keep `interrupt` and stop once it is raised.
    Startup {
        /// Scheduler the runner pulls from
        scheduler: SharedScheduler,
        /// Run-wide interruption handle
        interrupt: InterruptHandle,
    },
    /// A scenario is about to execute
    ScenarioRun {
        /// Pending attempt
        scenario_result: ScenarioResult,
    },
    /// An execution attempt passed
    ScenarioPassed {
        /// Terminal attempt
        scenario_result: ScenarioResult,
    },
    /// An execution attempt failed or was interrupted
    ScenarioFailed {
        /// Terminal attempt
        scenario_result: ScenarioResult,
    },
    /// A scenario was skipped without executing
    ScenarioSkipped {
        /// Terminal attempt
        scenario_result: ScenarioResult,
    },
    /// Final verdict for one scenario, after aggregation
    ScenarioReported {
        /// Folded verdict
        aggregated_result: AggregatedResult,
    },
    /// The run is over; the report is about to be sealed
    Cleanup {
        /// Report handlers may append summary lines to
        report: SharedReport,
    },
}

impl Event {
    /// Handler table key for this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConfigLoaded { .. } => EventKind::ConfigLoaded,
            Self::ArgParsed { .. } => EventKind::ArgParsed,
            Self::Startup { .. } => EventKind::Startup,
            Self::ScenarioRun { .. } => EventKind::ScenarioRun,
            Self::ScenarioPassed { .. } => EventKind::ScenarioPassed,
            Self::ScenarioFailed { .. } => EventKind::ScenarioFailed,
            Self::ScenarioSkipped { .. } => EventKind::ScenarioSkipped,
            Self::ScenarioReported { .. } => EventKind::ScenarioReported,
            Self::Cleanup { .. } => EventKind::Cleanup,
        }
    }

    /// Execution attempt carried by per-scenario events
    pub fn scenario_result(&self) -> Option<&ScenarioResult> {
        match self {
            Self::ScenarioRun { scenario_result }
            | Self::ScenarioPassed { scenario_result }
            | Self::ScenarioFailed { scenario_result }
            | Self::ScenarioSkipped { scenario_result } => Some(scenario_result),
            _ => None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Event");
        out.field("kind", &self.kind());
        if let Some(result) = self.scenario_result() {
            out.field("scenario", &result.scenario().unique_id());
        }
        if let Self::ScenarioReported { aggregated_result } = self {
            out.field("scenario", &aggregated_result.scenario().unique_id())
                .field("status", &aggregated_result.status());
        }
        out.finish()
    }
}
