//! Execution outcomes and their aggregation
//!
//! A [`ScenarioResult`] records one execution attempt. Repeated executions of
//! the same scenario fold into a single [`AggregatedResult`] verdict.

use crate::errors::{PacerError, Result};
use crate::scenario::Scenario;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Created but not yet terminal
    Pending,
    /// Scenario body succeeded
    Passed,
    /// Scenario body failed or was interrupted
    Failed,
    /// Scenario was not executed
    Skipped,
}

impl ScenarioStatus {
    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Artifact attached to an execution attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artifact {
    /// In-memory payload
    Memory {
        /// Display name
        name: String,
        /// Media type of `data`
        mime_type: String,
        /// Raw payload
        data: Vec<u8>,
    },
    /// Payload written to disk by the scenario
    File {
        /// Display name
        name: String,
        /// Media type of the file contents
        mime_type: String,
        /// Location of the file
        path: PathBuf,
    },
}

impl Artifact {
    /// Artifact name
    pub fn name(&self) -> &str {
        match self {
            Self::Memory { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// Outcome of one concrete execution of a scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    scenario: Arc<Scenario>,
    status: ScenarioStatus,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    artifacts: Vec<Artifact>,
}

impl ScenarioResult {
    /// Pending attempt of `scenario`
    pub fn new(scenario: Arc<Scenario>) -> Self {
        Self {
            scenario,
            status: ScenarioStatus::Pending,
            started_at: None,
            ended_at: None,
            artifacts: Vec::new(),
        }
    }

    /// Scenario this attempt executed
    pub fn scenario(&self) -> &Arc<Scenario> {
        &self.scenario
    }

    /// Current status
    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    /// Whether the attempt passed
    pub fn is_passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Whether the attempt failed
    pub fn is_failed(&self) -> bool {
        self.status == ScenarioStatus::Failed
    }

    /// Whether the attempt was skipped
    pub fn is_skipped(&self) -> bool {
        self.status == ScenarioStatus::Skipped
    }

    /// Terminal passed copy
    pub fn mark_passed(self) -> Self {
        self.mark(ScenarioStatus::Passed)
    }

    /// Terminal failed copy
    pub fn mark_failed(self) -> Self {
        self.mark(ScenarioStatus::Failed)
    }

    /// Terminal skipped copy
    pub fn mark_skipped(self) -> Self {
        self.mark(ScenarioStatus::Skipped)
    }

    /// Terminal statuses are final; later marks are ignored
    fn mark(mut self, status: ScenarioStatus) -> Self {
        if !self.status.is_terminal() {
            self.status = status;
        }
        self
    }

    /// Record when execution began
    pub fn set_started_at(&mut self, at: Instant) {
        self.started_at = Some(at);
    }

    /// Record when execution ended
    pub fn set_ended_at(&mut self, at: Instant) {
        self.ended_at = Some(at);
    }

    /// When execution began
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// When execution ended
    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    /// Wall time between start and end, zero when either is missing
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Keep an artifact produced by the execution
    pub fn attach(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Artifacts in attachment order
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }
}

/// Combined verdict across every execution sharing one `unique_id`
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    main: ScenarioResult,
    scenario_results: Vec<ScenarioResult>,
}

impl AggregatedResult {
    /// Wrap an already chosen representative with its constituents
    pub fn from_existing(main: ScenarioResult, scenario_results: Vec<ScenarioResult>) -> Self {
        Self {
            main,
            scenario_results,
        }
    }

    /// Fold execution attempts of one scenario into a single verdict
    ///
    /// The verdict is `failed` when any attempt failed, otherwise the status of
    /// the last attempt. Constituents keep their production order.
    pub fn aggregate(scenario_results: Vec<ScenarioResult>) -> Result<Self> {
        let Some(last) = scenario_results.last() else {
            return Err(PacerError::internal("cannot aggregate zero scenario results"));
        };
        let unique_id = last.scenario().unique_id();
        if let Some(stray) = scenario_results
            .iter()
            .find(|result| result.scenario().unique_id() != unique_id)
        {
            return Err(PacerError::internal(format!(
                "cannot aggregate '{}' with '{}'",
                stray.scenario().unique_id(),
                unique_id
            )));
        }

        let main = scenario_results
            .iter()
            .find(|result| result.is_failed())
            .unwrap_or(last)
            .clone();
        Ok(Self::from_existing(main, scenario_results))
    }

    /// Singleton aggregate for schedulers that do not repeat scenarios
    pub fn singleton(result: ScenarioResult) -> Self {
        Self::from_existing(result.clone(), vec![result])
    }

    /// Scenario the verdict belongs to
    pub fn scenario(&self) -> &Arc<Scenario> {
        self.main.scenario()
    }

    /// Verdict status
    pub fn status(&self) -> ScenarioStatus {
        self.main.status()
    }

    /// Representative attempt used for reporting
    pub fn main(&self) -> &ScenarioResult {
        &self.main
    }

    /// Attempts folded into the verdict, in execution order
    pub fn scenario_results(&self) -> &[ScenarioResult] {
        &self.scenario_results
    }

    pub fn is_passed(&self) -> bool {
        self.main.is_passed()
    }

    pub fn is_failed(&self) -> bool {
        self.main.is_failed()
    }

    pub fn is_skipped(&self) -> bool {
        self.main.is_skipped()
    }

    /// Sum of the constituents' wall time
    pub fn elapsed(&self) -> Duration {
        self.scenario_results.iter().map(ScenarioResult::elapsed).sum()
    }
}
