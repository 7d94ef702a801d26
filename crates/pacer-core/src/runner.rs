//! Scenario runner
//!
//! Pulls scenarios from the scheduler one at a time, publishes the
//! per-scenario events and records every attempt on the scheduler. The
//! interrupt handle is checked between scenarios only; a scenario in flight
//! always reaches a terminal status. Once the handle is stopping, the scheduler
//! is interrupted before the in-flight verdict is published, so completion
//! handlers can no longer schedule follow-ups.

use crate::dispatcher::Dispatcher;
use crate::errors::{PacerError, Result};
use crate::events::{Event, SharedReport};
use crate::interrupt::{InterruptHandle, InterruptReason};
use crate::random::SharedRandom;
use crate::result::{ScenarioResult, ScenarioStatus};
use crate::scenario::Scenario;
use crate::scheduler::SharedScheduler;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Why an execution did not produce a status
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// The scenario body failed
    #[error("scenario failed: {0}")]
    Failed(String),

    /// The scenario body observed a cancellation signal
    #[error("scenario interrupted: {0}")]
    Interrupted(InterruptReason),
}

/// Runs scenario bodies
#[async_trait]
pub trait ScenarioExecutor: Send + Sync {
    /// Execute one scenario; `random` is already seeded for this execution
    async fn execute(
        &self,
        scenario: &Scenario,
        random: &SharedRandom,
    ) -> std::result::Result<ScenarioStatus, ExecutionError>;
}

/// Drives one run: executes scheduled scenarios and reports their verdicts
pub struct ScenarioRunner {
    dispatcher: Arc<Dispatcher>,
    executor: Arc<dyn ScenarioExecutor>,
    random: SharedRandom,
    interrupt: InterruptHandle,
}

impl ScenarioRunner {
    /// Runner publishing on `dispatcher` and stopping when `interrupt` does
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        executor: Arc<dyn ScenarioExecutor>,
        random: SharedRandom,
        interrupt: InterruptHandle,
    ) -> Self {
        Self {
            dispatcher,
            executor,
            random,
            interrupt,
        }
    }

    /// Replace the set of signals that stop the run
    ///
    /// The set lives on the shared handle, so every clone observes it.
    pub fn with_interrupt_on(self, reasons: Vec<InterruptReason>) -> Self {
        self.interrupt.designate(reasons);
        self
    }

    /// Execute everything the scheduler yields, then report the aggregates
    ///
    /// A handler error stops the loop like an interruption: the scheduler is
    /// interrupted, results gathered so far are still finalized and reported,
    /// and the error is returned afterwards.
    pub async fn run(&self, scheduler: &SharedScheduler, report: &SharedReport) -> Result<()> {
        let outcome = self.run_loop(scheduler, report).await;
        if let Err(err) = &outcome {
            scheduler.lock().interrupt();
            report
                .lock()
                .set_interrupted(InterruptReason::HandlerFailed(err.to_string()));
        }
        let reported = self.report(scheduler, report).await;
        outcome.and(reported)
    }

    async fn run_loop(&self, scheduler: &SharedScheduler, report: &SharedReport) -> Result<()> {
        loop {
            if let Some(reason) = self.interrupt.stop_reason() {
                warn!(%reason, "run interrupted, skipping remaining scenarios");
                scheduler.lock().interrupt();
                report.lock().set_interrupted(reason);
                return Ok(());
            }

            let next = scheduler.lock().next();
            let Some(scenario) = next else {
                return Ok(());
            };

            self.run_scenario(scenario, scheduler).await?;
        }
    }

    async fn run_scenario(&self, scenario: Arc<Scenario>, scheduler: &SharedScheduler) -> Result<()> {
        let mut result = ScenarioResult::new(scenario.clone());

        if scenario.is_skipped() {
            let result = result.mark_skipped();
            self.dispatcher
                .fire(&Event::ScenarioSkipped {
                    scenario_result: result.clone(),
                })
                .await?;
            scheduler.lock().record(result);
            return Ok(());
        }

        result.set_started_at(Instant::now());
        self.dispatcher
            .fire(&Event::ScenarioRun {
                scenario_result: result.clone(),
            })
            .await?;

        let status = match self.executor.execute(&scenario, &self.random).await {
            Ok(ScenarioStatus::Pending) => {
                warn!(scenario = scenario.unique_id(), "executor returned no verdict");
                ScenarioStatus::Failed
            }
            Ok(status) => status,
            Err(ExecutionError::Failed(message)) => {
                debug!(scenario = scenario.unique_id(), %message, "scenario failed");
                ScenarioStatus::Failed
            }
            Err(ExecutionError::Interrupted(reason)) => {
                debug!(scenario = scenario.unique_id(), %reason, "scenario interrupted");
                self.interrupt.raise(reason);
                ScenarioStatus::Failed
            }
        };
        result.set_ended_at(Instant::now());

        // Stop accepting follow-ups before handlers see the verdict
        if self.interrupt.is_stopping() {
            scheduler.lock().interrupt();
        }

        let result = match status {
            ScenarioStatus::Passed => result.mark_passed(),
            ScenarioStatus::Skipped => result.mark_skipped(),
            _ => result.mark_failed(),
        };
        let event = match result.status() {
            ScenarioStatus::Passed => Event::ScenarioPassed {
                scenario_result: result.clone(),
            },
            ScenarioStatus::Skipped => Event::ScenarioSkipped {
                scenario_result: result.clone(),
            },
            _ => Event::ScenarioFailed {
                scenario_result: result.clone(),
            },
        };
        debug!(scenario = scenario.unique_id(), status = %result.status(), "scenario finished");
        let fired = self.dispatcher.fire(&event).await;
        scheduler.lock().record(result);
        fired
    }

    /// Fold recorded attempts, publish one verdict per scenario and count it
    async fn report(&self, scheduler: &SharedScheduler, report: &SharedReport) -> Result<()> {
        let aggregated = scheduler.lock().finalize()?;
        for result in aggregated {
            self.dispatcher
                .fire(&Event::ScenarioReported {
                    aggregated_result: result.clone(),
                })
                .await?;
            report.lock().add_result(&result);
        }
        let report = report.lock();
        info!(
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            "scenarios reported"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("interrupt", &self.interrupt)
            .finish()
    }
}

impl From<ExecutionError> for PacerError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Failed(message) => Self::execution(message),
            ExecutionError::Interrupted(reason) => Self::interrupted(reason),
        }
    }
}
