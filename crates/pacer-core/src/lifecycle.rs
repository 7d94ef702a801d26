//! Run lifecycle
//!
//! [`Lifecycle::run`] drives one complete run: configuration-loaded,
//! arguments-parsed, discovery and ordering, scheduler construction, startup,
//! the scenario loop and cleanup. Errors before startup abort the run with no
//! scenario executed. Errors from startup onwards are treated like an
//! interruption: cleanup still runs on the partial report and the error is
//! handed back in [`RunOutcome`].

use crate::config::{RunArgs, RunConfig};
use crate::dispatcher::Dispatcher;
use crate::errors::{PacerError, Result};
use crate::events::{Event, SharedReport};
use crate::interrupt::{InterruptHandle, InterruptReason};
use crate::orderer::{ScenarioOrderer, StableScenarioOrderer};
use crate::plugin::{Plugin, Registry};
use crate::random::SharedRandom;
use crate::report::Report;
use crate::runner::{ScenarioExecutor, ScenarioRunner};
use crate::scenario::Scenario;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Supplies the scenarios of a run
#[async_trait]
pub trait ScenarioDiscoverer: Send + Sync {
    /// Scenarios in any order; the lifecycle orders them
    async fn discover(&self) -> Result<Vec<Arc<Scenario>>>;
}

/// Discoverer over a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    scenarios: Vec<Arc<Scenario>>,
}

impl StaticDiscoverer {
    /// Discoverer yielding `scenarios`
    pub fn new(scenarios: Vec<Arc<Scenario>>) -> Self {
        Self { scenarios }
    }
}

#[async_trait]
impl ScenarioDiscoverer for StaticDiscoverer {
    async fn discover(&self) -> Result<Vec<Arc<Scenario>>> {
        Ok(self.scenarios.clone())
    }
}

/// Process exit status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// At least one verdict passed and none failed
    Passed,
    /// Something failed, or nothing passed
    Failed,
    /// Stopped by an external signal
    Interrupted,
}

impl ExitStatus {
    /// Classify a sealed report
    pub fn from_report(report: &Report) -> Self {
        match report.interrupted() {
            Some(InterruptReason::HandlerFailed(_)) => Self::Failed,
            Some(_) => Self::Interrupted,
            None if report.failed > 0 || report.passed == 0 => Self::Failed,
            None => Self::Passed,
        }
    }

    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
            Self::Interrupted => 130,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// What a finished run hands to the reporting collaborator
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Sealed report
    pub report: Report,
    /// Status derived from the report
    pub exit_status: ExitStatus,
    /// First handler error raised after startup began
    pub error: Option<PacerError>,
}

/// One configured run
pub struct Lifecycle {
    dispatcher: Arc<Dispatcher>,
    registry: Arc<Registry>,
    config: Arc<RunConfig>,
    discoverer: Arc<dyn ScenarioDiscoverer>,
    orderer: Arc<dyn ScenarioOrderer>,
    executor: Arc<dyn ScenarioExecutor>,
    random: SharedRandom,
    interrupt: InterruptHandle,
    listen_ctrl_c: bool,
}

impl Lifecycle {
    /// Start configuring a run
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::new()
    }

    /// Bus the enabled plugins are subscribed to
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Handle that stops this run once a designated reason is raised
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Execute the run with the operator's final values
    ///
    /// Returns `Err` only when the run was rejected before startup.
    pub async fn run(&self, args: RunArgs) -> Result<RunOutcome> {
        self.dispatcher
            .fire(&Event::ConfigLoaded {
                config: self.config.clone(),
                registry: self.registry.clone(),
            })
            .await?;
        self.dispatcher
            .fire(&Event::ArgParsed {
                args: Arc::new(args),
            })
            .await?;

        let discovered = self.discoverer.discover().await?;
        let ordered = self.orderer.sort(&discovered);
        info!(
            scenarios = ordered.len(),
            scheduler = %self.registry.scheduler_registrant(),
            "starting run"
        );
        let scheduler = self.registry.make_scheduler(ordered);
        let report: SharedReport = Arc::new(Mutex::new(Report::started()));

        let signals = self.listen_ctrl_c.then(|| self.interrupt.listen_ctrl_c());
        let mut error = None;

        match self
            .dispatcher
            .fire(&Event::Startup {
                scheduler: scheduler.clone(),
                interrupt: self.interrupt.clone(),
            })
            .await
        {
            Ok(()) => {
                let runner = ScenarioRunner::new(
                    self.dispatcher.clone(),
                    self.executor.clone(),
                    self.random.clone(),
                    self.interrupt.clone(),
                );
                if let Err(err) = runner.run(&scheduler, &report).await {
                    error = Some(err);
                }
            }
            Err(err) => {
                scheduler.lock().interrupt();
                report
                    .lock()
                    .set_interrupted(InterruptReason::HandlerFailed(err.to_string()));
                error = Some(err);
            }
        }

        if let Some(signals) = signals {
            signals.abort();
        }

        if let Err(err) = self
            .dispatcher
            .fire(&Event::Cleanup {
                report: report.clone(),
            })
            .await
        {
            warn!(error = %err, "cleanup handler failed");
            report
                .lock()
                .set_interrupted(InterruptReason::HandlerFailed(err.to_string()));
            error.get_or_insert(err);
        }

        let report = {
            let mut report = report.lock();
            report.seal();
            report.clone()
        };
        let exit_status = ExitStatus::from_report(&report);
        info!(
            status = %exit_status,
            passed = report.passed,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.elapsed().as_millis() as u64,
            "run finished"
        );

        Ok(RunOutcome {
            report,
            exit_status,
            error,
        })
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("dispatcher", &self.dispatcher)
            .field("registry", &self.registry)
            .field("interrupt", &self.interrupt)
            .finish()
    }
}

/// Builder for [`Lifecycle`]
pub struct LifecycleBuilder {
    config: RunConfig,
    plugins: Vec<Arc<dyn Plugin>>,
    discoverer: Option<Arc<dyn ScenarioDiscoverer>>,
    orderer: Arc<dyn ScenarioOrderer>,
    executor: Option<Arc<dyn ScenarioExecutor>>,
    random: SharedRandom,
    interrupt: InterruptHandle,
    listen_ctrl_c: bool,
}

impl LifecycleBuilder {
    /// Builder with default configuration and no plugins
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            plugins: Vec::new(),
            discoverer: None,
            orderer: Arc::new(StableScenarioOrderer::new()),
            executor: None,
            random: SharedRandom::new(),
            interrupt: InterruptHandle::new(),
            listen_ctrl_c: false,
        }
    }

    /// Use `config` instead of the defaults
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Plugins subscribe in the order they are added
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Supply scenarios through `discoverer`
    pub fn with_discoverer(mut self, discoverer: Arc<dyn ScenarioDiscoverer>) -> Self {
        self.discoverer = Some(discoverer);
        self
    }

    /// Supply a fixed list of scenarios
    pub fn with_scenarios(self, scenarios: Vec<Arc<Scenario>>) -> Self {
        self.with_discoverer(Arc::new(StaticDiscoverer::new(scenarios)))
    }

    /// Replace the directory-tree ordering
    pub fn with_orderer(mut self, orderer: Arc<dyn ScenarioOrderer>) -> Self {
        self.orderer = orderer;
        self
    }

    /// Executor running scenario bodies; required
    pub fn with_executor(mut self, executor: Arc<dyn ScenarioExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Generator handed to scenario bodies; share it with the seed allocator
    pub fn with_random(mut self, random: SharedRandom) -> Self {
        self.random = random;
        self
    }

    /// Share `interrupt` with external signal sources
    pub fn with_interrupt_handle(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Raise a keyboard interruption on Ctrl-C while scenarios run
    pub fn listen_ctrl_c(mut self, enabled: bool) -> Self {
        self.listen_ctrl_c = enabled;
        self
    }

    /// Subscribe the plugins and apply the configured interrupt reasons
    pub fn build(self) -> Result<Lifecycle> {
        let executor = self
            .executor
            .ok_or_else(|| PacerError::config("no scenario executor configured"))?;
        let discoverer = self
            .discoverer
            .unwrap_or_else(|| Arc::new(StaticDiscoverer::default()));

        let dispatcher = Arc::new(Dispatcher::new());
        for plugin in self.plugins {
            info!(plugin = plugin.name(), "plugin enabled");
            plugin.subscribe(&dispatcher);
        }
        self.interrupt.designate(self.config.runner.interrupt_on.clone());

        Ok(Lifecycle {
            dispatcher,
            registry: Arc::new(Registry::new()),
            config: Arc::new(self.config),
            discoverer,
            orderer: self.orderer,
            executor,
            random: self.random,
            interrupt: self.interrupt,
            listen_ctrl_c: self.listen_ctrl_c,
        })
    }
}

impl Default for LifecycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(passed: usize, failed: usize) -> Report {
        let mut report = Report::new();
        report.passed = passed;
        report.failed = failed;
        report
    }

    #[test]
    fn test_exit_status_from_counts() {
        assert_eq!(ExitStatus::from_report(&report(2, 0)), ExitStatus::Passed);
        assert_eq!(ExitStatus::from_report(&report(2, 1)), ExitStatus::Failed);
        assert_eq!(ExitStatus::from_report(&report(0, 0)), ExitStatus::Failed);
    }

    #[test]
    fn test_exit_status_from_interruption() {
        let mut signalled = report(1, 0);
        signalled.set_interrupted(InterruptReason::KeyboardInterrupt);
        assert_eq!(ExitStatus::from_report(&signalled), ExitStatus::Interrupted);
        assert_eq!(ExitStatus::Interrupted.code(), 130);

        let mut broken = report(1, 0);
        broken.set_interrupted(InterruptReason::HandlerFailed("boom".to_string()));
        assert_eq!(ExitStatus::from_report(&broken).code(), 1);
    }

    #[test]
    fn test_build_requires_executor() {
        let err = Lifecycle::builder().build().unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_static_discoverer_returns_its_list() {
        let scenarios = vec![Scenario::new("a.rs", "a").shared()];
        let found = StaticDiscoverer::new(scenarios.clone())
            .discover()
            .await
            .unwrap();
        assert_eq!(found, scenarios);
    }
}
