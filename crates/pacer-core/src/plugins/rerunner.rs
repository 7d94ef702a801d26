//! Rerun policy: give failed scenarios extra attempts

use super::{check_delay, halted, pause, Sleeper, TokioSleeper};
use crate::config::RunArgs;
use crate::dispatcher::{Dispatcher, EventHandler};
use crate::errors::{PacerError, Result};
use crate::events::{Event, EventKind, SharedReport};
use crate::interrupt::InterruptHandle;
use crate::plugin::{Plugin, Registry};
use crate::result::ScenarioResult;
use crate::scheduler::{AggregatingScheduler, SharedScheduler};
use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "rerunner";

#[derive(Default)]
struct RerunnerState {
    reruns: u32,
    reruns_delay: f64,
    registry: Option<Arc<Registry>>,
    scheduler: Option<SharedScheduler>,
    interrupt: InterruptHandle,
    last_trigger: Option<String>,
    /// Scenarios that were actually given at least one extra attempt
    rerun: IndexSet<String>,
}

/// Schedules up to `reruns` extra attempts after a scenario fails
pub struct RerunnerPlugin {
    sleeper: Arc<dyn Sleeper>,
    state: Mutex<RerunnerState>,
}

impl RerunnerPlugin {
    /// Policy that waits on the tokio timer between reruns
    pub fn new() -> Self {
        Self::with_sleeper(Arc::new(TokioSleeper))
    }

    /// Policy that waits through `sleeper`
    pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            state: Mutex::new(RerunnerState::default()),
        }
    }

    fn on_arg_parsed(&self, args: &RunArgs) -> Result<()> {
        let mut state = self.state.lock();
        state.reruns = args.reruns;
        state.reruns_delay = args.reruns_delay;

        check_delay("--reruns-delay", args.reruns_delay)?;
        if args.reruns_delay > 0.0 && args.reruns == 0 {
            return Err(PacerError::config(
                "--reruns-delay must be used with --reruns > 0",
            ));
        }
        if args.reruns == 0 {
            return Ok(());
        }

        if let Some(registry) = &state.registry {
            registry.register_scheduler(AggregatingScheduler::factory(), NAME);
        }
        Ok(())
    }

    fn on_startup(&self, scheduler: &SharedScheduler, interrupt: &InterruptHandle) -> Result<()> {
        let mut state = self.state.lock();
        if state.reruns > 0 && !scheduler.lock().aggregates() {
            return Err(PacerError::scheduler_misuse(
                "reruns require a scheduler that aggregates results",
            ));
        }
        state.scheduler = Some(scheduler.clone());
        state.interrupt = interrupt.clone();
        Ok(())
    }

    async fn on_scenario_failed(&self, scenario_result: &ScenarioResult) -> Result<()> {
        let scenario = scenario_result.scenario();
        let (reruns, delay, scheduler, interrupt) = {
            let mut state = self.state.lock();
            if state.reruns == 0 || state.last_trigger.as_deref() == Some(scenario.unique_id()) {
                return Ok(());
            }
            let scheduler = state.scheduler.clone().ok_or_else(|| {
                PacerError::scheduler_misuse("scenario completed before startup")
            })?;
            state.last_trigger = Some(scenario.unique_id().to_string());
            let interrupt = state.interrupt.clone();
            (state.reruns, state.reruns_delay, scheduler, interrupt)
        };

        debug!(scenario = scenario.unique_id(), reruns, "rerunning failed scenario");
        for _ in 0..reruns {
            if halted(&scheduler, &interrupt) {
                break;
            }
            pause(self.sleeper.as_ref(), delay, &interrupt).await;
            if halted(&scheduler, &interrupt) {
                debug!(scenario = scenario.unique_id(), "reruns abandoned, run stopping");
                break;
            }
            scheduler.lock().schedule(scenario.clone());
            self.state
                .lock()
                .rerun
                .insert(scenario.unique_id().to_string());
        }
        Ok(())
    }

    fn on_cleanup(&self, report: &SharedReport) {
        let state = self.state.lock();
        if state.reruns == 0 || state.rerun.is_empty() {
            return;
        }
        let count = state.rerun.len();
        let mut message = format!(
            "rerun {count} scenario{}, {} times",
            if count == 1 { "" } else { "s" },
            state.reruns
        );
        if state.reruns_delay > 0.0 {
            message.push_str(&format!(", with delay {:?}s", state.reruns_delay));
        }
        report.lock().add_summary(message);
    }
}

impl Default for RerunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for RerunnerPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        match event {
            Event::ConfigLoaded { registry, .. } => {
                self.state.lock().registry = Some(registry.clone());
            }
            Event::ArgParsed { args } => self.on_arg_parsed(args)?,
            Event::Startup {
                scheduler,
                interrupt,
            } => self.on_startup(scheduler, interrupt)?,
            Event::ScenarioFailed { scenario_result } => {
                self.on_scenario_failed(scenario_result).await?
            }
            Event::Cleanup { report } => self.on_cleanup(report),
            _ => {}
        }
        Ok(())
    }
}

impl Plugin for RerunnerPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn subscribe(self: Arc<Self>, dispatcher: &Dispatcher) {
        dispatcher
            .listen(EventKind::ConfigLoaded, self.clone())
            .listen(EventKind::ArgParsed, self.clone())
            .listen(EventKind::Startup, self.clone())
            .listen(EventKind::ScenarioFailed, self.clone())
            .listen(EventKind::Cleanup, self);
    }
}
