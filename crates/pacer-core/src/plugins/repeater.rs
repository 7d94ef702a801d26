//! Repeat policy: run every completed scenario `repeats` times in total

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
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "repeater";

#[derive(Default)]
struct RepeaterState {
    repeats: u32,
    repeats_delay: f64,
    registry: Option<Arc<Registry>>,
    scheduler: Option<SharedScheduler>,
    interrupt: InterruptHandle,
    /// Scenario whose completion last triggered scheduling
    last_trigger: Option<String>,
}

/// Schedules `repeats - 1` extra executions after a scenario completes
pub struct RepeaterPlugin {
    sleeper: Arc<dyn Sleeper>,
    state: Mutex<RepeaterState>,
}

impl RepeaterPlugin {
    /// Policy that waits on the tokio timer between repeats
    pub fn new() -> Self {
        Self::with_sleeper(Arc::new(TokioSleeper))
    }

    /// Policy that waits through `sleeper`
    pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            state: Mutex::new(RepeaterState {
                repeats: 1,
                ..Default::default()
            }),
        }
    }

    fn on_config_loaded(&self, registry: &Arc<Registry>) {
        self.state.lock().registry = Some(registry.clone());
    }

    fn on_arg_parsed(&self, args: &RunArgs) -> Result<()> {
        let mut state = self.state.lock();
        state.repeats = args.repeats;
        state.repeats_delay = args.repeats_delay;

        if args.repeats < 1 {
            return Err(PacerError::config("--repeats must be >= 1"));
        }
        check_delay("--repeats-delay", args.repeats_delay)?;
        if args.repeats_delay > 0.0 && args.repeats <= 1 {
            return Err(PacerError::config(
                "--repeats-delay must be used with --repeats > 1",
            ));
        }
        if args.repeats <= 1 {
            return Ok(());
        }

        if let Some(registry) = &state.registry {
            registry.register_scheduler(AggregatingScheduler::factory(), NAME);
        }
        Ok(())
    }

    fn on_startup(&self, scheduler: &SharedScheduler, interrupt: &InterruptHandle) -> Result<()> {
        let mut state = self.state.lock();
        if state.repeats > 1 && !scheduler.lock().aggregates() {
            return Err(PacerError::scheduler_misuse(
                "repeats require a scheduler that aggregates results",
            ));
        }
        state.scheduler = Some(scheduler.clone());
        state.interrupt = interrupt.clone();
        Ok(())
    }

    async fn on_scenario_end(&self, scenario_result: &ScenarioResult) -> Result<()> {
        let scenario = scenario_result.scenario();
        let (repeats, delay, scheduler, interrupt) = {
            let mut state = self.state.lock();
            if state.repeats <= 1 {
                return Ok(());
            }
            if state.last_trigger.as_deref() == Some(scenario.unique_id()) {
                return Ok(());
            }
            let scheduler = state.scheduler.clone().ok_or_else(|| {
                PacerError::scheduler_misuse("scenario completed before startup")
            })?;
            state.last_trigger = Some(scenario.unique_id().to_string());
            let interrupt = state.interrupt.clone();
            (state.repeats, state.repeats_delay, scheduler, interrupt)
        };

        debug!(scenario = scenario.unique_id(), extra = repeats - 1, "repeating scenario");
        for _ in 1..repeats {
            if halted(&scheduler, &interrupt) {
                break;
            }
            pause(self.sleeper.as_ref(), delay, &interrupt).await;
            if halted(&scheduler, &interrupt) {
                debug!(scenario = scenario.unique_id(), "repeats abandoned, run stopping");
                break;
            }
            scheduler.lock().schedule(scenario.clone());
        }
        Ok(())
    }

    fn on_cleanup(&self, report: &SharedReport) {
        let state = self.state.lock();
        if state.repeats > 1 {
            let mut message = format!("repeated x{}", state.repeats);
            if state.repeats_delay > 0.0 {
                message.push_str(&format!(" with delay {:?}s", state.repeats_delay));
            }
            report.lock().add_summary(message);
        }
    }
}

impl Default for RepeaterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for RepeaterPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        match event {
            Event::ConfigLoaded { registry, .. } => self.on_config_loaded(registry),
            Event::ArgParsed { args } => self.on_arg_parsed(args)?,
            Event::Startup {
                scheduler,
                interrupt,
            } => self.on_startup(scheduler, interrupt)?,
            Event::ScenarioPassed { scenario_result }
            | Event::ScenarioFailed { scenario_result } => {
                self.on_scenario_end(scenario_result).await?
            }
            Event::Cleanup { report } => self.on_cleanup(report),
            _ => {}
        }
        Ok(())
    }
}

impl Plugin for RepeaterPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn subscribe(self: Arc<Self>, dispatcher: &Dispatcher) {
        dispatcher
            .listen(EventKind::ConfigLoaded, self.clone())
            .listen(EventKind::ArgParsed, self.clone())
            .listen(EventKind::Startup, self.clone())
            .listen(EventKind::ScenarioPassed, self.clone())
            .listen(EventKind::ScenarioFailed, self.clone())
            .listen(EventKind::Cleanup, self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use crate::scenario::Scenario;
    use crate::scheduler::MonotonicScheduler;

    fn repeater() -> (Arc<RepeaterPlugin>, Dispatcher) {
        let plugin = Arc::new(RepeaterPlugin::new());
        let dispatcher = Dispatcher::new();
        plugin.clone().subscribe(&dispatcher);
        (plugin, dispatcher)
    }

    async fn fire_args(dispatcher: &Dispatcher, repeats: u32, delay: f64) -> Result<()> {
        let args = RunArgs::default()
            .with_repeats(repeats)
            .with_repeats_delay(delay);
        dispatcher
            .fire(&Event::ArgParsed {
                args: Arc::new(args),
            })
            .await
    }

    #[tokio::test]
    async fn test_registers_aggregating_scheduler_when_active() {
        let (_plugin, dispatcher) = repeater();
        let registry = Arc::new(Registry::new());
        dispatcher
            .fire(&Event::ConfigLoaded {
                config: Arc::default(),
                registry: registry.clone(),
            })
            .await
            .unwrap();

        fire_args(&dispatcher, 2, 0.0).await.unwrap();

        assert_eq!(registry.scheduler_registrant(), "repeater");
    }

    #[tokio::test]
    async fn test_single_run_keeps_default_scheduler() {
        let (_plugin, dispatcher) = repeater();
        let registry = Arc::new(Registry::new());
        dispatcher
            .fire(&Event::ConfigLoaded {
                config: Arc::default(),
                registry: registry.clone(),
            })
            .await
            .unwrap();

        fire_args(&dispatcher, 1, 0.0).await.unwrap();

        assert_eq!(registry.scheduler_registrant(), "default");
    }

    #[tokio::test]
    async fn test_non_aggregating_scheduler_is_misuse() {
        let (_plugin, dispatcher) = repeater();
        fire_args(&dispatcher, 3, 0.0).await.unwrap();

        let scheduler = MonotonicScheduler::factory()(vec![Scenario::new("a.rs", "a").shared()]);
        let err = dispatcher
            .fire(&Event::Startup {
                scheduler,
                interrupt: InterruptHandle::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PacerError::SchedulerMisuse { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_without_repeats_adds_nothing() {
        let (_plugin, dispatcher) = repeater();
        fire_args(&dispatcher, 1, 0.0).await.unwrap();

        let report = Arc::new(Mutex::new(Report::new()));
        dispatcher
            .fire(&Event::Cleanup {
                report: report.clone(),
            })
            .await
            .unwrap();

        assert!(report.lock().summary().is_empty());
    }
}
