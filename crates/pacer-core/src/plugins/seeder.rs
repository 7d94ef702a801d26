//! Seed allocator
//!
//! Every execution observes a seed derived from one run-level seed:
//!
//! - the discovery stream is seeded from the run seed; its first draw seeds
//!   the overflow stream, the following draws give each discovered scenario
//!   its base seed in discovery order;
//! - the overflow stream mints base seeds for scenarios that were not
//!   discovered at startup. It runs on the shared generator and is resumed from
//!   its snapshot each time, so draws made by scenarios in between never shift
//!   its sequence;
//! - the k-th execution of a scenario (counting from 1) uses the k-th draw of a
//!   generator seeded with its base seed, or the base seed itself in fixed-seed
//!   mode.

use crate::config::RunArgs;
use crate::dispatcher::{Dispatcher, EventHandler};
use crate::errors::{PacerError, Result};
use crate::events::{Event, EventKind, SharedReport};
use crate::plugin::Plugin;
use crate::random::{SeedState, SharedRandom, StandardRandomGenerator};
use crate::scenario::Scenario;
use crate::scheduler::SharedScheduler;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const NAME: &str = "seeder";

#[derive(Debug, Default)]
struct SeederState {
    fixed_seed: bool,
    run_seed: Option<String>,
    overflow: Option<SeedState>,
    base_seeds: HashMap<String, u64>,
    history: HashMap<String, u64>,
    last_seed: Option<u64>,
}

/// Reseeds the shared generator before every execution
pub struct SeederPlugin {
    random: SharedRandom,
    state: Mutex<SeederState>,
}

impl SeederPlugin {
    /// Allocator that reseeds `random` before every execution
    pub fn new(random: SharedRandom) -> Self {
        Self {
            random,
            state: Mutex::new(SeederState::default()),
        }
    }

    /// Run-level seed in effect, synthesized once arguments are parsed
    pub fn run_seed(&self) -> Option<String> {
        self.state.lock().run_seed.clone()
    }

    /// Base seed assigned to `unique_id`, if any
    pub fn base_seed(&self, unique_id: &str) -> Option<u64> {
        self.state.lock().base_seeds.get(unique_id).copied()
    }

    /// Seed applied to the most recent execution
    pub fn last_seed(&self) -> Option<u64> {
        self.state.lock().last_seed
    }

    fn on_arg_parsed(&self, args: &RunArgs) {
        let mut state = self.state.lock();
        state.fixed_seed = args.fixed_seed;
        let run_seed = args
            .seed
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!(seed = %run_seed, fixed = args.fixed_seed, "run seed");
        state.run_seed = Some(run_seed);
    }

    fn on_startup(&self, scheduler: &SharedScheduler) {
        let mut state = self.state.lock();
        let run_seed = state
            .run_seed
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();

        let mut discovery = StandardRandomGenerator::from_seed_str(&run_seed);
        let overflow_seed = discovery.next_seed();
        state.overflow = Some(StandardRandomGenerator::new(overflow_seed).state());

        let scheduler = scheduler.lock();
        for scenario in scheduler.discovered() {
            let seed = discovery.next_seed();
            state
                .base_seeds
                .entry(scenario.unique_id().to_string())
                .or_insert(seed);
        }
        debug!(scenarios = state.base_seeds.len(), "base seeds assigned");
    }

    fn on_scenario_run(&self, scenario: &Scenario) -> Result<()> {
        let mut state = self.state.lock();
        let unique_id = scenario.unique_id();

        let runs = {
            let runs = state.history.entry(unique_id.to_string()).or_insert(0);
            *runs += 1;
            *runs
        };

        let known = state.base_seeds.get(unique_id).copied();
        let base = match known {
            Some(seed) => seed,
            None => {
                let snapshot = state
                    .overflow
                    .take()
                    .ok_or_else(|| PacerError::internal("scenario run before startup"))?;
                let (seed, resumed) = self.random.with(|rng| {
                    rng.set_state(snapshot);
                    let seed = rng.next_seed();
                    (seed, rng.state())
                });
                state.overflow = Some(resumed);
                state.base_seeds.insert(unique_id.to_string(), seed);
                debug!(scenario = unique_id, seed, "base seed minted for new scenario");
                seed
            }
        };

        let seed = if state.fixed_seed {
            base
        } else {
            let mut derived = StandardRandomGenerator::new(base);
            let mut seed = base;
            for _ in 0..runs {
                seed = derived.next_seed();
            }
            seed
        };

        self.random.set_seed(seed);
        state.last_seed = Some(seed);
        debug!(scenario = unique_id, run = runs, seed, "seed applied");
        Ok(())
    }

    fn on_cleanup(&self, report: &SharedReport) {
        let state = self.state.lock();
        let mut report = report.lock();
        if report.passed + report.failed > 0 {
            if let Some(run_seed) = &state.run_seed {
                report.add_summary(format!("--seed {run_seed}"));
            }
        }
    }
}

impl Default for SeederPlugin {
    fn default() -> Self {
        Self::new(SharedRandom::new())
    }
}

#[async_trait]
impl EventHandler for SeederPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        match event {
            Event::ArgParsed { args } => self.on_arg_parsed(args),
            Event::Startup { scheduler, .. } => self.on_startup(scheduler),
            Event::ScenarioRun { scenario_result } => {
                self.on_scenario_run(scenario_result.scenario())?
            }
            Event::Cleanup { report } => self.on_cleanup(report),
            _ => {}
        }
        Ok(())
    }
}

impl Plugin for SeederPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn subscribe(self: Arc<Self>, dispatcher: &Dispatcher) {
        dispatcher
            .listen(EventKind::ArgParsed, self.clone())
            .listen(EventKind::Startup, self.clone())
            .listen(EventKind::ScenarioRun, self.clone())
            .listen(EventKind::Cleanup, self);
    }
}
