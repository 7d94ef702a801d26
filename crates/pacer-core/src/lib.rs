//! Pacer Core
//!
//! Execution orchestration for test scenarios. Given the scenarios a discovery
//! collaborator found, this crate decides:
//! - the order they run in ([`StableScenarioOrderer`], natural order by path)
//! - whether and how often each runs ([`ScenarioScheduler`], [`RepeaterPlugin`],
//!   [`RerunnerPlugin`])
//! - which random seed every execution observes ([`SeederPlugin`])
//! - how repeated executions fold into one verdict ([`AggregatedResult`])
//! - how a run stops cleanly when interrupted ([`InterruptHandle`])
//!
//! Extensions cooperate through the [`Dispatcher`] event bus; a [`Lifecycle`]
//! drives one run from configuration to cleanup.
//!
//! # Example
//!
//! ```rust,ignore
//! use pacer_core::*;
//! use std::sync::Arc;
//!
//! let random = SharedRandom::new();
//! let lifecycle = Lifecycle::builder()
//!     .with_scenarios(discovered)
//!     .with_executor(Arc::new(MyExecutor))
//!     .with_random(random.clone())
//!     .with_plugin(Arc::new(SeederPlugin::new(random)))
//!     .with_plugin(Arc::new(RepeaterPlugin::new()))
//!     .build()?;
//!
//! let outcome = lifecycle.run(RunArgs::default().with_repeats(3)).await?;
//! std::process::exit(outcome.exit_status.code());
//! ```

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod interrupt;
pub mod lifecycle;
pub mod natural;
pub mod orderer;
pub mod plugin;
pub mod plugins;
pub mod random;
pub mod report;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod scheduler;

pub use config::{
    ConfigValidation, RepeaterConfig, RerunnerConfig, RunArgs, RunConfig, RunnerConfig,
    SeederConfig,
};
pub use dispatcher::{Dispatcher, EventHandler};
pub use errors::{PacerError, Result};
pub use events::{Event, EventKind, SharedReport};
pub use interrupt::{InterruptHandle, InterruptReason};
pub use lifecycle::{
    ExitStatus, Lifecycle, LifecycleBuilder, RunOutcome, ScenarioDiscoverer, StaticDiscoverer,
};
pub use natural::{natural_cmp, NaturalKey};
pub use orderer::{ScenarioOrderer, StableScenarioOrderer};
pub use plugin::{Plugin, Registry};
pub use plugins::{RepeaterPlugin, RerunnerPlugin, SeederPlugin, Sleeper, TokioSleeper};
pub use random::{SeedState, SharedRandom, StandardRandomGenerator, MAX_SEED, MIN_SEED};
pub use report::Report;
pub use result::{AggregatedResult, Artifact, ScenarioResult, ScenarioStatus};
pub use runner::{ExecutionError, ScenarioExecutor, ScenarioRunner};
pub use scenario::Scenario;
pub use scheduler::{
    AggregatingScheduler, MonotonicScheduler, ScenarioScheduler, SchedulerFactory,
    SharedScheduler, WorkList,
};
