//! Recording and scripted test doubles

use async_trait::async_trait;
use pacer_core::{
    AggregatedResult, AggregatingScheduler, ExecutionError, PacerError, Scenario,
    ScenarioExecutor, ScenarioResult, ScenarioScheduler, ScenarioStatus, SharedRandom,
    SharedScheduler, Sleeper, MAX_SEED, MIN_SEED,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One observed call on a recording double
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `schedule` with the scenario's unique id
    Schedule(String),
    /// `ignore` with the scenario's unique id
    Ignore(String),
    /// `sleep` with the requested duration
    Sleep(Duration),
}

/// Ordered log shared between doubles so interleaving can be asserted
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one call
    pub fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// Every call in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Unique ids passed to `schedule`, in order
    pub fn schedules(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Schedule(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Durations passed to `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Sleep(duration) => Some(*duration),
                _ => None,
            })
            .collect()
    }

    /// Forget everything logged so far
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Aggregating scheduler that logs `schedule` and `ignore`
pub struct RecordingScheduler {
    inner: AggregatingScheduler,
    log: CallLog,
}

impl RecordingScheduler {
    /// Aggregating scheduler over `discovered` logging into `log`
    pub fn new(discovered: Vec<Arc<Scenario>>, log: &CallLog) -> Self {
        Self {
            inner: AggregatingScheduler::new(discovered),
            log: log.clone(),
        }
    }

    /// Same, behind the shared scheduler handle
    pub fn shared(discovered: Vec<Arc<Scenario>>, log: &CallLog) -> SharedScheduler {
        Arc::new(Mutex::new(Self::new(discovered, log)))
    }
}

impl ScenarioScheduler for RecordingScheduler {
    fn discovered(&self) -> &[Arc<Scenario>] {
        self.inner.discovered()
    }

    fn scheduled(&self) -> Vec<Arc<Scenario>> {
        self.inner.scheduled()
    }

    fn rewind(&mut self) {
        self.inner.rewind();
    }

    fn next(&mut self) -> Option<Arc<Scenario>> {
        self.inner.next()
    }

    fn ignore(&mut self, scenario: &Scenario) {
        self.log.push(Call::Ignore(scenario.unique_id().to_string()));
        self.inner.ignore(scenario);
    }

    fn schedule(&mut self, scenario: Arc<Scenario>) {
        self.log.push(Call::Schedule(scenario.unique_id().to_string()));
        self.inner.schedule(scenario);
    }

    fn interrupt(&mut self) {
        self.inner.interrupt();
    }

    fn is_interrupted(&self) -> bool {
        self.inner.is_interrupted()
    }

    fn record(&mut self, result: ScenarioResult) {
        self.inner.record(result);
    }

    fn finalize(&mut self) -> Result<Vec<AggregatedResult>, PacerError> {
        self.inner.finalize()
    }

    fn aggregates(&self) -> bool {
        self.inner.aggregates()
    }
}

/// Sleeper that logs the requested pause and returns immediately
#[derive(Debug, Clone)]
pub struct RecordingSleeper {
    log: CallLog,
}

impl RecordingSleeper {
    /// Sleeper that logs and returns at once
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.log.push(Call::Sleep(duration));
    }
}

/// What a [`ScriptedExecutor`] observed for one execution
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Scenario executed
    pub unique_id: String,
    /// First value the scenario drew from the shared generator
    pub draw: u64,
}

type Outcome = Result<ScenarioStatus, ExecutionError>;

/// Executor returning queued outcomes per scenario name; `Passed` once a
/// scenario's queue is empty
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    executions: Mutex<Vec<Execution>>,
}

impl ScriptedExecutor {
    /// Executor passing every unscripted scenario
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the scenario called `name`
    pub fn script(self, name: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .entry(name.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Every execution observed, in order
    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().clone()
    }

    /// Executed unique ids, in execution order
    pub fn executed(&self) -> Vec<String> {
        self.executions
            .lock()
            .iter()
            .map(|execution| execution.unique_id.clone())
            .collect()
    }

    /// Draws observed by executions of `unique_id`, in order
    pub fn draws_for(&self, unique_id: &str) -> Vec<u64> {
        self.executions
            .lock()
            .iter()
            .filter(|execution| execution.unique_id == unique_id)
            .map(|execution| execution.draw)
            .collect()
    }
}

#[async_trait]
impl ScenarioExecutor for ScriptedExecutor {
    async fn execute(&self, scenario: &Scenario, random: &SharedRandom) -> Outcome {
        let draw = random.random_int(MIN_SEED, MAX_SEED);
        self.executions.lock().push(Execution {
            unique_id: scenario.unique_id().to_string(),
            draw,
        });
        self.scripts
            .lock()
            .get_mut(scenario.name())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(ScenarioStatus::Passed))
    }
}
