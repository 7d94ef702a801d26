//! Scenario scheduling
//!
//! A scheduler is a mutable work-list walked by an explicit cursor. Each pass
//! runs from the front to the current end of the list. Items added with
//! [`ScenarioScheduler::schedule`] during a pass are queued directly behind the
//! scenario that was just handed out (after any follow-ups already queued for
//! it), so repeats of one scenario run back to back within that same pass.
//! Outside a pass they are appended to the tail. Items removed with
//! [`ScenarioScheduler::ignore`] are gone for every later pass. Starting a new
//! pass ([`ScenarioScheduler::rewind`]) re-reads the current contents rather
//! than a snapshot, which is what lets a selection plugin mark scenarios on
//! one pass and prune on a second.
//!
//! Schedulers also collect execution results and, on
//! [`ScenarioScheduler::finalize`], fold them into one
//! [`AggregatedResult`] per scenario.

use crate::errors::Result;
use crate::result::{AggregatedResult, ScenarioResult};
use crate::scenario::Scenario;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scheduler shared between the runner and plugins
pub type SharedScheduler = Arc<Mutex<dyn ScenarioScheduler>>;

/// Builds the run's scheduler from the ordered discovered scenarios
pub type SchedulerFactory = Arc<dyn Fn(Vec<Arc<Scenario>>) -> SharedScheduler + Send + Sync>;

/// Work-list contract consumed by the runner and plugins
pub trait ScenarioScheduler: Send {
    /// Ordered scenarios captured at startup; never reordered
    fn discovered(&self) -> &[Arc<Scenario>];

    /// Current contents of the work-list
    fn scheduled(&self) -> Vec<Arc<Scenario>>;

    /// Start a new pass from the front of the current work-list
    fn rewind(&mut self);

    /// Next scenario of the current pass, `None` once the pass is exhausted
    ///
    /// Exhausting a pass rewinds the cursor, so the following call starts a
    /// new pass over the current contents.
    fn next(&mut self) -> Option<Arc<Scenario>>;

    /// Remove every pending entry of `scenario`; unknown scenarios are a no-op
    fn ignore(&mut self, scenario: &Scenario);

    /// Append `scenario` for another execution
    fn schedule(&mut self, scenario: Arc<Scenario>);

    /// Stop the current pass and refuse further `schedule` calls
    fn interrupt(&mut self);

    /// Whether [`ScenarioScheduler::interrupt`] ran
    fn is_interrupted(&self) -> bool;

    /// Keep the outcome of one execution attempt
    fn record(&mut self, result: ScenarioResult);

    /// Fold recorded results, one aggregate per `unique_id` in first-seen order
    fn finalize(&mut self) -> Result<Vec<AggregatedResult>>;

    /// Whether repeated executions collapse into a single verdict
    fn aggregates(&self) -> bool;
}

/// Cursor over the pending scenarios
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    discovered: Vec<Arc<Scenario>>,
    items: Vec<Arc<Scenario>>,
    cursor: usize,
    /// Where the next scheduled item lands; `None` outside a pass
    insert_at: Option<usize>,
    interrupted: bool,
}

impl WorkList {
    /// Work-list holding `discovered` in order
    pub fn new(discovered: Vec<Arc<Scenario>>) -> Self {
        Self {
            items: discovered.clone(),
            discovered,
            cursor: 0,
            insert_at: None,
            interrupted: false,
        }
    }

    /// Scenarios handed over at startup
    pub fn discovered(&self) -> &[Arc<Scenario>] {
        &self.discovered
    }

    /// Pending scenarios, including scheduled repeats
    pub fn items(&self) -> &[Arc<Scenario>] {
        &self.items
    }

    /// Start a new pass from the front
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.insert_at = None;
    }

    /// Next item of the pass; `None` rewinds
    pub fn next(&mut self) -> Option<Arc<Scenario>> {
        if self.interrupted || self.cursor >= self.items.len() {
            self.rewind();
            return None;
        }
        let scenario = self.items[self.cursor].clone();
        self.cursor += 1;
        self.insert_at = Some(self.cursor);
        Some(scenario)
    }

    /// Drop every pending entry of `scenario`
    pub fn ignore(&mut self, scenario: &Scenario) {
        let unique_id = scenario.unique_id();
        let removed_before = |end: usize| {
            self.items[..end.min(self.items.len())]
                .iter()
                .filter(|item| item.unique_id() == unique_id)
                .count()
        };
        let consumed = removed_before(self.cursor);
        let queued = self.insert_at.map(removed_before);

        let before = self.items.len();
        self.items.retain(|item| item.unique_id() != unique_id);
        self.cursor -= consumed;
        if let (Some(at), Some(removed)) = (self.insert_at.as_mut(), queued) {
            *at -= removed;
        }
        if self.items.len() != before {
            debug!(scenario = unique_id, "scenario ignored");
        }
    }

    /// Insert after the current item, or append outside a pass
    pub fn schedule(&mut self, scenario: Arc<Scenario>) {
        if self.interrupted {
            warn!(
                scenario = scenario.unique_id(),
                "run interrupted, schedule dropped"
            );
            return;
        }
        debug!(scenario = scenario.unique_id(), "scenario scheduled");
        match self.insert_at.as_mut() {
            Some(at) => {
                self.items.insert(*at, scenario);
                *at += 1;
            }
            None => self.items.push(scenario),
        }
    }

    /// Refuse further scheduling and end the pass
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Whether [`WorkList::interrupt`] ran
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Default scheduler: every result is its own verdict
#[derive(Debug, Default)]
pub struct MonotonicScheduler {
    work: WorkList,
    results: Vec<ScenarioResult>,
}

impl MonotonicScheduler {
    /// Scheduler over `discovered`
    pub fn new(discovered: Vec<Arc<Scenario>>) -> Self {
        Self {
            work: WorkList::new(discovered),
            results: Vec::new(),
        }
    }

    /// Factory registered when no plugin asks for aggregation
    pub fn factory() -> SchedulerFactory {
        Arc::new(|discovered: Vec<Arc<Scenario>>| {
            Arc::new(Mutex::new(Self::new(discovered))) as SharedScheduler
        })
    }
}

impl ScenarioScheduler for MonotonicScheduler {
    fn discovered(&self) -> &[Arc<Scenario>] {
        self.work.discovered()
    }

    fn scheduled(&self) -> Vec<Arc<Scenario>> {
        self.work.items().to_vec()
    }

    fn rewind(&mut self) {
        self.work.rewind();
    }

    fn next(&mut self) -> Option<Arc<Scenario>> {
        self.work.next()
    }

    fn ignore(&mut self, scenario: &Scenario) {
        self.work.ignore(scenario);
    }

    fn schedule(&mut self, scenario: Arc<Scenario>) {
        self.work.schedule(scenario);
    }

    fn interrupt(&mut self) {
        self.work.interrupt();
    }

    fn is_interrupted(&self) -> bool {
        self.work.is_interrupted()
    }

    fn record(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    fn finalize(&mut self) -> Result<Vec<AggregatedResult>> {
        Ok(self
            .results
            .drain(..)
            .map(AggregatedResult::singleton)
            .collect())
    }

    fn aggregates(&self) -> bool {
        false
    }
}

/// Scheduler that folds repeated executions into one verdict per scenario
#[derive(Debug, Default)]
pub struct AggregatingScheduler {
    work: WorkList,
    results: IndexMap<String, Vec<ScenarioResult>>,
}

impl AggregatingScheduler {
    /// Scheduler over `discovered`
    pub fn new(discovered: Vec<Arc<Scenario>>) -> Self {
        Self {
            work: WorkList::new(discovered),
            results: IndexMap::new(),
        }
    }

    /// Factory registered by the repeat and rerun plugins
    pub fn factory() -> SchedulerFactory {
        Arc::new(|discovered: Vec<Arc<Scenario>>| {
            Arc::new(Mutex::new(Self::new(discovered))) as SharedScheduler
        })
    }
}

impl ScenarioScheduler for AggregatingScheduler {
    fn discovered(&self) -> &[Arc<Scenario>] {
        self.work.discovered()
    }

    fn scheduled(&self) -> Vec<Arc<Scenario>> {
        self.work.items().to_vec()
    }

    fn rewind(&mut self) {
        self.work.rewind();
    }

    fn next(&mut self) -> Option<Arc<Scenario>> {
        self.work.next()
    }

    fn ignore(&mut self, scenario: &Scenario) {
        self.work.ignore(scenario);
    }

    fn schedule(&mut self, scenario: Arc<Scenario>) {
        self.work.schedule(scenario);
    }

    fn interrupt(&mut self) {
        self.work.interrupt();
    }

    fn is_interrupted(&self) -> bool {
        self.work.is_interrupted()
    }

    fn record(&mut self, result: ScenarioResult) {
        self.results
            .entry(result.scenario().unique_id().to_string())
            .or_default()
            .push(result);
    }

    fn finalize(&mut self) -> Result<Vec<AggregatedResult>> {
        self.results
            .drain(..)
            .map(|(_, results)| AggregatedResult::aggregate(results))
            .collect()
    }

    fn aggregates(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ScenarioStatus;

    fn scenarios(names: &[&str]) -> Vec<Arc<Scenario>> {
        names
            .iter()
            .map(|name| Scenario::new(format!("{name}.rs"), *name).shared())
            .collect()
    }

    fn drain(scheduler: &mut dyn ScenarioScheduler) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(scenario) = scheduler.next() {
            names.push(scenario.name().to_string());
        }
        names
    }

    #[test]
    fn test_pass_yields_discovered_order() {
        let mut scheduler = MonotonicScheduler::new(scenarios(&["a", "b", "c"]));
        assert_eq!(drain(&mut scheduler), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_second_pass_sees_ignores_from_first() {
        let discovered = scenarios(&["a", "b", "c"]);
        let mut scheduler = MonotonicScheduler::new(discovered.clone());

        while let Some(scenario) = scheduler.next() {
            if scenario.name() == "b" {
                scheduler.ignore(&scenario);
            }
        }

        assert_eq!(drain(&mut scheduler), vec!["a", "c"]);
        assert_eq!(scheduler.discovered().len(), 3);
    }

    #[test]
    fn test_ignore_ahead_of_cursor() {
        let discovered = scenarios(&["a", "b", "c"]);
        let mut scheduler = MonotonicScheduler::new(discovered.clone());

        assert_eq!(scheduler.next().map(|s| s.name().to_string()), Some("a".to_string()));
        scheduler.ignore(&discovered[1]);
        assert_eq!(drain(&mut scheduler), vec!["c"]);
    }

    #[test]
    fn test_ignore_is_idempotent_and_tolerates_strangers() {
        let discovered = scenarios(&["a", "b"]);
        let mut scheduler = MonotonicScheduler::new(discovered.clone());

        scheduler.ignore(&discovered[0]);
        scheduler.ignore(&discovered[0]);
        scheduler.ignore(&Scenario::new("elsewhere.rs", "stranger"));

        assert_eq!(drain(&mut scheduler), vec!["b"]);
    }

    #[test]
    fn test_schedule_mid_pass_is_reached() {
        let discovered = scenarios(&["a", "b"]);
        let mut scheduler = AggregatingScheduler::new(discovered.clone());

        let first = scheduler.next().unwrap();
        scheduler.schedule(first.clone());
        scheduler.schedule(first);

        assert_eq!(drain(&mut scheduler), vec!["a", "a", "b"]);
    }

    #[test]
    fn test_schedule_outside_pass_appends() {
        let discovered = scenarios(&["a", "b"]);
        let mut scheduler = AggregatingScheduler::new(discovered.clone());

        scheduler.schedule(discovered[0].clone());

        assert_eq!(drain(&mut scheduler), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_followups_queue_behind_their_scenario() {
        let discovered = scenarios(&["a", "b", "c"]);
        let mut scheduler = AggregatingScheduler::new(discovered.clone());
        let mut order = Vec::new();

        while let Some(scenario) = scheduler.next() {
            order.push(scenario.name().to_string());
            if scenario.name() == "b" && order.iter().filter(|n| *n == "b").count() == 1 {
                scheduler.schedule(scenario.clone());
                scheduler.ignore(&discovered[0]);
                scheduler.schedule(scenario);
            }
        }

        assert_eq!(order, vec!["a", "b", "b", "b", "c"]);
        assert_eq!(drain(&mut scheduler), vec!["b", "b", "b", "c"]);
    }

    #[test]
    fn test_rewind_restarts_pass() {
        let mut scheduler = MonotonicScheduler::new(scenarios(&["a", "b"]));
        scheduler.next();
        scheduler.rewind();
        assert_eq!(drain(&mut scheduler), vec!["a", "b"]);
    }

    #[test]
    fn test_interrupt_stops_pass_and_drops_schedules() {
        let discovered = scenarios(&["a", "b"]);
        let mut scheduler = AggregatingScheduler::new(discovered.clone());

        scheduler.next();
        scheduler.interrupt();
        scheduler.schedule(discovered[0].clone());

        assert!(scheduler.is_interrupted());
        assert!(scheduler.next().is_none());
        assert_eq!(scheduler.scheduled().len(), 2);
    }

    #[test]
    fn test_monotonic_finalize_keeps_singletons() {
        let discovered = scenarios(&["a"]);
        let mut scheduler = MonotonicScheduler::new(discovered.clone());
        scheduler.record(ScenarioResult::new(discovered[0].clone()).mark_passed());
        scheduler.record(ScenarioResult::new(discovered[0].clone()).mark_failed());

        let aggregated = scheduler.finalize().unwrap();
        assert!(!scheduler.aggregates());
        assert_eq!(aggregated.len(), 2);
        assert!(aggregated.iter().all(|a| a.scenario_results().len() == 1));
    }

    #[test]
    fn test_aggregating_finalize_groups_in_first_seen_order() {
        let discovered = scenarios(&["a", "b"]);
        let mut scheduler = AggregatingScheduler::new(discovered.clone());
        scheduler.record(ScenarioResult::new(discovered[1].clone()).mark_passed());
        scheduler.record(ScenarioResult::new(discovered[0].clone()).mark_passed());
        scheduler.record(ScenarioResult::new(discovered[1].clone()).mark_failed());
        scheduler.record(ScenarioResult::new(discovered[1].clone()).mark_passed());

        let aggregated = scheduler.finalize().unwrap();

        assert!(scheduler.aggregates());
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].scenario().name(), "b");
        assert_eq!(aggregated[0].status(), ScenarioStatus::Failed);
        assert_eq!(aggregated[0].scenario_results().len(), 3);
        assert_eq!(aggregated[1].scenario().name(), "a");
        assert_eq!(aggregated[1].status(), ScenarioStatus::Passed);
    }

    #[test]
    fn test_factories_build_matching_variants() {
        let monotonic = (MonotonicScheduler::factory())(scenarios(&["a"]));
        let aggregating = (AggregatingScheduler::factory())(scenarios(&["a"]));
        assert!(!monotonic.lock().aggregates());
        assert!(aggregating.lock().aggregates());
    }
}
