//! Scenario and result factories

use pacer_core::{AggregatedResult, Report, Scenario, ScenarioResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Scenario `name` declared in `scenarios/{name}.rs`
pub fn make_scenario(name: &str) -> Arc<Scenario> {
    Scenario::new(format!("scenarios/{name}.rs"), name).shared()
}

/// Scenarios declared at the given relative paths, one per file
pub fn make_scenarios_at(paths: &[&str]) -> Vec<Arc<Scenario>> {
    paths
        .iter()
        .map(|path| Scenario::new(*path, "Scenario").shared())
        .collect()
}

/// Pending result for a fresh scenario
pub fn make_result(name: &str) -> ScenarioResult {
    ScenarioResult::new(make_scenario(name))
}

/// Report shared the way cleanup handlers receive it
pub fn make_report() -> Arc<Mutex<Report>> {
    Arc::new(Mutex::new(Report::new()))
}

/// Report that already counted one verdict per result
pub fn make_report_with(results: Vec<ScenarioResult>) -> Arc<Mutex<Report>> {
    let report = make_report();
    for result in results {
        report.lock().add_result(&AggregatedResult::singleton(result));
    }
    report
}
