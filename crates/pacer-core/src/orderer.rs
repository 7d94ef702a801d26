//! Deterministic scenario ordering
//!
//! Discovered scenarios arrive in filesystem order, which differs between
//! machines. [`StableScenarioOrderer`] rebuilds the directory tree from the
//! scenarios' relative paths and walks it depth-first: files of a directory
//! come first (natural order by file name), then its subdirectories (natural
//! order by directory name).

use crate::natural::{natural_cmp, NaturalKey};
use crate::scenario::Scenario;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turns discovered scenarios into an execution sequence
pub trait ScenarioOrderer: Send + Sync {
    /// Return a new ordered list; `scenarios` is left untouched
    fn sort(&self, scenarios: &[Arc<Scenario>]) -> Vec<Arc<Scenario>>;
}

/// Directory-tree ordering independent of input order
#[derive(Debug, Clone, Copy, Default)]
pub struct StableScenarioOrderer;

impl StableScenarioOrderer {
    /// Directory-tree orderer
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct DirNode {
    /// file name -> scenarios declared in that file, in input order
    files: BTreeMap<NaturalKey, Vec<Arc<Scenario>>>,
    dirs: BTreeMap<NaturalKey, DirNode>,
}

impl DirNode {
    fn insert(&mut self, scenario: &Arc<Scenario>) {
        let mut segments: Vec<&str> = scenario
            .rel_path()
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        let file_name = segments.pop().unwrap_or_default();

        let mut node = self;
        for dir in segments {
            node = node.dirs.entry(NaturalKey::from(dir)).or_default();
        }
        node.files
            .entry(NaturalKey::from(file_name))
            .or_default()
            .push(scenario.clone());
    }

    fn walk(&self, out: &mut Vec<Arc<Scenario>>) {
        for scenarios in self.files.values() {
            let mut siblings = scenarios.clone();
            sort_siblings(&mut siblings);
            out.extend(siblings);
        }
        for child in self.dirs.values() {
            child.walk(out);
        }
    }
}

/// Declarations sharing one file sort by name, then template index
fn sort_siblings(scenarios: &mut [Arc<Scenario>]) {
    scenarios.sort_by(|a, b| {
        natural_cmp(a.name(), b.name())
            .then_with(|| a.template_index().cmp(&b.template_index()))
            .then_with(|| a.unique_id().cmp(b.unique_id()))
    });
}

impl ScenarioOrderer for StableScenarioOrderer {
    fn sort(&self, scenarios: &[Arc<Scenario>]) -> Vec<Arc<Scenario>> {
        let mut root = DirNode::default();
        for scenario in scenarios {
            root.insert(scenario);
        }

        let mut ordered = Vec::with_capacity(scenarios.len());
        root.walk(&mut ordered);
        ordered
    }
}
