//! Scenario identity as delivered by the discovery collaborator
//!
//! A [`Scenario`] is immutable value data. It is shared as `Arc<Scenario>`
//! between the scheduler, the runner and every plugin.

use std::fmt;
use std::sync::Arc;

/// One declared test case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scenario {
    unique_id: String,
    rel_path: String,
    name: String,
    subject: String,
    template_index: Option<usize>,
    skip_reason: Option<Option<String>>,
    only: bool,
}

impl Scenario {
    /// Create a scenario declared by `name` in the file at `rel_path`
    ///
    /// `rel_path` is slash-delimited and relative to the project root.
    pub fn new(rel_path: impl Into<String>, name: impl Into<String>) -> Self {
        let rel_path = rel_path.into();
        let name = name.into();
        Self {
            unique_id: make_unique_id(&rel_path, &name, None),
            subject: name.clone(),
            rel_path,
            name,
            template_index: None,
            skip_reason: None,
            only: false,
        }
    }

    /// Set the human-readable subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Mark this scenario as one parametrized variant of its declaration
    pub fn with_template_index(mut self, index: usize) -> Self {
        self.template_index = Some(index);
        self.unique_id = make_unique_id(&self.rel_path, &self.name, Some(index));
        self
    }

    /// Mark the scenario as skipped by upstream filtering
    pub fn skipped(mut self, reason: Option<String>) -> Self {
        self.skip_reason = Some(reason);
        self
    }

    /// Mark the scenario as exclusively selected by upstream filtering
    pub fn only(mut self) -> Self {
        self.only = true;
        self
    }

    /// Freeze into a shareable handle
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// `rel_path::name`, stable across runs
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Path of the declaring file, relative to the project root
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    /// Scenario name within its file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description shown by reporters
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Position among scenarios expanded from one template
    pub fn template_index(&self) -> Option<usize> {
        self.template_index
    }

    /// Whether the scenario is marked to skip
    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }

    /// Reason given when the scenario was marked to skip
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_ref().and_then(|reason| reason.as_deref())
    }

    /// Whether the scenario is marked exclusive
    pub fn is_only(&self) -> bool {
        self.only
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.subject, self.unique_id)
    }
}

/// `path::name`, with `#index` appended for template variants
fn make_unique_id(rel_path: &str, name: &str, template_index: Option<usize>) -> String {
    match template_index {
        Some(index) => format!("{rel_path}::{name}#{index}"),
        None => format!("{rel_path}::{name}"),
    }
}
