//! Plugin registration and the scheduler registry

use crate::dispatcher::Dispatcher;
use crate::scenario::Scenario;
use crate::scheduler::{MonotonicScheduler, SchedulerFactory, SharedScheduler};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Extension that observes and influences a run through the event bus
pub trait Plugin: Send + Sync {
    /// Name logged when the plugin is enabled
    fn name(&self) -> &str;

    /// Register this plugin's handlers; called once, before any event fires
    fn subscribe(self: Arc<Self>, dispatcher: &Dispatcher);
}

/// Collaborators plugins can replace while configuration is being loaded
pub struct Registry {
    scheduler: Mutex<(SchedulerFactory, String)>,
}

impl Registry {
    /// Registry whose scheduler is the non-aggregating default
    pub fn new() -> Self {
        Self {
            scheduler: Mutex::new((MonotonicScheduler::factory(), "default".to_string())),
        }
    }

    /// Replace the scheduler factory; the last registration wins
    pub fn register_scheduler(&self, factory: SchedulerFactory, registrant: impl Into<String>) {
        let registrant = registrant.into();
        debug!(registrant = %registrant, "scheduler factory registered");
        *self.scheduler.lock() = (factory, registrant);
    }

    /// Who registered the current scheduler factory
    pub fn scheduler_registrant(&self) -> String {
        self.scheduler.lock().1.clone()
    }

    /// Build the run's scheduler from the ordered discovered scenarios
    pub fn make_scheduler(&self, discovered: Vec<Arc<Scenario>>) -> SharedScheduler {
        let factory = self.scheduler.lock().0.clone();
        factory(discovered)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("scheduler", &self.scheduler_registrant())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::AggregatingScheduler;

    #[test]
    fn test_default_scheduler_does_not_aggregate() {
        let registry = Registry::new();
        let scheduler = registry.make_scheduler(vec![Scenario::new("a.rs", "a").shared()]);
        let scheduler = scheduler.lock();
        assert!(!scheduler.aggregates());
        assert_eq!(scheduler.discovered().len(), 1);
    }

    #[test]
    fn test_registered_factory_wins() {
        let registry = Registry::new();
        registry.register_scheduler(AggregatingScheduler::factory(), "repeater");

        assert_eq!(registry.scheduler_registrant(), "repeater");
        assert!(registry.make_scheduler(Vec::new()).lock().aggregates());
    }
}
