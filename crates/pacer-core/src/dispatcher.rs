//! In-process event bus
//!
//! Handlers are kept in append-only lists keyed by [`EventKind`]. Publishing
//! awaits each handler of the event's kind in registration order and stops at
//! the first error, which is handed back to the publisher unchanged.

use crate::errors::Result;
use crate::events::{Event, EventKind};
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Subscriber to one or more event kinds
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and handler errors
    fn name(&self) -> &str;

    /// React to one event; an error stops dispatch of that event
    async fn handle(&self, event: &Event) -> Result<()>;
}

type HandlerFn = dyn for<'a> Fn(&'a Event) -> BoxFuture<'a, Result<()>> + Send + Sync;

/// Closure-backed handler registered through [`Dispatcher::listen_fn`]
struct FnHandler {
    name: String,
    f: Box<HandlerFn>,
}

#[async_trait]
impl EventHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        (self.f)(event).await
    }
}

/// Kind-indexed handler table
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl Dispatcher {
    /// Bus with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `kind`
    pub fn listen(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> &Self {
        debug!(event = %kind, handler = handler.name(), "handler registered");
        self.handlers.write().entry(kind).or_default().push(handler);
        self
    }

    /// Register a closure returning a boxed future
    ///
    /// ```ignore
    /// dispatcher.listen_fn(EventKind::Cleanup, "audit", |event| {
    ///     Box::pin(async move { Ok(()) })
    /// });
    /// ```
    pub fn listen_fn<F>(&self, kind: EventKind, name: impl Into<String>, f: F) -> &Self
    where
        F: for<'a> Fn(&'a Event) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        self.listen(
            kind,
            Arc::new(FnHandler {
                name: name.into(),
                f: Box::new(f),
            }),
        )
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to its handlers, one at a time
    pub async fn fire(&self, event: &Event) -> Result<()> {
        let kind = event.kind();
        // Snapshot so handlers may register or publish without holding the lock
        let handlers = self.handlers.read().get(&kind).cloned().unwrap_or_default();
        debug!(event = ?event, handlers = handlers.len(), "firing event");

        for handler in handlers {
            if let Err(err) = handler.handle(event).await {
                warn!(
                    event = %kind,
                    handler = handler.name(),
                    error = %err,
                    "handler failed, remaining handlers skipped"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let mut map = f.debug_map();
        for (kind, list) in handlers.iter() {
            map.entry(kind, &list.iter().map(|h| h.name()).collect::<Vec<_>>());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PacerError;
    use crate::report::Report;
    use parking_lot::Mutex;

    fn cleanup_event() -> Event {
        Event::Cleanup {
            report: Arc::new(Mutex::new(Report::new())),
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl for<'a> Fn(&'a Event) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static {
        let log = log.clone();
        move |_event| {
            let log = log.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                log.lock().push(label.to_string());
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher
            .listen_fn(EventKind::Cleanup, "first", recorder(&log, "first"))
            .listen_fn(EventKind::Cleanup, "second", recorder(&log, "second"))
            .listen_fn(EventKind::Cleanup, "third", recorder(&log, "third"));

        dispatcher.fire(&cleanup_event()).await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_only_matching_kind_is_called() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher.listen_fn(EventKind::Startup, "startup", recorder(&log, "startup"));

        dispatcher.fire(&cleanup_event()).await.unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(dispatcher.handler_count(EventKind::Startup), 1);
        assert_eq!(dispatcher.handler_count(EventKind::Cleanup), 0);
    }

    #[tokio::test]
    async fn test_first_error_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new();
        dispatcher
            .listen_fn(EventKind::Cleanup, "first", recorder(&log, "first"))
            .listen_fn(EventKind::Cleanup, "broken", |_event| {
                Box::pin(async { Err(PacerError::config("--repeats must be >= 1")) })
            })
            .listen_fn(EventKind::Cleanup, "never", recorder(&log, "never"));

        let err = dispatcher.fire(&cleanup_event()).await.unwrap_err();

        assert_eq!(err, PacerError::config("--repeats must be >= 1"));
        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_handler_may_publish_reentrantly() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.listen_fn(EventKind::Startup, "inner", recorder(&log, "inner"));

        let bus = dispatcher.clone();
        let outer_log = log.clone();
        dispatcher.listen_fn(EventKind::Cleanup, "outer", move |event| {
            let bus = bus.clone();
            let log = outer_log.clone();
            Box::pin(async move {
                log.lock().push("outer:before".to_string());
                if let Event::Cleanup { .. } = event {
                    let scheduler = crate::scheduler::MonotonicScheduler::factory()(Vec::new());
                    let interrupt = crate::interrupt::InterruptHandle::new();
                    bus.fire(&Event::Startup {
                        scheduler,
                        interrupt,
                    })
                    .await?;
                }
                log.lock().push("outer:after".to_string());
                Ok(())
            })
        });

        dispatcher.fire(&cleanup_event()).await.unwrap();

        assert_eq!(*log.lock(), vec!["outer:before", "inner", "outer:after"]);
    }
}
