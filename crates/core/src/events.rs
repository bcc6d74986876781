//! Run lifecycle events and the handler registry.
//!
//! Each [`EventKind`] has at most one handler. Registering again replaces
//! the previous handler. Handlers are awaited in place, so emissions from a
//! single run never overlap.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::progress::ProgressUpdate;

/// Names of the events a run can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Progress,
    End,
}

/// An event emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Emitted right before the process is launched.
    Start { source: PathBuf, output: PathBuf },
    /// Emitted for every polling cycle that produced a snapshot.
    Progress(ProgressUpdate),
    /// Emitted once, after the terminal record was observed.
    End { elapsed: Duration },
}

impl RunEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Progress(_) => EventKind::Progress,
            Self::End { .. } => EventKind::End,
        }
    }
}

/// A registered event handler.
pub type EventHandler = Arc<dyn Fn(RunEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Maps each event kind to its single handler.
#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<EventKind, EventHandler>,
}

impl EventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn on<F, Fut>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(RunEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: EventHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers.insert(kind, handler);
    }

    /// Registers a handler receiving the source and output paths.
    pub fn on_start<F, Fut>(&mut self, handler: F)
    where
        F: Fn(PathBuf, PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(EventKind::Start, move |event| {
            let pending = match event {
                RunEvent::Start { source, output } => Some(handler(source, output)),
                _ => None,
            };
            async move {
                if let Some(fut) = pending {
                    fut.await;
                }
            }
        });
    }

    /// Registers a handler receiving each progress update.
    pub fn on_progress<F, Fut>(&mut self, handler: F)
    where
        F: Fn(ProgressUpdate) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(EventKind::Progress, move |event| {
            let pending = match event {
                RunEvent::Progress(update) => Some(handler(update)),
                _ => None,
            };
            async move {
                if let Some(fut) = pending {
                    fut.await;
                }
            }
        });
    }

    /// Registers a handler receiving the total elapsed time.
    pub fn on_end<F, Fut>(&mut self, handler: F)
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(EventKind::End, move |event| {
            let pending = match event {
                RunEvent::End { elapsed } => Some(handler(elapsed)),
                _ => None,
            };
            async move {
                if let Some(fut) = pending {
                    fut.await;
                }
            }
        });
    }

    /// Removes the handler for `kind`.
    pub fn clear(&mut self, kind: EventKind) {
        self.handlers.remove(&kind);
    }

    /// Whether a handler is registered for `kind`.
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Invokes the handler for the event's kind, if any.
    pub async fn emit(&self, event: RunEvent) {
        if let Some(handler) = self.handlers.get(&event.kind()) {
            handler(event).await;
        }
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("registered", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
