//! Scoped, observable cancellation.
//!
//! One hierarchical primitive distinguishes two levels: **cancel** is
//! graceful ("finish the current operation, then stop") and **terminate**
//! is immediate ("stop now"). Terminating always cancels. Sources form a
//! tree: raising a level on a parent raises it on every child, so closing
//! an outer scope releases everything beneath it.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// An announcement that a cancellation level was raised within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEvent {
    /// A graceful cancellation was requested.
    CancelRequested {
        /// True if the scope belongs to a preview run.
        is_preview: bool,
    },
    /// An immediate termination was requested.
    TerminateRequested {
        /// True if the scope belongs to a preview run.
        is_preview: bool,
    },
}

/// The sink on which a scope announces raised cancellation levels.
pub type ScopeEventSink = tokio::sync::mpsc::UnboundedSender<ScopeEvent>;

/// The observing side of a cancellation source.
///
/// Contexts are cheap to clone and may be shared freely; every clone
/// observes the same underlying signals.
#[derive(Debug, Clone)]
pub struct CancelContext {
    cancel: CancellationToken,
    terminate: CancellationToken,
}

impl CancelContext {
    /// Completes when graceful cancellation is requested.
    #[must_use]
    pub fn on_cancel(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Completes when immediate termination is requested.
    #[must_use]
    pub fn on_terminate(&self) -> WaitForCancellationFuture<'_> {
        self.terminate.cancelled()
    }

    /// Returns true if graceful cancellation has been requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true if immediate termination has been requested.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminate.is_cancelled()
    }

    /// Returns a token that fires on graceful cancellation.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns a token that fires on immediate termination.
    #[must_use]
    pub fn terminate_token(&self) -> CancellationToken {
        self.terminate.clone()
    }
}

/// The raising side of a cancellation pair.
#[derive(Debug)]
pub struct CancelSource {
    context: CancelContext,
}

impl CancelSource {
    /// Creates a new, unraised source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: CancelContext {
                cancel: CancellationToken::new(),
                terminate: CancellationToken::new(),
            },
        }
    }

    /// Creates a child source; levels raised on the parent propagate to the
    /// child, but not the other way around.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            context: CancelContext {
                cancel: self.context.cancel.child_token(),
                terminate: self.context.terminate.child_token(),
            },
        }
    }

    /// Returns the observing context for this source.
    #[must_use]
    pub fn context(&self) -> CancelContext {
        self.context.clone()
    }

    /// Requests graceful cancellation.
    pub fn cancel(&self) {
        debug!("Cancellation requested");
        self.context.cancel.cancel();
    }

    /// Requests immediate termination; this also cancels.
    pub fn terminate(&self) {
        debug!("Termination requested");
        self.context.cancel.cancel();
        self.context.terminate.cancel();
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A scoped source of cancellation and termination requests.
pub trait CancellationScope: Send + Sync {
    /// Returns the context used to observe this scope's requests.
    fn context(&self) -> CancelContext;

    /// Closes the scope, releasing it and propagating termination to every
    /// child context so nothing beneath it awaits forever.
    fn close(&self);
}

/// Provides cancellation scopes for deployment operations.
pub trait CancellationScopeSource: Send + Sync {
    /// Opens a new scope. Raised levels are announced on `events`, if
    /// given.
    fn new_scope(
        &self,
        events: Option<ScopeEventSink>,
        is_preview: bool,
    ) -> Box<dyn CancellationScope>;
}

/// The standard scope implementation: a source plus an announcement sink.
pub struct CancelScope {
    source: CancelSource,
    events: Option<ScopeEventSink>,
    is_preview: bool,
}

impl CancelScope {
    /// Returns true if this scope belongs to a preview run.
    #[must_use]
    pub const fn is_preview(&self) -> bool {
        self.is_preview
    }

    /// Requests graceful cancellation and announces it.
    pub fn cancel(&self) {
        self.source.cancel();
        if let Some(events) = &self.events {
            let _ = events.send(ScopeEvent::CancelRequested {
                is_preview: self.is_preview,
            });
        }
    }

    /// Requests immediate termination and announces it.
    pub fn terminate(&self) {
        self.source.terminate();
        if let Some(events) = &self.events {
            let _ = events.send(ScopeEvent::TerminateRequested {
                is_preview: self.is_preview,
            });
        }
    }
}

impl CancellationScope for CancelScope {
    fn context(&self) -> CancelContext {
        self.source.context()
    }

    fn close(&self) {
        debug!("Closing cancellation scope");
        self.source.terminate();
    }
}

/// The standard scope source.
#[derive(Debug, Default)]
pub struct CancelScopeSource;

impl CancelScopeSource {
    /// Creates a new scope source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CancellationScopeSource for CancelScopeSource {
    fn new_scope(
        &self,
        events: Option<ScopeEventSink>,
        is_preview: bool,
    ) -> Box<dyn CancellationScope> {
        Box::new(CancelScope {
            source: CancelSource::new(),
            events,
            is_preview,
        })
    }
}
