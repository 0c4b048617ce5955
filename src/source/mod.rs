//! The resource source protocol.
//!
//! A source is a program capable of producing resource intents. The engine
//! drives a source through a lazy, cancellable iterator of events; the
//! program drives the monitor through RPCs on its own task; the monitor
//! bridges the two with a bounded handoff and per-event completion
//! handshakes.

mod event;
mod monitor;
mod program;
mod rpc;

pub use event::{
    ReadResourceEvent, ReadResult, RegisterResourceEvent, RegisterResourceOutputsEvent,
    RegisterResult, ResultState, SourceEvent,
};
pub use monitor::ResourceMonitor;
pub use program::{ProgramFn, ProgramFuture, ProgramSource, ProgramSourceIterator};
pub use rpc::{
    CallResponse, CheckFailure, InvokeResponse, ReadResourceRequest, ReadResourceResponse,
    RegisterResourceOutputsRequest, RegisterResourceRequest, RegisterResourceResponse,
    ResourceCallRequest, ResourceInvokeRequest,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::cancel::CancelContext;
use crate::error::Result;
use crate::property::PropertyMap;
use crate::tokens::PackageName;

/// Allows a source to look up provider plugins by reference.
pub trait ProviderSource: Send + Sync {
    /// Fetches the provider plugin for the given reference, if one is
    /// registered.
    fn get_provider(&self, reference: &str) -> Option<Arc<dyn Provider>>;
}

/// A provider plugin, as seen from the monitor: an opaque peer that
/// services synchronous invokes and calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Invokes a provider function.
    async fn invoke(&self, token: &str, args: &PropertyMap) -> Result<InvokeResponse>;

    /// Calls a resource method.
    async fn call(&self, token: &str, args: &PropertyMap) -> Result<CallResponse>;
}

/// A source generates the set of resources the planner will process.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the package name of the project this source enumerates.
    fn project(&self) -> &PackageName;

    /// Begins iterating the source.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if the source cannot start.
    async fn iterate(
        &self,
        ctx: &CancelContext,
        providers: Arc<dyn ProviderSource>,
    ) -> Result<Box<dyn SourceIterator>>;

    /// Releases the source; guaranteed on all exit paths.
    async fn close(&self) -> Result<()>;
}

/// Enumerates the resource events a source has to offer.
#[async_trait]
pub trait SourceIterator: Send {
    /// Returns the next event from the source, or `None` at end-of-stream.
    ///
    /// Iteration is demand-driven: the engine calls this when it is ready
    /// to plan one more operation.
    ///
    /// # Errors
    ///
    /// Fails only fatally; cancellation is reported as end-of-stream, not
    /// as an error.
    async fn next(&mut self) -> Result<Option<SourceEvent>>;

    /// Cancels the iterator, stopping the underlying monitor and draining
    /// pending events. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the underlying monitor cannot be stopped.
    async fn cancel(&mut self, ctx: &CancelContext) -> Result<()>;
}
