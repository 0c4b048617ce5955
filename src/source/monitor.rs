//! The resource monitor.
//!
//! The monitor is the bridge between program-side RPCs and iterator-side
//! events. Each registration RPC builds a goal, pushes an event into the
//! iterator's queue, and suspends the calling program task until the engine
//! completes the event. The queue is a bounded single-event handoff, so at
//! most one event sits between enqueue and completion per request channel
//! and the source never buffers unboundedly ahead of the consumer.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::event::{
    ReadResourceEvent, ReadResult, RegisterResourceEvent, RegisterResourceOutputsEvent,
    RegisterResult, SourceEvent,
};
use super::rpc::{
    CallResponse, InvokeResponse, ReadResourceRequest, ReadResourceResponse,
    RegisterResourceOutputsRequest, RegisterResourceRequest, RegisterResourceResponse,
    ResourceCallRequest, ResourceInvokeRequest,
};
use super::ProviderSource;
use crate::cancel::CancelContext;
use crate::error::{Result, SourceError};
use crate::property::PropertyKey;
use crate::resource::{Goal, Id, Urn};
use crate::tokens::{Name, Type};

/// Capacity of the event handoff between monitor and iterator.
const EVENT_HANDOFF_CAPACITY: usize = 1;

/// The RPC-facing object that turns program calls into source events.
pub struct ResourceMonitor {
    address: String,
    events: Mutex<Option<mpsc::Sender<SourceEvent>>>,
    providers: Arc<dyn ProviderSource>,
    cancel: CancellationToken,
    terminate: CancellationToken,
    abort_tx: watch::Sender<bool>,
}

impl ResourceMonitor {
    /// Creates a monitor observing the given cancellation context, returning
    /// it along with the receiving end of its event queue.
    #[must_use]
    pub fn new(
        ctx: &CancelContext,
        providers: Arc<dyn ProviderSource>,
    ) -> (Arc<Self>, mpsc::Receiver<SourceEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_HANDOFF_CAPACITY);
        let (abort_tx, _) = watch::channel(false);
        let monitor = Arc::new(Self {
            address: format!("inproc://monitor/{}", Uuid::new_v4()),
            events: Mutex::new(Some(events_tx)),
            providers,
            cancel: ctx.cancel_token().child_token(),
            terminate: ctx.terminate_token().child_token(),
            abort_tx,
        });
        info!("Resource monitor listening at {}", monitor.address);
        (monitor, events_rx)
    }

    /// Returns the endpoint address the program dials.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns an observable signal indicating the program should terminate
    /// its registration loop.
    #[must_use]
    pub fn abort_channel(&self) -> watch::Receiver<bool> {
        self.abort_tx.subscribe()
    }

    /// Cancels the monitor: stops accepting RPCs, stops emitting events,
    /// and signals the program to abort.
    ///
    /// RPCs already awaiting completion keep waiting; cancellation is
    /// cooperative and their `done` handshakes still arrive (or the
    /// iterator drains them as skipped).
    pub fn cancel(&self) {
        info!("Canceling resource monitor at {}", self.address);
        self.shutdown();
        self.cancel.cancel();
        // send_replace updates the value even when no program has
        // subscribed yet, so a late subscriber still observes the abort.
        self.abort_tx.send_replace(true);
    }

    /// Closes the event queue; subsequent RPCs fail with a shutdown error
    /// and the iterator observes end-of-stream after draining.
    pub(crate) fn shutdown(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Returns the token that fires when the monitor is canceled.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Performs a synchronous provider function call. This is not an event:
    /// the returned value goes straight back to the program.
    ///
    /// # Errors
    ///
    /// Fails if the monitor has shut down, the provider cannot be resolved,
    /// or the provider reports a failure.
    pub async fn invoke(&self, req: ResourceInvokeRequest) -> Result<InvokeResponse> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::MonitorShutDown.into());
        }
        let provider = self.providers.get_provider(&req.provider).ok_or_else(|| {
            SourceError::ProviderNotFound {
                reference: req.provider.clone(),
            }
        })?;
        debug!("Invoke: {}", req.tok);
        provider.invoke(&req.tok, &req.args).await
    }

    /// Performs a synchronous resource method call.
    ///
    /// # Errors
    ///
    /// Fails if the monitor has shut down, the provider cannot be resolved,
    /// or the provider reports a failure.
    pub async fn call(&self, req: ResourceCallRequest) -> Result<CallResponse> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::MonitorShutDown.into());
        }
        let provider = self.providers.get_provider(&req.provider).ok_or_else(|| {
            SourceError::ProviderNotFound {
                reference: req.provider.clone(),
            }
        })?;
        debug!("Call: {}", req.tok);
        provider.call(&req.tok, &req.args).await
    }

    /// Registers a resource: emits a registration event and suspends the
    /// calling program task until the engine completes it.
    ///
    /// # Errors
    ///
    /// Fails if the request is malformed, the monitor has shut down, or the
    /// registration was abandoned by termination.
    pub async fn register_resource(
        &self,
        req: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse> {
        let RegisterResourceRequest {
            ty,
            name,
            parent,
            custom,
            object,
            protect,
            dependencies,
            provider,
            additional_secret_outputs,
            aliases,
            import_id,
            replace_on_changes,
            source_position,
        } = req;

        let ty = Type::parse(ty)?;
        let name = Name::new(name)?;
        let import_id = (!import_id.is_empty()).then(|| Id::new(import_id));

        let goal = Goal::new(ty, name, custom)
            .with_properties(object)
            .with_parent(parse_optional_urn(&parent)?)
            .with_protect(protect)
            .with_dependencies(parse_urns(&dependencies)?)
            .with_provider(provider)
            .with_additional_secret_outputs(
                additional_secret_outputs
                    .into_iter()
                    .map(PropertyKey::from)
                    .collect(),
            )
            .with_aliases(parse_urns(&aliases)?)
            .with_import_id(import_id)
            .with_replace_on_changes(
                replace_on_changes.into_iter().map(PropertyKey::from).collect(),
            )
            .with_source_position(source_position);

        debug!("RegisterResource: {} ({})", goal.name, goal.ty);

        let (done_tx, done_rx) = oneshot::channel();
        self.send_event(SourceEvent::RegisterResource(RegisterResourceEvent::new(
            goal, done_tx,
        )))
        .await?;

        let result: RegisterResult = self.await_done(done_rx).await?;
        Ok(result.state.map_or_else(
            RegisterResourceResponse::default,
            |state| RegisterResourceResponse {
                urn: state.urn.to_string(),
                id: state.id.to_string(),
                object: state.outputs,
            },
        ))
    }

    /// Reads an existing resource: emits a read event and suspends the
    /// calling program task until the engine completes it.
    ///
    /// # Errors
    ///
    /// Fails if the request is malformed, the monitor has shut down, or the
    /// read was abandoned by termination.
    pub async fn read_resource(&self, req: ReadResourceRequest) -> Result<ReadResourceResponse> {
        let ReadResourceRequest {
            id,
            ty,
            name,
            parent,
            properties,
            provider,
            dependencies,
            additional_secret_outputs,
            source_position,
        } = req;

        let ty = Type::parse(ty)?;
        let name = Name::new(name)?;

        debug!("ReadResource: {name} ({ty})");

        let (done_tx, done_rx) = oneshot::channel();
        self.send_event(SourceEvent::ReadResource(ReadResourceEvent::new(
            Id::new(id),
            name,
            ty,
            provider,
            parse_optional_urn(&parent)?,
            properties,
            parse_urns(&dependencies)?,
            additional_secret_outputs
                .into_iter()
                .map(PropertyKey::from)
                .collect(),
            source_position,
            done_tx,
        )))
        .await?;

        let result: ReadResult = self.await_done(done_rx).await?;
        Ok(result.state.map_or_else(ReadResourceResponse::default, |state| {
            ReadResourceResponse {
                urn: state.urn.to_string(),
                properties: state.outputs,
            }
        }))
    }

    /// Attaches computed outputs to a previously registered resource.
    ///
    /// # Errors
    ///
    /// Fails if the URN is malformed, the monitor has shut down, or the
    /// completion was abandoned by termination.
    pub async fn register_resource_outputs(
        &self,
        req: RegisterResourceOutputsRequest,
    ) -> Result<()> {
        let urn = Urn::parse(req.urn)?;
        debug!("RegisterResourceOutputs: {urn}");

        let (done_tx, done_rx) = oneshot::channel();
        self.send_event(SourceEvent::RegisterResourceOutputs(
            RegisterResourceOutputsEvent::new(urn, req.outputs, done_tx),
        ))
        .await?;

        self.await_done(done_rx).await
    }

    /// Enqueues an event for the iterator, suspending until the handoff slot
    /// is free.
    async fn send_event(&self, event: SourceEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::MonitorShutDown.into());
        }
        let sender = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SourceError::MonitorShutDown)?;

        tokio::select! {
            biased;
            result = sender.send(event) => result.map_err(|_| SourceError::MonitorShutDown.into()),
            () = self.terminate.cancelled() => Err(SourceError::MonitorShutDown.into()),
        }
    }

    /// Suspends until the engine completes the event, or until termination
    /// abandons the wait. Graceful cancellation keeps waiting: the iterator
    /// guarantees a terminal completion for every enqueued event.
    async fn await_done<T>(&self, done_rx: oneshot::Receiver<T>) -> Result<T> {
        tokio::select! {
            biased;
            result = done_rx => result.map_err(|_| SourceError::MonitorShutDown.into()),
            () = self.terminate.cancelled() => Err(SourceError::MonitorShutDown.into()),
        }
    }
}

fn parse_optional_urn(s: &str) -> Result<Option<Urn>> {
    if s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Urn::parse(s)?))
    }
}

fn parse_urns(values: &[String]) -> Result<Vec<Urn>> {
    values
        .iter()
        .map(|s| Urn::parse(s.as_str()).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use crate::property::{PropertyMap, PropertyValue};
    use crate::source::event::ResultState;
    use crate::source::{Provider, testutil};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn invoke(&self, _token: &str, args: &PropertyMap) -> Result<InvokeResponse> {
            Ok(InvokeResponse {
                ret: args.copy(),
                failures: Vec::new(),
            })
        }

        async fn call(&self, _token: &str, args: &PropertyMap) -> Result<CallResponse> {
            Ok(CallResponse {
                ret: args.copy(),
                return_dependencies: std::collections::BTreeMap::new(),
                failures: Vec::new(),
            })
        }
    }

    fn monitor_with_provider() -> (Arc<ResourceMonitor>, mpsc::Receiver<SourceEvent>) {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        providers.insert(String::from("aws"), Arc::new(EchoProvider));
        let source = CancelSource::new();
        ResourceMonitor::new(
            &source.context(),
            Arc::new(testutil::MapProviderSource::new(providers)),
        )
    }

    #[tokio::test]
    async fn test_invoke_routes_to_provider() {
        let (monitor, _events) = monitor_with_provider();

        let mut args = PropertyMap::new();
        args.insert("region", PropertyValue::from("us-west-2"));

        let response = monitor
            .invoke(ResourceInvokeRequest {
                tok: String::from("aws:index:getRegion"),
                args,
                provider: String::from("aws"),
                ..ResourceInvokeRequest::default()
            })
            .await
            .expect("invoke succeeds");

        assert!(response.ret.has_value("region"));
        assert!(response.failures.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_unknown_provider() {
        let (monitor, _events) = monitor_with_provider();

        let result = monitor
            .invoke(ResourceInvokeRequest {
                tok: String::from("gcp:index:getZone"),
                provider: String::from("gcp"),
                ..ResourceInvokeRequest::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(crate::error::CirrusError::Source(
                SourceError::ProviderNotFound { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_register_resource_round_trip() {
        let (monitor, mut events) = monitor_with_provider();

        let engine = tokio::spawn(async move {
            let event = events.recv().await.expect("one event arrives");
            let SourceEvent::RegisterResource(register) = event else {
                panic!("expected a registration event");
            };
            assert_eq!(register.goal().name.as_str(), "assets");

            let state = testutil::state_for_goal(register.goal());
            register.done(RegisterResult {
                state: Some(state),
                result: ResultState::Success,
            });
        });

        let response = monitor
            .register_resource(RegisterResourceRequest {
                ty: String::from("aws:s3:Bucket"),
                name: String::from("assets"),
                custom: true,
                ..RegisterResourceRequest::default()
            })
            .await
            .expect("registration completes");

        assert!(response.urn.contains("aws:s3:Bucket::assets"));
        engine.await.expect("engine task completes");
    }

    #[tokio::test]
    async fn test_rpc_after_cancel_is_rejected() {
        let (monitor, _events) = monitor_with_provider();
        monitor.cancel();

        let result = monitor
            .register_resource(RegisterResourceRequest {
                ty: String::from("aws:s3:Bucket"),
                name: String::from("assets"),
                ..RegisterResourceRequest::default()
            })
            .await;

        assert!(result.expect_err("monitor is shut down").is_shutdown());
    }

    #[tokio::test]
    async fn test_cancel_signals_abort_channel() {
        let (monitor, _events) = monitor_with_provider();
        let mut abort = monitor.abort_channel();

        assert!(!*abort.borrow());
        monitor.cancel();

        abort.changed().await.expect("abort fires");
        assert!(*abort.borrow());
    }

    #[tokio::test]
    async fn test_malformed_type_is_a_structured_error() {
        let (monitor, _events) = monitor_with_provider();

        let result = monitor
            .register_resource(RegisterResourceRequest {
                ty: String::from("not a type token"),
                name: String::from("assets"),
                ..RegisterResourceRequest::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(crate::error::CirrusError::Token(_))
        ));
    }
}
