//! A source backed by an in-process user program.
//!
//! The program is an async closure handed a handle to the resource monitor.
//! Iterating the source spawns the program on the runtime; the stream ends
//! when the program returns and the last queued event is consumed. The
//! engine drives iteration at its own pace while the program runs on its
//! own task, with the monitor's bounded handoff between them.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::event::SourceEvent;
use super::monitor::ResourceMonitor;
use super::{ProviderSource, Source, SourceIterator};
use crate::cancel::CancelContext;
use crate::error::{Result, SourceError};
use crate::tokens::PackageName;

/// The future a program runs to completion.
pub type ProgramFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// An async closure acting as the user program: it receives a monitor
/// handle and issues registration RPCs against it.
pub type ProgramFn = Arc<dyn Fn(Arc<ResourceMonitor>) -> ProgramFuture + Send + Sync>;

/// A source that enumerates resource intents by running a program.
pub struct ProgramSource {
    project: PackageName,
    program: ProgramFn,
}

impl ProgramSource {
    /// Creates a source for the given project and program.
    pub fn new<F, Fut>(project: PackageName, program: F) -> Self
    where
        F: Fn(Arc<ResourceMonitor>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            project,
            program: Arc::new(move |monitor| -> ProgramFuture { Box::pin(program(monitor)) }),
        }
    }
}

#[async_trait]
impl Source for ProgramSource {
    fn project(&self) -> &PackageName {
        &self.project
    }

    async fn iterate(
        &self,
        ctx: &CancelContext,
        providers: Arc<dyn ProviderSource>,
    ) -> Result<Box<dyn SourceIterator>> {
        if ctx.is_terminated() {
            return Err(
                SourceError::configuration("cancellation scope is already terminated").into(),
            );
        }

        let (monitor, events) = ResourceMonitor::new(ctx, providers);

        let program = Arc::clone(&self.program);
        let program_monitor = Arc::clone(&monitor);
        let handle = tokio::spawn(async move {
            let result = program(Arc::clone(&program_monitor)).await;
            // The stream ends once the program can no longer produce events.
            program_monitor.shutdown();
            result
        });

        Ok(Box::new(ProgramSourceIterator {
            monitor,
            events,
            program: Some(handle),
            finished: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Iterator over the events of a running program.
pub struct ProgramSourceIterator {
    monitor: Arc<ResourceMonitor>,
    events: mpsc::Receiver<SourceEvent>,
    program: Option<JoinHandle<Result<()>>>,
    finished: bool,
}

#[async_trait]
impl SourceIterator for ProgramSourceIterator {
    async fn next(&mut self) -> Result<Option<SourceEvent>> {
        if self.finished {
            return Ok(None);
        }

        let cancel = self.monitor.cancel_token();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.finished = true;
                self.drain_pending();
                Ok(None)
            }
            event = self.events.recv() => match event {
                Some(event) => Ok(Some(event)),
                None => {
                    self.finished = true;
                    self.finish_program().await
                }
            },
        }
    }

    async fn cancel(&mut self, _ctx: &CancelContext) -> Result<()> {
        debug!("Canceling source iterator");
        self.monitor.cancel();
        self.drain_pending();
        self.finished = true;
        Ok(())
    }
}

impl ProgramSourceIterator {
    /// Completes every event still sitting in the queue as skipped, so the
    /// originating RPCs unblock.
    fn drain_pending(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            event.complete_canceled();
        }
    }

    /// Joins the finished program and converts its outcome into the
    /// stream's terminal value.
    async fn finish_program(&mut self) -> Result<Option<SourceEvent>> {
        let Some(handle) = self.program.take() else {
            return Ok(None);
        };
        match handle.await {
            Ok(Ok(())) => {
                debug!("Program completed");
                Ok(None)
            }
            // A program that bailed out because the monitor shut down under
            // it observed cancellation, not a failure of its own.
            Ok(Err(err)) if err.is_shutdown() => Ok(None),
            Ok(Err(err)) => Err(SourceError::ProgramFailed {
                message: err.to_string(),
            }
            .into()),
            Err(join_err) => Err(SourceError::ProgramFailed {
                message: join_err.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use crate::error::CirrusError;
    use crate::property::{PropertyMap, PropertyValue};
    use crate::source::event::{ReadResult, RegisterResult, ResultState};
    use crate::source::rpc::{
        ReadResourceRequest, RegisterResourceOutputsRequest, RegisterResourceRequest,
    };
    use crate::source::testutil;
    use std::time::Duration;

    fn project() -> PackageName {
        PackageName::new("proj").expect("legal package")
    }

    fn register_request(name: &str) -> RegisterResourceRequest {
        RegisterResourceRequest {
            ty: String::from("aws:s3:Bucket"),
            name: name.to_string(),
            custom: true,
            ..RegisterResourceRequest::default()
        }
    }

    async fn iterate(source: &ProgramSource) -> (CancelSource, Box<dyn SourceIterator>) {
        let scope = CancelSource::new();
        let iterator = source
            .iterate(&scope.context(), Arc::new(testutil::NoProviders))
            .await
            .expect("iterates");
        (scope, iterator)
    }

    #[tokio::test]
    async fn test_sequential_rpcs_keep_program_order() {
        let source = ProgramSource::new(project(), |monitor: Arc<ResourceMonitor>| async move {
            monitor.register_resource(register_request("first")).await?;
            monitor.register_resource(register_request("second")).await?;
            Ok(())
        });

        let (_scope, mut iterator) = iterate(&source).await;

        let mut names = Vec::new();
        while let Some(event) = iterator.next().await.expect("no stream error") {
            let SourceEvent::RegisterResource(register) = event else {
                panic!("expected registration events only");
            };
            names.push(register.goal().name.to_string());
            let state = testutil::state_for_goal(register.goal());
            register.done(RegisterResult {
                state: Some(state),
                result: ResultState::Success,
            });
        }

        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_register_outputs_completes_a_resource() {
        let source = ProgramSource::new(project(), |monitor: Arc<ResourceMonitor>| async move {
            let response = monitor.register_resource(register_request("web")).await?;

            let mut outputs = PropertyMap::new();
            outputs.insert("endpoint", PropertyValue::from("https://web.example.com"));
            monitor
                .register_resource_outputs(RegisterResourceOutputsRequest {
                    urn: response.urn,
                    outputs,
                })
                .await
        });

        let (_scope, mut iterator) = iterate(&source).await;

        let registered = match iterator.next().await.expect("no stream error") {
            Some(SourceEvent::RegisterResource(register)) => {
                let state = testutil::state_for_goal(register.goal());
                let urn = state.urn.clone();
                register.done(RegisterResult {
                    state: Some(state),
                    result: ResultState::Success,
                });
                urn
            }
            other => panic!("expected a registration event, found {other:?}"),
        };

        match iterator.next().await.expect("no stream error") {
            Some(SourceEvent::RegisterResourceOutputs(outputs)) => {
                assert_eq!(outputs.urn(), &registered);
                assert!(outputs.outputs().has_value("endpoint"));
                outputs.done();
            }
            other => panic!("expected an outputs event, found {other:?}"),
        }

        assert!(iterator.next().await.expect("no stream error").is_none());
    }

    #[tokio::test]
    async fn test_read_resource_event_round_trip() {
        let source = ProgramSource::new(project(), |monitor: Arc<ResourceMonitor>| async move {
            let response = monitor
                .read_resource(ReadResourceRequest {
                    id: String::from("i-1234"),
                    ty: String::from("aws:ec2:Instance"),
                    name: String::from("imported"),
                    ..ReadResourceRequest::default()
                })
                .await?;
            assert!(response.urn.contains("imported"));
            Ok(())
        });

        let (_scope, mut iterator) = iterate(&source).await;

        match iterator.next().await.expect("no stream error") {
            Some(SourceEvent::ReadResource(read)) => {
                assert_eq!(read.id().as_str(), "i-1234");
                assert_eq!(read.name().as_str(), "imported");

                let state = testutil::state_for_read(&read);
                read.done(ReadResult {
                    state: Some(state),
                    result: ResultState::Success,
                });
            }
            other => panic!("expected a read event, found {other:?}"),
        }

        assert!(iterator.next().await.expect("no stream error").is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_done_returns_end_of_stream() {
        let source = ProgramSource::new(project(), |monitor: Arc<ResourceMonitor>| async move {
            let mut abort = monitor.abort_channel();
            let result = monitor.register_resource(register_request("orphan")).await;

            // The registration was abandoned; the abort signal explains why.
            assert!(result.expect_err("registration abandoned").is_shutdown());
            abort.changed().await.map_err(|_| {
                crate::error::CirrusError::internal("abort channel closed unexpectedly")
            })?;
            assert!(*abort.borrow());
            Ok(())
        });

        let (scope, mut iterator) = iterate(&source).await;

        let event = iterator
            .next()
            .await
            .expect("no stream error")
            .expect("the registration event arrives");

        iterator.cancel(&scope.context()).await.expect("cancels");

        // Dropping the unprocessed event abandons its handshake, which
        // unblocks the program's RPC.
        drop(event);

        assert!(iterator.next().await.expect("no stream error").is_none());
        assert!(iterator.next().await.expect("no stream error").is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let source =
            ProgramSource::new(project(), |_monitor: Arc<ResourceMonitor>| async move {
                Ok(())
            });

        let (scope, mut iterator) = iterate(&source).await;
        iterator.cancel(&scope.context()).await.expect("cancels");
        iterator.cancel(&scope.context()).await.expect("cancels again");

        assert!(iterator.next().await.expect("no stream error").is_none());
    }

    #[tokio::test]
    async fn test_terminate_never_deadlocks_a_pending_rpc() {
        let source = ProgramSource::new(project(), |monitor: Arc<ResourceMonitor>| async move {
            let result = monitor.register_resource(register_request("doomed")).await;
            assert!(result.expect_err("registration abandoned").is_shutdown());
            Ok(())
        });

        let (scope, mut iterator) = iterate(&source).await;

        // The engine takes the event but never completes it.
        let _held = iterator
            .next()
            .await
            .expect("no stream error")
            .expect("the registration event arrives");

        scope.terminate();

        // Termination is non-cooperative: the pending RPC unblocks without
        // its done ever arriving, and the stream ends.
        let next = tokio::time::timeout(Duration::from_secs(1), iterator.next())
            .await
            .expect("next does not deadlock")
            .expect("no stream error");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_program_failure_surfaces_at_end_of_stream() {
        let source =
            ProgramSource::new(project(), |_monitor: Arc<ResourceMonitor>| async move {
                Err(crate::error::CirrusError::internal("program exploded"))
            });

        let (_scope, mut iterator) = iterate(&source).await;

        let result = iterator.next().await;
        assert!(matches!(
            result,
            Err(CirrusError::Source(SourceError::ProgramFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_iterate_on_terminated_scope_is_a_configuration_error() {
        let source =
            ProgramSource::new(project(), |_monitor: Arc<ResourceMonitor>| async move {
                Ok(())
            });

        let scope = CancelSource::new();
        scope.terminate();

        let result = source
            .iterate(&scope.context(), Arc::new(testutil::NoProviders))
            .await;
        assert!(matches!(
            result.err(),
            Some(CirrusError::Source(SourceError::Configuration { .. }))
        ));
    }

    #[tokio::test]
    async fn test_source_close_releases() {
        let source =
            ProgramSource::new(project(), |_monitor: Arc<ResourceMonitor>| async move {
                Ok(())
            });

        assert_eq!(source.project().as_str(), "proj");
        source.close().await.expect("close succeeds");
    }
}
