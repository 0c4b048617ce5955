//! Source events and their completion handshakes.
//!
//! Each event carries a one-shot `done` handshake. The engine must call
//! `done` exactly once per event: completing an event unblocks the
//! program's originating RPC, and completing it twice is an invariant
//! violation that aborts the process.

use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::property::{PropertyKey, PropertyMap};
use crate::resource::{Goal, Id, ResourceState, Urn};
use crate::tokens::{Name, Type};

/// The outcome of a register or read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    /// The operation completed.
    Success,
    /// The operation failed; dependents will observe the failure.
    Failed,
    /// The operation was skipped; dependents are unblocked without it.
    Skipped,
}

/// The state of a resource after its registration was processed.
#[derive(Debug)]
pub struct RegisterResult {
    /// The resulting resource state, if one was produced.
    pub state: Option<ResourceState>,
    /// The outcome of the registration.
    pub result: ResultState,
}

/// The state of a resource after a read was processed.
#[derive(Debug)]
pub struct ReadResult {
    /// The resulting resource state, if one was produced.
    pub state: Option<ResourceState>,
    /// The outcome of the read.
    pub result: ResultState,
}

/// An event associated with the enumeration of a plan: an intent expressed
/// by the source program, which the engine is responsible for making so.
#[derive(Debug)]
pub enum SourceEvent {
    /// The program asked the engine to provision a resource.
    RegisterResource(RegisterResourceEvent),
    /// The program asked the engine to read an existing resource.
    ReadResource(ReadResourceEvent),
    /// The program attached output properties to a registered resource.
    RegisterResourceOutputs(RegisterResourceOutputsEvent),
}

impl SourceEvent {
    /// Completes the event as skipped without a state, unblocking its
    /// originating RPC. Used when cancellation drains events the engine
    /// never processed.
    pub(crate) fn complete_canceled(&self) {
        match self {
            Self::RegisterResource(e) => e.done(RegisterResult {
                state: None,
                result: ResultState::Skipped,
            }),
            Self::ReadResource(e) => e.done(ReadResult {
                state: None,
                result: ResultState::Skipped,
            }),
            Self::RegisterResourceOutputs(e) => e.done(),
        }
    }
}

/// A step that asks the engine to provision a resource.
#[derive(Debug)]
pub struct RegisterResourceEvent {
    goal: Goal,
    done: Mutex<Option<oneshot::Sender<RegisterResult>>>,
}

impl RegisterResourceEvent {
    pub(crate) fn new(goal: Goal, done: oneshot::Sender<RegisterResult>) -> Self {
        Self {
            goal,
            done: Mutex::new(Some(done)),
        }
    }

    /// Returns the goal state the program declared for this resource.
    #[must_use]
    pub const fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Completes the step, unblocking the program with the result.
    ///
    /// # Panics
    ///
    /// Panics if called more than once; completing an event twice is an
    /// engine invariant violation.
    pub fn done(&self, result: RegisterResult) {
        let sender = self
            .done
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| panic!("done must be called exactly once per event"));
        // The receiver is gone only if the registration was abandoned by
        // termination; the result has nowhere to go then.
        let _ = sender.send(result);
    }
}

/// An event that asks the engine to read the state of an existing resource.
#[derive(Debug)]
pub struct ReadResourceEvent {
    id: Id,
    name: Name,
    ty: Type,
    provider: String,
    parent: Option<Urn>,
    properties: PropertyMap,
    dependencies: Vec<Urn>,
    additional_secret_outputs: Vec<PropertyKey>,
    source_position: String,
    done: Mutex<Option<oneshot::Sender<ReadResult>>>,
}

impl ReadResourceEvent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Id,
        name: Name,
        ty: Type,
        provider: String,
        parent: Option<Urn>,
        properties: PropertyMap,
        dependencies: Vec<Urn>,
        additional_secret_outputs: Vec<PropertyKey>,
        source_position: String,
        done: oneshot::Sender<ReadResult>,
    ) -> Self {
        Self {
            id,
            name,
            ty,
            provider,
            parent,
            properties,
            dependencies,
            additional_secret_outputs,
            source_position,
            done: Mutex::new(Some(done)),
        }
    }

    /// Returns the requested ID of this read.
    #[must_use]
    pub const fn id(&self) -> &Id {
        &self.id
    }

    /// Returns the requested name of this read.
    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the type of the resource being read.
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.ty
    }

    /// Returns the reference to the provider instance to use for this read.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the parent of the resource being read, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&Urn> {
        self.parent.as_ref()
    }

    /// Returns the property bag passed to the read as search parameters.
    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Returns the URNs this read depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[Urn] {
        &self.dependencies
    }

    /// Returns the output keys that should additionally be treated as
    /// secrets.
    #[must_use]
    pub fn additional_secret_outputs(&self) -> &[PropertyKey] {
        &self.additional_secret_outputs
    }

    /// Returns the source position of the read in the user program.
    #[must_use]
    pub fn source_position(&self) -> &str {
        &self.source_position
    }

    /// Completes the read, unblocking the program with the result.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn done(&self, result: ReadResult) {
        let sender = self
            .done
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| panic!("done must be called exactly once per event"));
        let _ = sender.send(result);
    }
}

/// An event that completes a previously registered resource by attaching
/// its computed outputs.
#[derive(Debug)]
pub struct RegisterResourceOutputsEvent {
    urn: Urn,
    outputs: PropertyMap,
    done: Mutex<Option<oneshot::Sender<()>>>,
}

impl RegisterResourceOutputsEvent {
    pub(crate) fn new(urn: Urn, outputs: PropertyMap, done: oneshot::Sender<()>) -> Self {
        Self {
            urn,
            outputs,
            done: Mutex::new(Some(done)),
        }
    }

    /// Returns the URN this completion applies to.
    #[must_use]
    pub const fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Returns the output properties to attach before completing.
    #[must_use]
    pub const fn outputs(&self) -> &PropertyMap {
        &self.outputs
    }

    /// Completes the step, unblocking the program.
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn done(&self) {
        let sender = self
            .done
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| panic!("done must be called exactly once per event"));
        let _ = sender.send(());
    }
}
