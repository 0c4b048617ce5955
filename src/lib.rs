// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Cirrus Deploy Engine
//!
//! The deployment plan enumerator and property value layer of the Cirrus
//! infrastructure engine.
//!
//! ## Overview
//!
//! User programs describe desired cloud resources; the engine reconciles
//! that intent against a persisted snapshot by driving provider plugins.
//! This crate is the core of that pipeline:
//!
//! - The **property value layer**: the single tagged value model carrying
//!   all data between program, engine, and providers, including unknowns,
//!   secrets, outputs with dependency sets, asset and archive handles, and
//!   cross-resource references.
//! - The **source protocol**: a lazy, cancellable stream of resource intent
//!   events emitted by a running program and mediated by a resource
//!   monitor.
//!
//! ## Architecture
//!
//! Two logical threads run per deployment. The **program** issues RPCs
//! against the monitor; the **engine** drains events from the source
//! iterator. The monitor serializes the boundary with a bounded
//! single-event handoff and a one-shot completion handshake per event:
//!
//! 1. The program calls `RegisterResource` and suspends.
//! 2. The monitor turns the call into an event the iterator yields.
//! 3. The engine processes the event and calls `done` with the resulting
//!    state, unblocking the program.
//!
//! ## Modules
//!
//! - [`property`]: the value model and its wire encoding
//! - [`tokens`]: names, type tokens, package and stack names
//! - [`resource`]: URNs, IDs, goals, and persisted resource state
//! - [`snapshot`]: the ordered durable record of a stack's resources
//! - [`secrets`]: the secrets-manager contract
//! - [`cancel`]: scoped two-level cancellation
//! - [`source`]: the event stream and the resource monitor
//! - [`backend`]: read-only access to other stacks' outputs
//! - [`error`]: the error hierarchy
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cirrus_deploy_engine::cancel::CancelSource;
//! use cirrus_deploy_engine::source::{
//!     Provider, ProviderSource, ProgramSource, RegisterResourceRequest, ResourceMonitor,
//!     Source, SourceEvent, SourceIterator,
//! };
//! use cirrus_deploy_engine::tokens::PackageName;
//!
//! struct NoProviders;
//!
//! impl ProviderSource for NoProviders {
//!     fn get_provider(&self, _reference: &str) -> Option<Arc<dyn Provider>> {
//!         None
//!     }
//! }
//!
//! # async fn run() -> cirrus_deploy_engine::error::Result<()> {
//! let source = ProgramSource::new(
//!     PackageName::new("website")?,
//!     |monitor: Arc<ResourceMonitor>| async move {
//!         monitor
//!             .register_resource(RegisterResourceRequest {
//!                 ty: String::from("aws:s3:Bucket"),
//!                 name: String::from("assets"),
//!                 custom: true,
//!                 ..RegisterResourceRequest::default()
//!             })
//!             .await?;
//!         Ok(())
//!     },
//! );
//!
//! let scope = CancelSource::new();
//! let mut iterator = source.iterate(&scope.context(), Arc::new(NoProviders)).await?;
//! while let Some(event) = iterator.next().await? {
//!     match event {
//!         SourceEvent::RegisterResource(_register) => { /* plan and done() */ }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod backend;
pub mod cancel;
pub mod error;
pub mod property;
pub mod resource;
pub mod secrets;
pub mod snapshot;
pub mod source;
pub mod tokens;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{BackendClient, SnapshotBackendClient, StackReference, StackSnapshots};
pub use cancel::{CancelContext, CancelScopeSource, CancelSource, CancellationScope, CancellationScopeSource};
pub use error::{CirrusError, Result};
pub use property::{HostValue, PropertyKey, PropertyMap, PropertyValue};
pub use resource::{Goal, Id, ResourceState, Urn};
pub use secrets::{Decrypter, Encrypter, SecretsManager, SecretsManagerState, SecretsProvider};
pub use snapshot::Snapshot;
pub use source::{
    Provider, ProviderSource, ProgramSource, ResourceMonitor, ResultState, Source, SourceEvent,
    SourceIterator,
};
pub use tokens::{Name, PackageName, QName, StackName, Type};
