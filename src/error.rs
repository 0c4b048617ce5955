//! Error types for the Cirrus deployment engine.
//!
//! This module provides a comprehensive error hierarchy for all operations
//! in the plan-enumeration lifecycle: token and URN parsing, property
//! conversion, snapshot integrity, secrets management, source iteration,
//! and the backend client.

use thiserror::Error;

use crate::property::PropertyKey;
use crate::resource::Urn;

/// The main error type for the Cirrus deployment engine.
#[derive(Debug, Error)]
pub enum CirrusError {
    /// Token parsing and validation errors.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// URN parsing errors.
    #[error("URN error: {0}")]
    Urn(#[from] UrnError),

    /// Property value errors.
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    /// Snapshot integrity errors.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Secrets management errors.
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    /// Source and monitor errors.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Backend client errors.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token parsing and validation errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// A type token did not have the `package:module:member` shape.
    #[error("Invalid type token '{token}': {reason}")]
    InvalidType {
        /// The offending token.
        token: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A name contained characters outside the legal alphabet.
    #[error(
        "Invalid name '{name}': names may contain only alphanumerics, hyphens, underscores, and periods"
    )]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// A qualified name had an empty or illegal segment.
    #[error("Invalid qualified name '{qname}'")]
    InvalidQName {
        /// The offending qualified name.
        qname: String,
    },

    /// A stack name violated the backend's legality rules.
    #[error("Invalid stack name '{name}': {reason}")]
    InvalidStackName {
        /// The offending stack name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// URN parsing errors.
#[derive(Debug, Error)]
pub enum UrnError {
    /// The string did not begin with the URN prefix.
    #[error("Not a URN: '{urn}' does not begin with 'urn:pulumi:'")]
    MissingPrefix {
        /// The offending string.
        urn: String,
    },

    /// The URN did not have all four `::`-separated sections.
    #[error("Malformed URN '{urn}': expected 4 sections, found {found}")]
    TooFewSections {
        /// The offending string.
        urn: String,
        /// Number of sections found.
        found: usize,
    },

    /// A URN section was empty or otherwise illegal.
    #[error("Malformed URN '{urn}': {reason}")]
    Malformed {
        /// The offending string.
        urn: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Property value errors.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// A required property was absent from a map.
    #[error("required property '{key}' is missing")]
    RequiredPropertyMissing {
        /// The missing key.
        key: PropertyKey,
    },

    /// A wire object carried an unrecognized signature value.
    #[error("Unrecognized signature '{signature}' in wire object")]
    UnrecognizedSignature {
        /// The unknown signature string.
        signature: String,
    },

    /// A wire value could not be decoded.
    #[error("Invalid wire value: {message}")]
    InvalidWireValue {
        /// Description of the decode failure.
        message: String,
    },
}

/// Snapshot integrity errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The first resource in the snapshot was not the root stack.
    #[error("First snapshot resource must be the root stack, found '{urn}'")]
    FirstResourceNotStack {
        /// URN of the first resource.
        urn: Urn,
    },

    /// Non-stack resources were present but no default provider followed the stack.
    #[error("Second snapshot resource must be the default provider, found '{urn}'")]
    SecondResourceNotProvider {
        /// URN of the second resource.
        urn: Urn,
    },

    /// The same URN appeared more than once.
    #[error("Duplicate resource URN '{urn}' in snapshot")]
    DuplicateResource {
        /// The duplicated URN.
        urn: Urn,
    },

    /// A resource referred to a dependency that appears after it (or not at all).
    #[error("Resource '{urn}' refers to '{dependency}', which does not precede it")]
    ForwardReference {
        /// URN of the referring resource.
        urn: Urn,
        /// URN of the dependency that was out of order.
        dependency: Urn,
    },

    /// A URN lookup missed.
    #[error("Resource '{urn}' not found in snapshot")]
    ResourceNotFound {
        /// The URN that was looked up.
        urn: Urn,
    },
}

/// Secrets management errors.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// A ciphertext could not be decrypted.
    #[error("Decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// A plaintext could not be encrypted.
    #[error("Encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// No manager of the requested type could be reconstructed.
    #[error("Unknown secrets manager type '{manager_type}'")]
    UnknownManagerType {
        /// The requested manager type.
        manager_type: String,
    },
}

/// Source and monitor errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be iterated due to bad configuration.
    #[error("Source configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An RPC arrived after the monitor shut down, or the registration was
    /// abandoned by termination.
    #[error("Resource monitor shut down while request was in flight")]
    MonitorShutDown,

    /// An invoke or call named a provider the source cannot resolve.
    #[error("Provider '{reference}' not found")]
    ProviderNotFound {
        /// The unresolved provider reference.
        reference: String,
    },

    /// The user program exited with an error.
    #[error("Program failed: {message}")]
    ProgramFailed {
        /// Description of the program failure.
        message: String,
    },
}

/// Backend client errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A stack reference string could not be parsed.
    #[error("Invalid stack reference '{reference}': {reason}")]
    InvalidStackReference {
        /// The offending reference string.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The named stack does not exist in the backend.
    #[error("Unknown stack '{name}'")]
    UnknownStack {
        /// The requested stack name.
        name: String,
    },

    /// The stack exists but its snapshot could not be produced.
    #[error("Failed to load snapshot for stack '{name}': {message}")]
    SnapshotLoadFailed {
        /// The requested stack name.
        name: String,
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for Cirrus operations.
pub type Result<T> = std::result::Result<T, CirrusError>;

impl CirrusError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the missing key if this is a required-property error.
    ///
    /// Callers that need to distinguish "the property was absent" from other
    /// failures inspect the error through this accessor rather than matching
    /// the full hierarchy.
    #[must_use]
    pub const fn required_property_key(&self) -> Option<&PropertyKey> {
        match self {
            Self::Property(PropertyError::RequiredPropertyMissing { key }) => Some(key),
            _ => None,
        }
    }

    /// Returns true if this error reflects monitor shutdown or an abandoned
    /// registration rather than a failure of the operation itself.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Source(SourceError::MonitorShutDown))
    }
}

impl PropertyError {
    /// Creates a required-property-missing error for the given key.
    #[must_use]
    pub const fn required(key: PropertyKey) -> Self {
        Self::RequiredPropertyMissing { key }
    }
}

impl SourceError {
    /// Creates a configuration error with the given message.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SecretsError {
    /// Creates a decryption error with the given message.
    #[must_use]
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }
}
