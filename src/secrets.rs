//! The secrets manager contract.
//!
//! Secret managers are opaque to the engine core: each presents an
//! encrypter/decrypter pair plus a self-describing `(type, state)` pair
//! that is persisted alongside the snapshot, so the correct manager can be
//! reconstructed on reload. Two managers are compatible when they agree on
//! both type and state, byte for byte.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

/// The value a failed decryption resolves to when the caller elects to
/// continue instead of aborting.
pub const DECRYPT_PLACEHOLDER: &str = "[secret]";

/// Encrypts plaintext values for serialization into a deployment.
#[async_trait]
pub trait Encrypter: Send + Sync {
    /// Encrypts a single plaintext value.
    async fn encrypt_value(&self, plaintext: &str) -> Result<String>;
}

/// Decrypts ciphertext values when deserializing a deployment.
#[async_trait]
pub trait Decrypter: Send + Sync {
    /// Decrypts a single ciphertext value.
    async fn decrypt_value(&self, ciphertext: &str) -> Result<String>;
}

/// A stack's secrets manager: an encrypter/decrypter pair with a durable
/// self-description.
pub trait SecretsManager: Send + Sync {
    /// Returns the manager's type, used to reconstruct it on reload.
    fn manager_type(&self) -> &str;

    /// Returns the manager's opaque state blob, persisted with the snapshot.
    fn state(&self) -> serde_json::Value;

    /// Returns the encrypter for serializing secret values.
    fn encrypter(&self) -> &dyn Encrypter;

    /// Returns the decrypter for deserializing secret values.
    fn decrypter(&self) -> &dyn Decrypter;
}

/// The durably persisted `(type, state)` pair describing a secrets manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretsManagerState {
    /// The manager's type.
    #[serde(rename = "type")]
    pub manager_type: String,
    /// The manager's opaque state blob.
    pub state: serde_json::Value,
}

impl SecretsManagerState {
    /// Captures the durable description of a manager.
    #[must_use]
    pub fn of(manager: &dyn SecretsManager) -> Self {
        Self {
            manager_type: manager.manager_type().to_string(),
            state: manager.state(),
        }
    }
}

/// Returns true if the two managers are of the same type and have the same
/// state, byte for byte.
#[must_use]
pub fn managers_compatible(a: &dyn SecretsManager, b: &dyn SecretsManager) -> bool {
    a.manager_type() == b.manager_type() && a.state().to_string() == b.state().to_string()
}

/// Reconstructs secrets managers from their persisted `(type, state)` pairs.
pub trait SecretsProvider: Send + Sync {
    /// Reconstructs the manager described by the given type and state.
    ///
    /// # Errors
    ///
    /// Returns an error if no manager of the given type can be built.
    fn of_type(
        &self,
        manager_type: &str,
        state: &serde_json::Value,
    ) -> Result<Arc<dyn SecretsManager>>;
}

/// A callback deciding how to treat a decryption failure: `Ok` continues
/// with a placeholder value, `Err` aborts the operation.
pub type DecryptErrorHandler = Arc<dyn Fn(crate::error::CirrusError) -> Result<()> + Send + Sync>;

/// A secrets provider whose managers route decryption failures through a
/// caller-supplied handler.
///
/// If the handler accepts a failure, the offending value decrypts to
/// [`DECRYPT_PLACEHOLDER`] and the operation continues; otherwise the
/// handler's error becomes the outcome.
pub struct ErrorCatchingSecretsProvider {
    inner: Arc<dyn SecretsProvider>,
    on_decrypt_error: DecryptErrorHandler,
}

impl ErrorCatchingSecretsProvider {
    /// Wraps a provider with the given decryption failure handler.
    #[must_use]
    pub fn new(inner: Arc<dyn SecretsProvider>, on_decrypt_error: DecryptErrorHandler) -> Self {
        Self {
            inner,
            on_decrypt_error,
        }
    }
}

impl SecretsProvider for ErrorCatchingSecretsProvider {
    fn of_type(
        &self,
        manager_type: &str,
        state: &serde_json::Value,
    ) -> Result<Arc<dyn SecretsManager>> {
        let manager = self.inner.of_type(manager_type, state)?;
        Ok(Arc::new(ErrorCatchingManager {
            decrypter: ErrorCatchingDecrypter {
                inner: Arc::clone(&manager),
                on_decrypt_error: Arc::clone(&self.on_decrypt_error),
            },
            inner: manager,
        }))
    }
}

struct ErrorCatchingManager {
    inner: Arc<dyn SecretsManager>,
    decrypter: ErrorCatchingDecrypter,
}

impl SecretsManager for ErrorCatchingManager {
    fn manager_type(&self) -> &str {
        self.inner.manager_type()
    }

    fn state(&self) -> serde_json::Value {
        self.inner.state()
    }

    fn encrypter(&self) -> &dyn Encrypter {
        self.inner.encrypter()
    }

    fn decrypter(&self) -> &dyn Decrypter {
        &self.decrypter
    }
}

struct ErrorCatchingDecrypter {
    inner: Arc<dyn SecretsManager>,
    on_decrypt_error: DecryptErrorHandler,
}

#[async_trait]
impl Decrypter for ErrorCatchingDecrypter {
    async fn decrypt_value(&self, ciphertext: &str) -> Result<String> {
        match self.inner.decrypter().decrypt_value(ciphertext).await {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => {
                warn!("Decryption failed, deferring to caller: {err}");
                (self.on_decrypt_error)(err)?;
                Ok(String::from(DECRYPT_PLACEHOLDER))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{PrefixSecretsManager, PrefixSecretsProvider};
    use super::*;
    use crate::error::{CirrusError, SecretsError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_encrypt_decrypt_round_trip() {
        let manager = PrefixSecretsManager::new();

        let ciphertext = manager
            .encrypter()
            .encrypt_value("hunter2")
            .await
            .expect("encrypts");
        let plaintext = manager
            .decrypter()
            .decrypt_value(&ciphertext)
            .await
            .expect("decrypts");

        assert_eq!(plaintext, "hunter2");
    }

    #[test]
    fn test_manager_compatibility() {
        let a = PrefixSecretsManager::new();
        let b = PrefixSecretsManager::new();

        assert!(managers_compatible(&a, &b));

        let described = SecretsManagerState::of(&a);
        assert_eq!(described.manager_type, "prefix");
    }

    #[tokio::test]
    async fn test_error_catching_continues_with_placeholder() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let provider = ErrorCatchingSecretsProvider::new(
            Arc::new(PrefixSecretsProvider),
            Arc::new(move |_err| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let manager = provider
            .of_type("prefix", &serde_json::json!({}))
            .expect("reconstructs");
        let out = manager
            .decrypter()
            .decrypt_value("not-a-ciphertext")
            .await
            .expect("placeholder instead of failure");

        assert_eq!(out, DECRYPT_PLACEHOLDER);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_catching_aborts_when_handler_rejects() {
        let provider = ErrorCatchingSecretsProvider::new(
            Arc::new(PrefixSecretsProvider),
            Arc::new(|err| Err(err)),
        );

        let manager = provider
            .of_type("prefix", &serde_json::json!({}))
            .expect("reconstructs");
        let result = manager.decrypter().decrypt_value("not-a-ciphertext").await;

        assert!(matches!(
            result,
            Err(CirrusError::Secrets(SecretsError::DecryptionFailed { .. }))
        ));
    }
}
