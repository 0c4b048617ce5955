//! The backend client adapter.
//!
//! A narrow, read-only dependency exposed to the program via invoke: it
//! lets a program reference another stack's outputs without seeing the
//! backend itself. Stack references are stringly typed and parsed here;
//! snapshots come from a collaborator interface and are interpreted
//! opaquely.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::property::{PropertyMap, PropertyValue};
use crate::secrets::{DecryptErrorHandler, ErrorCatchingSecretsProvider, SecretsProvider};
use crate::snapshot::Snapshot;
use crate::tokens::StackName;

/// A reference to a stack managed by a backend: `[organization/]name`.
///
/// Different backends may interpret reference strings differently; this is
/// the default rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackReference {
    /// The owning organization, if the reference names one.
    pub organization: Option<String>,
    /// The stack's name.
    pub name: StackName,
}

impl StackReference {
    /// Parses a stack reference string.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference has more than two segments or an
    /// illegal stack name.
    pub fn parse(s: &str) -> Result<Self> {
        let (organization, name) = match s.split('/').collect::<Vec<_>>().as_slice() {
            [name] => (None, *name),
            [organization, name] => (Some((*organization).to_string()), *name),
            _ => {
                return Err(BackendError::InvalidStackReference {
                    reference: s.to_string(),
                    reason: String::from("expected at most one '/' separator"),
                }
                .into());
            }
        };

        let name = StackName::new(name).map_err(|e| BackendError::InvalidStackReference {
            reference: s.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { organization, name })
    }
}

impl fmt::Display for StackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.organization {
            Some(organization) => write!(f, "{organization}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The narrow collaborator interface the client reads snapshots through.
#[async_trait]
pub trait StackSnapshots: Send + Sync {
    /// Produces the named stack's snapshot, reconstructing its secrets
    /// manager through `secrets`. Returns `None` if the stack is unknown.
    async fn snapshot(
        &self,
        stack: &StackReference,
        secrets: &dyn SecretsProvider,
    ) -> Result<Option<Snapshot>>;
}

/// Read-only access to the outputs of other stacks, for use by programs.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Returns the root-stack outputs of the named stack, honoring secret
    /// markers. Decryption failures route through `on_decrypt_error`, which
    /// decides whether to abort or continue with placeholders.
    async fn get_stack_outputs(
        &self,
        name: &str,
        on_decrypt_error: DecryptErrorHandler,
    ) -> Result<PropertyMap>;

    /// Returns a map keyed by URN, each value an object with `type` and
    /// `outputs`, for every live resource of the named stack. Deleted
    /// resources are omitted.
    async fn get_stack_resource_outputs(&self, name: &str) -> Result<PropertyMap>;
}

/// The standard backend client: snapshots plus a secrets provider.
pub struct SnapshotBackendClient {
    snapshots: Arc<dyn StackSnapshots>,
    secrets: Arc<dyn SecretsProvider>,
}

impl SnapshotBackendClient {
    /// Creates a client over the given snapshot store and secrets provider.
    #[must_use]
    pub fn new(snapshots: Arc<dyn StackSnapshots>, secrets: Arc<dyn SecretsProvider>) -> Self {
        Self { snapshots, secrets }
    }

    async fn load_snapshot(
        &self,
        name: &str,
        secrets: &dyn SecretsProvider,
    ) -> Result<Snapshot> {
        let reference = StackReference::parse(name)?;
        debug!("Loading snapshot for stack {reference}");
        self.snapshots
            .snapshot(&reference, secrets)
            .await?
            .ok_or_else(|| {
                BackendError::UnknownStack {
                    name: name.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl BackendClient for SnapshotBackendClient {
    async fn get_stack_outputs(
        &self,
        name: &str,
        on_decrypt_error: DecryptErrorHandler,
    ) -> Result<PropertyMap> {
        let secrets =
            ErrorCatchingSecretsProvider::new(Arc::clone(&self.secrets), on_decrypt_error);
        let snapshot = self.load_snapshot(name, &secrets).await?;

        Ok(snapshot
            .root_stack()
            .map_or_else(PropertyMap::new, |root| root.outputs.copy()))
    }

    async fn get_stack_resource_outputs(&self, name: &str) -> Result<PropertyMap> {
        let snapshot = self.load_snapshot(name, self.secrets.as_ref()).await?;

        let mut outputs = PropertyMap::new();
        for resource in snapshot.resources() {
            if resource.delete {
                continue;
            }
            let mut entry = PropertyMap::new();
            entry.insert("type", PropertyValue::from(resource.ty.to_string()));
            entry.insert("outputs", PropertyValue::Object(resource.outputs.copy()));
            outputs.insert(resource.urn.as_str(), PropertyValue::Object(entry));
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CirrusError;
    use crate::property::PropertyKey;
    use crate::resource::{ResourceState, Urn};
    use crate::secrets::testutil::PrefixSecretsProvider;
    use crate::secrets::{DECRYPT_PLACEHOLDER, SecretsManager, SecretsManagerState};
    use crate::tokens::{PackageName, ROOT_STACK_TYPE, Type};
    use std::collections::HashMap;

    /// An in-memory snapshot store whose persisted secrets are ciphertext;
    /// producing a snapshot decrypts them through the reconstructed
    /// manager.
    struct MemoryStackSnapshots {
        snapshots: HashMap<String, Snapshot>,
    }

    #[async_trait]
    impl StackSnapshots for MemoryStackSnapshots {
        async fn snapshot(
            &self,
            stack: &StackReference,
            secrets: &dyn SecretsProvider,
        ) -> Result<Option<Snapshot>> {
            let Some(snapshot) = self.snapshots.get(stack.name.as_str()) else {
                return Ok(None);
            };

            let Some(described) = snapshot.secrets_manager() else {
                return Ok(Some(snapshot.clone()));
            };
            let manager = secrets.of_type(&described.manager_type, &described.state)?;

            let mut resources = Vec::new();
            for resource in snapshot.resources() {
                let mut decrypted = resource.clone();
                let outputs = decrypt_outputs(&resource.outputs, manager.as_ref()).await?;
                decrypted.set_outputs(outputs);
                resources.push(decrypted);
            }
            Ok(Some(Snapshot::new(
                Some(described.clone()),
                resources,
            )))
        }
    }

    async fn decrypt_outputs(
        outputs: &PropertyMap,
        manager: &dyn SecretsManager,
    ) -> Result<PropertyMap> {
        let mut result = PropertyMap::new();
        for (key, value) in outputs {
            let value = if value.is_secret() {
                let ciphertext = value.secret_value().element.string_value().to_string();
                let plaintext = manager.decrypter().decrypt_value(&ciphertext).await?;
                PropertyValue::make_secret(PropertyValue::from(plaintext))
            } else {
                value.clone()
            };
            result.insert(PropertyKey::new(key.as_str()), value);
        }
        Ok(result)
    }

    fn stack_state(outputs: PropertyMap) -> ResourceState {
        let ty = Type::parse(ROOT_STACK_TYPE).expect("legal type");
        let stack = crate::tokens::StackName::new("prod").expect("legal stack");
        let project = PackageName::new("billing").expect("legal package");
        let urn = Urn::new(&stack, &project, None, &ty, "billing-prod");
        ResourceState::new(urn, ty, false).with_outputs(outputs)
    }

    fn bucket_state(name: &str, delete: bool) -> ResourceState {
        let ty = Type::parse("aws:s3:Bucket").expect("legal type");
        let stack = crate::tokens::StackName::new("prod").expect("legal stack");
        let project = PackageName::new("billing").expect("legal package");
        let urn = Urn::new(&stack, &project, None, &ty, name);
        let mut state = ResourceState::new(urn, ty, true);
        state.delete = delete;

        let mut outputs = PropertyMap::new();
        outputs.insert("bucket", PropertyValue::from(name));
        state.with_outputs(outputs)
    }

    fn client_with(snapshot: Snapshot) -> SnapshotBackendClient {
        let mut snapshots = HashMap::new();
        snapshots.insert(String::from("prod"), snapshot);
        SnapshotBackendClient::new(
            Arc::new(MemoryStackSnapshots { snapshots }),
            Arc::new(PrefixSecretsProvider),
        )
    }

    fn manager_description() -> SecretsManagerState {
        SecretsManagerState {
            manager_type: String::from("prefix"),
            state: serde_json::json!({ "prefix": "enc:" }),
        }
    }

    fn abort_on_decrypt_error() -> DecryptErrorHandler {
        Arc::new(Err)
    }

    #[test]
    fn test_stack_reference_parsing() {
        let plain = StackReference::parse("prod").expect("parses");
        assert_eq!(plain.organization, None);
        assert_eq!(plain.name.as_str(), "prod");

        let owned = StackReference::parse("acme/prod").expect("parses");
        assert_eq!(owned.organization.as_deref(), Some("acme"));
        assert_eq!(owned.to_string(), "acme/prod");

        assert!(StackReference::parse("a/b/c").is_err());
        assert!(StackReference::parse("acme/bad stack").is_err());
    }

    #[tokio::test]
    async fn test_get_stack_outputs_honors_secret_markers() {
        let mut outputs = PropertyMap::new();
        outputs.insert("url", PropertyValue::from("https://billing.example.com"));
        outputs.insert(
            "apiKey",
            PropertyValue::make_secret(PropertyValue::from("enc:k-123")),
        );

        let snapshot = Snapshot::new(Some(manager_description()), vec![stack_state(outputs)]);
        let client = client_with(snapshot);

        let result = client
            .get_stack_outputs("prod", abort_on_decrypt_error())
            .await
            .expect("outputs load");

        assert_eq!(
            result.get("url"),
            Some(&PropertyValue::from("https://billing.example.com"))
        );
        let api_key = result.get("apiKey").expect("present");
        assert!(api_key.is_secret());
        assert_eq!(api_key.secret_value().element.string_value(), "k-123");
    }

    #[tokio::test]
    async fn test_unknown_stack_is_a_structured_error() {
        let client = client_with(Snapshot::new(None, vec![]));

        let result = client
            .get_stack_outputs("staging", abort_on_decrypt_error())
            .await;

        assert!(matches!(
            result,
            Err(CirrusError::Backend(BackendError::UnknownStack { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resource_outputs_omit_deleted_resources() {
        let snapshot = Snapshot::new(
            None,
            vec![
                stack_state(PropertyMap::new()),
                bucket_state("kept", false),
                bucket_state("gone", true),
            ],
        );
        let client = client_with(snapshot);

        let result = client
            .get_stack_resource_outputs("prod")
            .await
            .expect("outputs load");

        assert_eq!(result.len(), 2);
        let kept = result
            .iter()
            .find(|(k, _)| k.as_str().contains("::kept"))
            .expect("kept resource is present");
        let entry = kept.1.object_value();
        assert_eq!(entry.get("type"), Some(&PropertyValue::from("aws:s3:Bucket")));
        assert!(entry.get("outputs").expect("present").is_object());

        assert!(!result.iter().any(|(k, _)| k.as_str().contains("::gone")));
    }

    #[tokio::test]
    async fn test_decrypt_failure_continues_with_placeholder() {
        let mut outputs = PropertyMap::new();
        outputs.insert(
            "apiKey",
            PropertyValue::make_secret(PropertyValue::from("garbage-ciphertext")),
        );

        let snapshot = Snapshot::new(Some(manager_description()), vec![stack_state(outputs)]);
        let client = client_with(snapshot);

        let result = client
            .get_stack_outputs("prod", Arc::new(|_err| Ok(())))
            .await
            .expect("placeholders instead of failure");

        let api_key = result.get("apiKey").expect("present");
        assert_eq!(
            api_key.secret_value().element.string_value(),
            DECRYPT_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn test_decrypt_failure_aborts_when_handler_rejects() {
        let mut outputs = PropertyMap::new();
        outputs.insert(
            "apiKey",
            PropertyValue::make_secret(PropertyValue::from("garbage-ciphertext")),
        );

        let snapshot = Snapshot::new(Some(manager_description()), vec![stack_state(outputs)]);
        let client = client_with(snapshot);

        let result = client
            .get_stack_outputs("prod", abort_on_decrypt_error())
            .await;

        assert!(matches!(result, Err(CirrusError::Secrets(_))));
    }
}
