//! The durable record of a stack's resources.
//!
//! A snapshot is an ordered list of resource states plus the description of
//! the secrets manager that protected it. Ordering is structural: the root
//! stack resource comes first, the default provider second whenever
//! non-stack resources exist, and every resource appears after its parent
//! and dependencies. Cross-resource references are persisted as URNs and
//! resolved by lookup, so the in-memory form is a table with an index, not
//! a pointer graph.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SnapshotError;
use crate::resource::{ResourceState, Urn};
use crate::secrets::SecretsManagerState;

/// Serialized form of a snapshot: the logical schema without the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotData {
    /// The secrets manager that protected this snapshot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secrets_manager: Option<SecretsManagerState>,
    /// The resources, in structural order.
    #[serde(default)]
    resources: Vec<ResourceState>,
}

/// The durable record of all resources in a stack after the last
/// successful operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SnapshotData", into = "SnapshotData")]
pub struct Snapshot {
    secrets_manager: Option<SecretsManagerState>,
    resources: Vec<ResourceState>,
    index: HashMap<Urn, usize>,
}

impl Snapshot {
    /// Creates a snapshot from an ordered resource list.
    #[must_use]
    pub fn new(
        secrets_manager: Option<SecretsManagerState>,
        resources: Vec<ResourceState>,
    ) -> Self {
        let index = build_index(&resources);
        Self {
            secrets_manager,
            resources,
            index,
        }
    }

    /// Returns the secrets manager description persisted with the snapshot.
    #[must_use]
    pub const fn secrets_manager(&self) -> Option<&SecretsManagerState> {
        self.secrets_manager.as_ref()
    }

    /// Returns the resources in structural order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceState] {
        &self.resources
    }

    /// Returns the number of resources in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the snapshot holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Looks up a resource by URN.
    #[must_use]
    pub fn resource(&self, urn: &Urn) -> Option<&ResourceState> {
        self.index.get(urn).map(|&i| &self.resources[i])
    }

    /// Looks up a resource by URN, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::ResourceNotFound`] if no resource has the
    /// given URN.
    pub fn require_resource(&self, urn: &Urn) -> Result<&ResourceState, SnapshotError> {
        self.resource(urn)
            .ok_or_else(|| SnapshotError::ResourceNotFound { urn: urn.clone() })
    }

    /// Returns the root stack resource, if the snapshot has one.
    #[must_use]
    pub fn root_stack(&self) -> Option<&ResourceState> {
        self.resources.first().filter(|r| r.is_root_stack())
    }

    /// Appends a resource to the end of the snapshot.
    pub fn append(&mut self, state: ResourceState) {
        self.index.insert(state.urn.clone(), self.resources.len());
        self.resources.push(state);
    }

    /// Removes a resource by URN, preserving the order of the rest.
    pub fn remove(&mut self, urn: &Urn) -> Option<ResourceState> {
        let position = self.index.remove(urn)?;
        let removed = self.resources.remove(position);
        self.index = build_index(&self.resources);
        Some(removed)
    }

    /// Verifies the snapshot's structural invariants.
    ///
    /// The first resource must be the root stack; if non-stack resources
    /// exist, the second must be the default provider; URNs must be unique;
    /// and every resource's parent and dependencies must precede it.
    ///
    /// # Errors
    ///
    /// Returns the first integrity violation found.
    pub fn verify_integrity(&self) -> Result<(), SnapshotError> {
        if self.resources.is_empty() {
            return Ok(());
        }

        let first = &self.resources[0];
        if !first.is_root_stack() {
            return Err(SnapshotError::FirstResourceNotStack {
                urn: first.urn.clone(),
            });
        }

        let has_user_resources = self
            .resources
            .iter()
            .skip(1)
            .any(|r| !r.is_provider() && !r.is_root_stack());
        if has_user_resources {
            match self.resources.get(1) {
                Some(second) if second.is_provider() => {}
                Some(second) => {
                    return Err(SnapshotError::SecondResourceNotProvider {
                        urn: second.urn.clone(),
                    });
                }
                None => {}
            }
        }

        let mut seen: HashMap<&Urn, usize> = HashMap::new();
        for (i, resource) in self.resources.iter().enumerate() {
            if seen.insert(&resource.urn, i).is_some() {
                return Err(SnapshotError::DuplicateResource {
                    urn: resource.urn.clone(),
                });
            }

            if let Some(parent) = &resource.parent
                && !seen.contains_key(parent)
            {
                return Err(SnapshotError::ForwardReference {
                    urn: resource.urn.clone(),
                    dependency: parent.clone(),
                });
            }

            for dependency in &resource.dependencies {
                if !seen.contains_key(dependency) {
                    return Err(SnapshotError::ForwardReference {
                        urn: resource.urn.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl From<SnapshotData> for Snapshot {
    fn from(data: SnapshotData) -> Self {
        Self::new(data.secrets_manager, data.resources)
    }
}

impl From<Snapshot> for SnapshotData {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            secrets_manager: snapshot.secrets_manager,
            resources: snapshot.resources,
        }
    }
}

fn build_index(resources: &[ResourceState]) -> HashMap<Urn, usize> {
    resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.urn.clone(), i))
        .collect()
}
