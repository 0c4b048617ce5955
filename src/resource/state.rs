//! Persisted resource state.
//!
//! A [`ResourceState`] is the durable record of a single resource: what the
//! engine knows after the last operation that touched it. States are born at
//! first successful registration, mutated only by the engine during
//! planning, and destroyed when the resource leaves the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::urn::{Id, Urn};
use crate::property::{PropertyKey, PropertyMap};
use crate::tokens::Type;

/// The recorded state of a resource after the engine has acted on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    /// The resource's URN.
    pub urn: Urn,
    /// The resource's type token.
    #[serde(rename = "type")]
    pub ty: Type,
    /// True for custom (provider-managed) resources, false for components.
    pub custom: bool,
    /// The provider-assigned ID; empty while unassigned.
    #[serde(default)]
    pub id: Id,
    /// The input properties the resource was registered with.
    #[serde(default)]
    pub inputs: PropertyMap,
    /// The output properties the provider produced.
    #[serde(default)]
    pub outputs: PropertyMap,
    /// URN of the parent resource, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Urn>,
    /// URNs this resource depends on.
    #[serde(default)]
    pub dependencies: Vec<Urn>,
    /// Reference to the provider that manages this resource.
    #[serde(default)]
    pub provider: String,
    /// True if the resource is pending deletion.
    #[serde(default)]
    pub delete: bool,
    /// True if the resource is protected from deletion.
    #[serde(default)]
    pub protect: bool,
    /// Output property keys that must be treated as secrets in addition to
    /// whatever the provider marks.
    #[serde(default)]
    pub additional_secret_outputs: Vec<PropertyKey>,
    /// Source position of the registration in the user program.
    #[serde(default)]
    pub source_position: String,
    /// When the resource was first created.
    pub created: DateTime<Utc>,
    /// When the resource state was last modified.
    pub modified: DateTime<Utc>,
}

impl ResourceState {
    /// Creates a new state record for a freshly registered resource.
    #[must_use]
    pub fn new(urn: Urn, ty: Type, custom: bool) -> Self {
        let now = Utc::now();
        Self {
            urn,
            ty,
            custom,
            id: Id::default(),
            inputs: PropertyMap::new(),
            outputs: PropertyMap::new(),
            parent: None,
            dependencies: Vec::new(),
            provider: String::new(),
            delete: false,
            protect: false,
            additional_secret_outputs: Vec::new(),
            source_position: String::new(),
            created: now,
            modified: now,
        }
    }

    /// Sets the input properties.
    #[must_use]
    pub fn with_inputs(mut self, inputs: PropertyMap) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the output properties.
    #[must_use]
    pub fn with_outputs(mut self, outputs: PropertyMap) -> Self {
        self.outputs = outputs;
        self
    }

    /// Sets the parent URN.
    #[must_use]
    pub fn with_parent(mut self, parent: Option<Urn>) -> Self {
        self.parent = parent;
        self
    }

    /// Sets the dependency list.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Urn>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the provider reference.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Sets the provider-assigned ID.
    #[must_use]
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = id;
        self
    }

    /// Records outputs produced by a provider, refreshing the modification
    /// time.
    pub fn set_outputs(&mut self, outputs: PropertyMap) {
        self.outputs = outputs;
        self.modified = Utc::now();
    }

    /// Records the provider-assigned ID, refreshing the modification time.
    pub fn set_id(&mut self, id: Id) {
        self.id = id;
        self.modified = Utc::now();
    }

    /// Marks the resource as pending deletion.
    pub fn mark_for_deletion(&mut self) {
        self.delete = true;
        self.modified = Utc::now();
    }

    /// Returns true if this is the root stack resource.
    #[must_use]
    pub fn is_root_stack(&self) -> bool {
        self.ty.is_root_stack()
    }

    /// Returns true if this is a provider resource.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        self.ty.is_provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;
    use crate::tokens::{PackageName, StackName};

    fn state() -> ResourceState {
        let ty = Type::parse("aws:s3:Bucket").expect("legal type");
        let stack = StackName::new("dev").expect("legal stack");
        let project = PackageName::new("proj").expect("legal package");
        let urn = Urn::new(&stack, &project, None, &ty, "assets");
        ResourceState::new(urn, ty, true)
    }

    #[test]
    fn test_new_state_is_unassigned() {
        let s = state();
        assert!(s.id.is_unassigned());
        assert!(s.inputs.is_empty());
        assert!(!s.delete);
    }

    #[test]
    fn test_set_outputs_refreshes_modified() {
        let mut s = state();
        let before = s.modified;

        let mut outputs = PropertyMap::new();
        outputs.insert("arn", PropertyValue::from("arn:aws:s3:::assets"));
        s.set_outputs(outputs);

        assert!(s.modified >= before);
        assert!(s.outputs.has_value("arn"));
    }

    #[test]
    fn test_serde_round_trip() {
        let s = state()
            .with_provider("urn:pulumi:dev::proj::pulumi:providers:aws::default::uuid")
            .with_id(Id::new("bucket-1234"));

        let encoded = serde_json::to_string(&s).expect("encodes");
        let decoded: ResourceState = serde_json::from_str(&encoded).expect("decodes");
        assert_eq!(decoded, s);
    }
}
