//! Registration intent.
//!
//! A [`Goal`] is the desired-state record a program emits for each resource
//! registration. Goals are ephemeral: the program creates one per
//! registration and it is released once the engine reports completion;
//! only [`ResourceState`](super::ResourceState) is durable.

use crate::property::{PropertyKey, PropertyMap};
use crate::resource::urn::{Id, Urn};
use crate::tokens::{Name, Type};

/// A declaration of desired resource state emitted by the program.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    /// The type of resource to create.
    pub ty: Type,
    /// The resource's name, unique among siblings of the same type.
    pub name: Name,
    /// True for custom (provider-managed) resources, false for components.
    pub custom: bool,
    /// The resource's input properties.
    pub properties: PropertyMap,
    /// URN of the parent resource, if any.
    pub parent: Option<Urn>,
    /// True if the resource should be protected from deletion.
    pub protect: bool,
    /// URNs this resource depends on.
    pub dependencies: Vec<Urn>,
    /// Reference to the provider to use for this resource.
    pub provider: String,
    /// Output property keys that must be treated as secrets in addition to
    /// whatever the provider marks.
    pub additional_secret_outputs: Vec<PropertyKey>,
    /// Previous URNs this resource was known by.
    pub aliases: Vec<Urn>,
    /// The ID of an existing resource to import, if this registration adopts
    /// one instead of creating it.
    pub import_id: Option<Id>,
    /// Property keys whose change forces a replacement instead of an update.
    pub replace_on_changes: Vec<PropertyKey>,
    /// Source position of the registration in the user program.
    pub source_position: String,
}

impl Goal {
    /// Creates a new goal with the given identity and no properties.
    #[must_use]
    pub fn new(ty: Type, name: Name, custom: bool) -> Self {
        Self {
            ty,
            name,
            custom,
            properties: PropertyMap::new(),
            parent: None,
            protect: false,
            dependencies: Vec::new(),
            provider: String::new(),
            additional_secret_outputs: Vec::new(),
            aliases: Vec::new(),
            import_id: None,
            replace_on_changes: Vec::new(),
            source_position: String::new(),
        }
    }

    /// Sets the input properties.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the parent URN.
    #[must_use]
    pub fn with_parent(mut self, parent: Option<Urn>) -> Self {
        self.parent = parent;
        self
    }

    /// Sets deletion protection.
    #[must_use]
    pub const fn with_protect(mut self, protect: bool) -> Self {
        self.protect = protect;
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

    /// Sets the additional secret output keys.
    #[must_use]
    pub fn with_additional_secret_outputs(mut self, keys: Vec<PropertyKey>) -> Self {
        self.additional_secret_outputs = keys;
        self
    }

    /// Sets the alias URNs.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<Urn>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Sets the import ID.
    #[must_use]
    pub fn with_import_id(mut self, import_id: Option<Id>) -> Self {
        self.import_id = import_id;
        self
    }

    /// Sets the replace-on-change property keys.
    #[must_use]
    pub fn with_replace_on_changes(mut self, keys: Vec<PropertyKey>) -> Self {
        self.replace_on_changes = keys;
        self
    }

    /// Sets the source position.
    #[must_use]
    pub fn with_source_position(mut self, source_position: impl Into<String>) -> Self {
        self.source_position = source_position.into();
        self
    }
}
