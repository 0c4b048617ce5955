//! The property value model.
//!
//! [`PropertyValue`] is the single value type carried between program,
//! engine, and providers. It is a closed tagged union: scalars, containers,
//! asset handles, and four engine-specific shapes (computed placeholders,
//! outputs, secrets, and cross-resource references). Values are immutable
//! after construction; enclosing maps change by copy-on-modify.

use std::fmt;
use std::sync::Arc;

use super::asset::{Archive, Asset};
use super::map::PropertyMap;
use crate::resource::Urn;

/// A property value that will eventually be computed by a provider. If an
/// output is encountered while unknown, the resource has not yet been
/// created and only the element's type shape is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// The value of this output if it is resolved, or a type exemplar if not.
    pub element: PropertyValue,
    /// True if this output's value is known.
    pub known: bool,
    /// True if this output's value is secret.
    pub secret: bool,
    /// The resources this output depends on.
    pub dependencies: Vec<Urn>,
}

impl Output {
    /// Creates an unresolved output whose element describes the eventual
    /// value's shape.
    #[must_use]
    pub const fn new(element: PropertyValue) -> Self {
        Self {
            element,
            known: false,
            secret: false,
            dependencies: Vec::new(),
        }
    }

    /// Marks the output as resolved.
    #[must_use]
    pub fn with_known(mut self, known: bool) -> Self {
        self.known = known;
        self
    }

    /// Marks the output as secret.
    #[must_use]
    pub fn with_secret(mut self, secret: bool) -> Self {
        self.secret = secret;
        self
    }

    /// Attaches the output's dependency set.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Urn>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// A value that should be persisted securely.
///
/// Secrets are held behind a shared reference so that downstream caches can
/// key on a secret's identity even when two secrets carry identical
/// plaintext. Copying an enclosing value or map clones the reference, never
/// the cell.
#[derive(Debug)]
pub struct Secret {
    /// The secret's plaintext value.
    pub element: PropertyValue,
}

/// A reference to another resource, captured as its URN, its ID, and the
/// version of its containing package.
///
/// The ID is null if the referent is a component resource; otherwise it is
/// a string, or a computed placeholder when not yet assigned.
#[derive(Debug, Clone)]
pub struct ResourceReference {
    /// URN of the referenced resource.
    pub urn: Urn,
    /// ID of the referenced resource: null, a string, or computed.
    pub id: PropertyValue,
    /// Version of the package that defines the referenced resource.
    pub package_version: String,
}

impl ResourceReference {
    /// Returns the reference's ID as a string.
    ///
    /// A computed ID yields `Some("")`, a concrete ID yields the string, and
    /// a null (component) ID yields `None`.
    #[must_use]
    pub fn id_string(&self) -> Option<&str> {
        if self.id.is_computed() {
            Some("")
        } else if let PropertyValue::String(s) = &self.id {
            Some(s)
        } else {
            None
        }
    }

    /// Returns true if two references point at the same resource.
    ///
    /// URNs must match; the IDs match if both are computed or if they are
    /// deeply equal.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        if self.urn != other.urn {
            return false;
        }
        if self.id.is_computed() && other.id.is_computed() {
            return true;
        }
        self.id == other.id
    }
}

impl PartialEq for ResourceReference {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

/// The value of a property, limited to a closed set of variants.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit floating point number; integers widen to float.
    Number(f64),
    /// UTF-8 text.
    String(String),
    /// An ordered sequence of values.
    Array(Vec<PropertyValue>),
    /// A map of unique string keys to values.
    Object(PropertyMap),
    /// A content-addressed blob handle.
    Asset(Asset),
    /// A directory-like collection of assets.
    Archive(Archive),
    /// A value unknown at plan time; the element carries only type shape.
    Computed(Box<PropertyValue>),
    /// An unresolved or resolved program output.
    Output(Box<Output>),
    /// A securely persisted value with shared identity.
    Secret(Arc<Secret>),
    /// A reference to another resource.
    ResourceReference(Box<ResourceReference>),
}

/// A pair of property key and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property's key.
    pub key: super::map::PropertyKey,
    /// The property's value.
    pub value: PropertyValue,
}

impl PropertyValue {
    /// Creates a computed placeholder whose element carries the expected
    /// type shape of the eventual value.
    #[must_use]
    pub fn make_computed(element: Self) -> Self {
        Self::Computed(Box::new(element))
    }

    /// Creates an unresolved output of the given element shape.
    #[must_use]
    pub fn make_output(element: Self) -> Self {
        Self::Output(Box::new(Output::new(element)))
    }

    /// Wraps a value as a secret, allocating a fresh shared cell.
    #[must_use]
    pub fn make_secret(element: Self) -> Self {
        Self::Secret(Arc::new(Secret { element }))
    }

    /// Creates a reference to a component resource; component references
    /// carry a null ID.
    #[must_use]
    pub fn make_component_resource_reference(urn: Urn, package_version: impl Into<String>) -> Self {
        Self::ResourceReference(Box::new(ResourceReference {
            urn,
            id: Self::Null,
            package_version: package_version.into(),
        }))
    }

    /// Creates a reference to a custom resource. An empty ID means the ID is
    /// not yet assigned and is promoted to a computed placeholder.
    #[must_use]
    pub fn make_custom_resource_reference(
        urn: Urn,
        id: impl Into<String>,
        package_version: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let id = if id.is_empty() {
            Self::make_computed(Self::String(String::new()))
        } else {
            Self::String(id)
        };
        Self::ResourceReference(Box::new(ResourceReference {
            urn,
            id,
            package_version: package_version.into(),
        }))
    }

    /// Returns true if the value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is a boolean.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns true if the value is a number.
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns true if the value is a string.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns true if the value is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns true if the value is an object.
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns true if the value is an asset.
    #[must_use]
    pub const fn is_asset(&self) -> bool {
        matches!(self, Self::Asset(_))
    }

    /// Returns true if the value is an archive.
    #[must_use]
    pub const fn is_archive(&self) -> bool {
        matches!(self, Self::Archive(_))
    }

    /// Returns true if the value is a computed placeholder.
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// Returns true if the value is an output.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Returns true if the value is a secret.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Returns true if the value is a resource reference.
    #[must_use]
    pub const fn is_resource_reference(&self) -> bool {
        matches!(self, Self::ResourceReference(_))
    }

    /// Fetches the underlying boolean.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a boolean; applying an accessor to the
    /// wrong variant is a programming error.
    #[must_use]
    pub fn bool_value(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            other => panic!("expected a bool, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying number.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a number.
    #[must_use]
    pub fn number_value(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            other => panic!("expected a number, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying string.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a string.
    #[must_use]
    pub fn string_value(&self) -> &str {
        match self {
            Self::String(s) => s,
            other => panic!("expected a string, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying array.
    ///
    /// # Panics
    ///
    /// Panics if the value is not an array.
    #[must_use]
    pub fn array_value(&self) -> &[Self] {
        match self {
            Self::Array(a) => a,
            other => panic!("expected an array, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying object map.
    ///
    /// # Panics
    ///
    /// Panics if the value is not an object.
    #[must_use]
    pub fn object_value(&self) -> &PropertyMap {
        match self {
            Self::Object(o) => o,
            other => panic!("expected an object, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying asset.
    ///
    /// # Panics
    ///
    /// Panics if the value is not an asset.
    #[must_use]
    pub fn asset_value(&self) -> &Asset {
        match self {
            Self::Asset(a) => a,
            other => panic!("expected an asset, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying archive.
    ///
    /// # Panics
    ///
    /// Panics if the value is not an archive.
    #[must_use]
    pub fn archive_value(&self) -> &Archive {
        match self {
            Self::Archive(a) => a,
            other => panic!("expected an archive, found {}", other.type_string()),
        }
    }

    /// Fetches the type exemplar of a computed placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the value is not computed.
    #[must_use]
    pub fn computed_value(&self) -> &Self {
        match self {
            Self::Computed(e) => e,
            other => panic!("expected a computed value, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying output.
    ///
    /// # Panics
    ///
    /// Panics if the value is not an output.
    #[must_use]
    pub fn output_value(&self) -> &Output {
        match self {
            Self::Output(o) => o,
            other => panic!("expected an output, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying secret cell.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a secret.
    #[must_use]
    pub fn secret_value(&self) -> &Arc<Secret> {
        match self {
            Self::Secret(s) => s,
            other => panic!("expected a secret, found {}", other.type_string()),
        }
    }

    /// Fetches the underlying resource reference.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a resource reference.
    #[must_use]
    pub fn resource_reference_value(&self) -> &ResourceReference {
        match self {
            Self::ResourceReference(r) => r,
            other => panic!(
                "expected a resource reference, found {}",
                other.type_string()
            ),
        }
    }

    /// Returns true if a semantically meaningful value is present: anything
    /// other than null or an output still awaiting its value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Output(o) => o.known,
            _ => true,
        }
    }

    /// Returns true if the value contains at least one unknown, deeply.
    ///
    /// A computed placeholder and an unresolved output are themselves
    /// unknown; arrays, objects, and secret elements are searched
    /// recursively.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        match self {
            Self::Computed(_) => true,
            Self::Output(o) => !o.known,
            Self::Array(items) => items.iter().any(Self::contains_unknowns),
            Self::Object(map) => map.contains_unknowns(),
            Self::Secret(s) => s.element.contains_unknowns(),
            _ => false,
        }
    }

    /// Returns true if the value contains at least one secret, deeply.
    ///
    /// Unlike [`contains_unknowns`](Self::contains_unknowns), this recurses
    /// into a computed placeholder's element: an unknown that would resolve
    /// to a secret already counts as one.
    #[must_use]
    pub fn contains_secrets(&self) -> bool {
        match self {
            Self::Secret(_) => true,
            Self::Computed(e) => e.contains_secrets(),
            Self::Output(o) => o.secret || o.element.contains_secrets(),
            Self::Array(items) => items.iter().any(Self::contains_secrets),
            Self::Object(map) => map.contains_secrets(),
            _ => false,
        }
    }

    /// Returns true if both values are secrets sharing the same underlying
    /// cell.
    ///
    /// This is the identity comparison downstream caches key on; it is
    /// deliberately distinct from `==`, which compares secret elements
    /// structurally.
    #[must_use]
    pub fn is_same_secret(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Secret(a), Self::Secret(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns a canonical descriptor of the value's shape.
    ///
    /// A resolved, non-secret output renders transparently as its element's
    /// shape; an unknown output reduces to computed and a secret output to
    /// secret.
    #[must_use]
    pub fn type_string(&self) -> String {
        match self {
            Self::Null => String::from("null"),
            Self::Bool(_) => String::from("bool"),
            Self::Number(_) => String::from("number"),
            Self::String(_) => String::from("string"),
            Self::Array(_) => String::from("[]"),
            Self::Asset(_) => String::from("asset"),
            Self::Archive(_) => String::from("archive"),
            Self::Object(_) => String::from("object"),
            Self::Computed(e) => format!("output<{}>", e.type_string()),
            Self::Output(o) => {
                if !o.known {
                    Self::make_computed(o.element.clone()).type_string()
                } else if o.secret {
                    Self::make_secret(o.element.clone()).type_string()
                } else {
                    o.element.type_string()
                }
            }
            Self::Secret(s) => format!("secret<{}>", s.element.type_string()),
            Self::ResourceReference(r) => {
                let id = r.id_string().unwrap_or("");
                format!(
                    "resourceReference(\"{}\", \"{}\", \"{}\")",
                    r.urn, id, r.package_version
                )
            }
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Asset(a), Self::Asset(b)) => a == b,
            (Self::Archive(a), Self::Archive(b)) => a == b,
            (Self::Computed(a), Self::Computed(b)) => a == b,
            (Self::Output(a), Self::Output(b)) => a == b,
            // Secrets compare by element; the cell address is an identity
            // concern, not an equality concern.
            (Self::Secret(a), Self::Secret(b)) => a.element == b.element,
            (Self::ResourceReference(a), Self::ResourceReference(b)) => a.equal(b),
            _ => false,
        }
    }
}

impl Default for PropertyValue {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Computed values show the shape followed by an empty body.
            Self::Computed(_) => write!(f, "{}{{}}", self.type_string()),
            Self::Output(o) => {
                if !o.known {
                    write!(f, "{}", Self::make_computed(o.element.clone()))
                } else if o.secret {
                    write!(f, "{}", Self::make_secret(o.element.clone()))
                } else {
                    write!(f, "{}", o.element)
                }
            }
            Self::Secret(s) => write!(f, "secret{{{}}}", s.element),
            Self::Null => write!(f, "{{null}}"),
            Self::Bool(b) => write!(f, "{{{b}}}"),
            Self::Number(n) => write!(f, "{{{n}}}"),
            Self::String(s) => write!(f, "{{{s}}}"),
            other => write!(f, "{}{{..}}", other.type_string()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for PropertyValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(v: Vec<PropertyValue>) -> Self {
        Self::Array(v)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(v: PropertyMap) -> Self {
        Self::Object(v)
    }
}

impl From<Asset> for PropertyValue {
    fn from(v: Asset) -> Self {
        Self::Asset(v)
    }
}

impl From<Archive> for PropertyValue {
    fn from(v: Archive) -> Self {
        Self::Archive(v)
    }
}

impl From<Output> for PropertyValue {
    fn from(v: Output) -> Self {
        Self::Output(Box::new(v))
    }
}

impl From<ResourceReference> for PropertyValue {
    fn from(v: ResourceReference) -> Self {
        Self::ResourceReference(Box::new(v))
    }
}
