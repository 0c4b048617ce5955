//! Uniform resource names and provider-assigned IDs.
//!
//! A URN uniquely identifies a resource within a stack. It has the shape
//! `urn:pulumi:<stack>::<project>::<type-chain>::<name>`, where the type
//! chain joins the types of the resource's parents with `$` so that a
//! resource tree flattens into a stable string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UrnError;
use crate::tokens::{PackageName, StackName, Type};

/// Prefix of every URN.
pub const URN_PREFIX: &str = "urn:pulumi:";

/// Delimiter between URN sections.
pub const URN_SECTION_DELIMITER: &str = "::";

/// Delimiter between the types of a type chain.
pub const TYPE_CHAIN_DELIMITER: char = '$';

/// A uniform resource name, globally unique within a stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Builds a URN from its constituent parts.
    ///
    /// `parent_qualified_type` is the qualified type chain of the parent
    /// resource, if any; the new resource's type is appended to it.
    #[must_use]
    pub fn new(
        stack: &StackName,
        project: &PackageName,
        parent_qualified_type: Option<&str>,
        ty: &Type,
        name: &str,
    ) -> Self {
        let chain = match parent_qualified_type {
            Some(parent) if !parent.is_empty() => {
                format!("{parent}{TYPE_CHAIN_DELIMITER}{ty}")
            }
            _ => ty.to_string(),
        };
        Self(format!(
            "{URN_PREFIX}{stack}{URN_SECTION_DELIMITER}{project}{URN_SECTION_DELIMITER}{chain}{URN_SECTION_DELIMITER}{name}"
        ))
    }

    /// Parses and validates a URN string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is missing the URN prefix, has fewer
    /// than four sections, or has an empty section.
    pub fn parse(s: impl Into<String>) -> Result<Self, UrnError> {
        let s = s.into();
        let Some(rest) = s.strip_prefix(URN_PREFIX) else {
            return Err(UrnError::MissingPrefix { urn: s });
        };

        let sections: Vec<&str> = rest.splitn(4, URN_SECTION_DELIMITER).collect();
        if sections.len() != 4 {
            return Err(UrnError::TooFewSections {
                found: sections.len(),
                urn: s,
            });
        }
        if sections[0].is_empty()
            || sections[1].is_empty()
            || sections[2].is_empty()
            || sections[3].is_empty()
        {
            return Err(UrnError::Malformed {
                urn: s,
                reason: String::from("URN sections may not be empty"),
            });
        }

        Ok(Self(s))
    }

    /// Returns the stack section.
    #[must_use]
    pub fn stack(&self) -> &str {
        self.section(0)
    }

    /// Returns the project section.
    #[must_use]
    pub fn project(&self) -> &str {
        self.section(1)
    }

    /// Returns the full qualified type chain.
    #[must_use]
    pub fn qualified_type(&self) -> &str {
        self.section(2)
    }

    /// Returns the resource's own type: the last element of the type chain.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.qualified_type()
            .rsplit(TYPE_CHAIN_DELIMITER)
            .next()
            .unwrap_or("")
    }

    /// Returns the name section.
    #[must_use]
    pub fn name(&self) -> &str {
        self.section(3)
    }

    /// Returns the URN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn section(&self, index: usize) -> &str {
        self.0
            .strip_prefix(URN_PREFIX)
            .unwrap_or(&self.0)
            .splitn(4, URN_SECTION_DELIMITER)
            .nth(index)
            .unwrap_or("")
    }
}

impl FromStr for Urn {
    type Err = UrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque resource ID assigned by a provider.
///
/// The empty string means "not yet assigned": the resource has been declared
/// but no provider has created it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Creates a new ID from the given string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no provider has assigned this ID yet.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
