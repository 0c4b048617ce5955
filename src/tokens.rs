//! Identity tokens for resources, packages, and stacks.
//!
//! This module defines the validated string newtypes used throughout the
//! engine: simple names, qualified names, three-part type tokens, package
//! names, and stack names. All of them are thin wrappers over `String` with
//! explicit legality rules enforced at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TokenError;

/// Delimiter between the parts of a type token.
pub const TYPE_DELIMITER: char = ':';

/// Delimiter between the names of a qualified name.
pub const QNAME_DELIMITER: char = '/';

/// The well-known type token of the root stack resource.
pub const ROOT_STACK_TYPE: &str = "pulumi:pulumi:Stack";

/// The module name under which provider resources live.
pub const PROVIDERS_MODULE: &str = "providers";

/// Maximum length of a stack name, matching the default backend rule.
pub const MAX_STACK_NAME_LENGTH: usize = 100;

/// Returns true if `s` is a legal name: one or more alphanumerics, hyphens,
/// underscores, or periods.
#[must_use]
pub fn is_legal_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Returns true if `s` is a legal qualified name: one or more legal names
/// joined by `/`.
#[must_use]
pub fn is_legal_qname(s: &str) -> bool {
    !s.is_empty() && s.split(QNAME_DELIMITER).all(is_legal_name)
}

/// A simple identifier: alphanumerics plus `-`, `_`, and `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Creates a new name, validating its alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains an illegal character.
    pub fn new(s: impl Into<String>) -> Result<Self, TokenError> {
        let s = s.into();
        if !is_legal_name(&s) {
            return Err(TokenError::InvalidName { name: s });
        }
        Ok(Self(s))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A qualified name: one or more [`Name`]s joined by `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QName(String);

impl QName {
    /// Creates a new qualified name, validating each segment.
    ///
    /// # Errors
    ///
    /// Returns an error if any `/`-separated segment is not a legal name.
    pub fn new(s: impl Into<String>) -> Result<Self, TokenError> {
        let s = s.into();
        if !is_legal_qname(&s) {
            return Err(TokenError::InvalidQName { qname: s });
        }
        Ok(Self(s))
    }

    /// Returns the qualified name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the final name segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .rsplit(QNAME_DELIMITER)
            .next()
            .unwrap_or(self.0.as_str())
    }
}

impl FromStr for QName {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of the package a user program belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Creates a new package name.
    ///
    /// # Errors
    ///
    /// Returns an error if the package name is not a legal qualified name.
    pub fn new(s: impl Into<String>) -> Result<Self, TokenError> {
        let s = s.into();
        if !is_legal_qname(&s) {
            return Err(TokenError::InvalidQName { qname: s });
        }
        Ok(Self(s))
    }

    /// Returns the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PackageName {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of a stack.
///
/// Stack name legality is backend-configurable; the default rule accepts the
/// name alphabet and bounds the length at [`MAX_STACK_NAME_LENGTH`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(String);

impl StackName {
    /// Creates a new stack name under the default legality rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains an
    /// illegal character.
    pub fn new(s: impl Into<String>) -> Result<Self, TokenError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TokenError::InvalidStackName {
                name: s,
                reason: String::from("stack names may not be empty"),
            });
        }
        if s.len() > MAX_STACK_NAME_LENGTH {
            return Err(TokenError::InvalidStackName {
                name: s,
                reason: format!("stack names are limited to {MAX_STACK_NAME_LENGTH} characters"),
            });
        }
        if !is_legal_name(&s) {
            return Err(TokenError::InvalidStackName {
                name: s,
                reason: String::from(
                    "stack names may only contain alphanumerics, hyphens, underscores, and periods",
                ),
            });
        }
        Ok(Self(s))
    }

    /// Returns the stack name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StackName {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A three-part resource type token: `package:module:member`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Type(String);

impl Type {
    /// Parses a type token of the form `package:module:member`.
    ///
    /// The module part may be empty; package and member must be legal names.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not have exactly three parts or if
    /// any part violates its alphabet.
    pub fn parse(s: impl Into<String>) -> Result<Self, TokenError> {
        let s = s.into();
        let parts: Vec<&str> = s.split(TYPE_DELIMITER).collect();
        if parts.len() != 3 {
            return Err(TokenError::InvalidType {
                reason: format!("expected 3 ':'-delimited parts, found {}", parts.len()),
                token: s,
            });
        }
        if !is_legal_qname(parts[0]) {
            return Err(TokenError::InvalidType {
                token: s,
                reason: String::from("package part is not a legal qualified name"),
            });
        }
        if !parts[1].is_empty() && !is_legal_qname(parts[1]) {
            return Err(TokenError::InvalidType {
                token: s,
                reason: String::from("module part is not a legal qualified name"),
            });
        }
        if !is_legal_name(parts[2]) {
            return Err(TokenError::InvalidType {
                token: s,
                reason: String::from("member part is not a legal name"),
            });
        }
        Ok(Self(s))
    }

    /// Returns the package part of the token.
    #[must_use]
    pub fn package(&self) -> &str {
        self.0.split(TYPE_DELIMITER).next().unwrap_or("")
    }

    /// Returns the module part of the token.
    #[must_use]
    pub fn module(&self) -> &str {
        self.0.split(TYPE_DELIMITER).nth(1).unwrap_or("")
    }

    /// Returns the member part of the token.
    #[must_use]
    pub fn member(&self) -> &str {
        self.0.split(TYPE_DELIMITER).nth(2).unwrap_or("")
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the well-known root stack type.
    #[must_use]
    pub fn is_root_stack(&self) -> bool {
        self.0 == ROOT_STACK_TYPE
    }

    /// Returns true if this type describes a provider resource.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        self.module() == PROVIDERS_MODULE
    }
}

impl FromStr for Type {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_names() {
        assert!(is_legal_name("web-server"));
        assert!(is_legal_name("my_bucket.v2"));
        assert!(!is_legal_name(""));
        assert!(!is_legal_name("has space"));
        assert!(!is_legal_name("has:colon"));
    }

    #[test]
    fn test_qname_segments() {
        assert!(is_legal_qname("infra/network/vpc"));
        assert!(!is_legal_qname("infra//vpc"));
        assert!(!is_legal_qname("/leading"));

        let q = QName::new("infra/network/vpc").expect("legal qname");
        assert_eq!(q.name(), "vpc");
    }

    #[test]
    fn test_type_token_parse() {
        let t = Type::parse("aws:s3/bucket:Bucket").expect("legal type token");
        assert_eq!(t.package(), "aws");
        assert_eq!(t.module(), "s3/bucket");
        assert_eq!(t.member(), "Bucket");
        assert!(!t.is_root_stack());
        assert!(!t.is_provider());
    }

    #[test]
    fn test_type_token_empty_module() {
        let t = Type::parse("kubernetes::Provider").expect("empty module is legal");
        assert_eq!(t.module(), "");
    }

    #[test]
    fn test_type_token_rejects_bad_shapes() {
        assert!(Type::parse("aws:s3").is_err());
        assert!(Type::parse("aws:s3:bucket:Bucket").is_err());
        assert!(Type::parse("aws:s3:bad name").is_err());
    }

    #[test]
    fn test_root_stack_and_provider_types() {
        let stack = Type::parse(ROOT_STACK_TYPE).expect("root stack type parses");
        assert!(stack.is_root_stack());

        let provider = Type::parse("pulumi:providers:aws").expect("provider type parses");
        assert!(provider.is_provider());
    }

    #[test]
    fn test_stack_name_rules() {
        assert!(StackName::new("prod-us-west.2").is_ok());
        assert!(StackName::new("").is_err());
        assert!(StackName::new("bad stack").is_err());
        assert!(StackName::new("x".repeat(MAX_STACK_NAME_LENGTH + 1)).is_err());
    }
}
