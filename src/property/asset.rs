//! Asset and archive handles.
//!
//! Assets are content-addressed blobs; archives are directory-like
//! collections of assets. Both are handles: the payload is inline text, a
//! local path, or a URI, exactly one of which is present. Inline payloads
//! are hashed eagerly so identical content compares and deduplicates by
//! digest; path and URI handles carry no hash until the blob is fetched by
//! a provider.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The payload of an [`Asset`]: exactly one of inline text, a local path,
/// or a URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssetSource {
    /// Inline UTF-8 text content.
    Text(String),
    /// A path to a local file.
    Path(String),
    /// A URI to remote content.
    Uri(String),
}

/// A content-addressed blob handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// SHA-256 digest of the content, if known.
    pub(crate) hash: Option<String>,
    /// Where the content lives.
    pub(crate) source: AssetSource,
}

impl Asset {
    /// Creates an asset from inline text, computing its content hash.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = hash_bytes(text.as_bytes());
        Self {
            hash: Some(hash),
            source: AssetSource::Text(text),
        }
    }

    /// Creates an asset referring to a local file.
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            hash: None,
            source: AssetSource::Path(path.into()),
        }
    }

    /// Creates an asset referring to remote content.
    #[must_use]
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            hash: None,
            source: AssetSource::Uri(uri.into()),
        }
    }

    /// Returns the content hash, if known.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Returns the payload source.
    #[must_use]
    pub const fn source(&self) -> &AssetSource {
        &self.source
    }

    /// Returns the inline text, if this is a text asset.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.source {
            AssetSource::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the local path, if this is a path asset.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match &self.source {
            AssetSource::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the URI, if this is a URI asset.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match &self.source {
            AssetSource::Uri(u) => Some(u),
            _ => None,
        }
    }
}

/// The payload of an [`Archive`]: exactly one of a member map, a local
/// path, or a URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchiveSource {
    /// An explicit map of member name to asset.
    Assets(BTreeMap<String, Asset>),
    /// A path to a local directory or archive file.
    Path(String),
    /// A URI to a remote archive.
    Uri(String),
}

/// A directory-like collection of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    /// SHA-256 digest of the contents, if known.
    pub(crate) hash: Option<String>,
    /// Where the contents live.
    pub(crate) source: ArchiveSource,
}

impl Archive {
    /// Creates an archive from an explicit member map.
    ///
    /// The archive hash digests each member name together with the member's
    /// own content hash, in sorted member order, so two archives with the
    /// same members hash identically.
    #[must_use]
    pub fn from_assets(assets: BTreeMap<String, Asset>) -> Self {
        let mut hasher = Sha256::new();
        for (name, asset) in &assets {
            hasher.update(name.as_bytes());
            if let Some(h) = asset.hash() {
                hasher.update(h.as_bytes());
            }
        }
        Self {
            hash: Some(hex::encode(hasher.finalize())),
            source: ArchiveSource::Assets(assets),
        }
    }

    /// Creates an archive referring to a local directory or archive file.
    #[must_use]
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            hash: None,
            source: ArchiveSource::Path(path.into()),
        }
    }

    /// Creates an archive referring to a remote archive.
    #[must_use]
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            hash: None,
            source: ArchiveSource::Uri(uri.into()),
        }
    }

    /// Returns the content hash, if known.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Returns the payload source.
    #[must_use]
    pub const fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Returns the member map, if this is an explicit archive.
    #[must_use]
    pub fn assets(&self) -> Option<&BTreeMap<String, Asset>> {
        match &self.source {
            ArchiveSource::Assets(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the local path, if this is a path archive.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match &self.source {
            ArchiveSource::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the URI, if this is a URI archive.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match &self.source {
            ArchiveSource::Uri(u) => Some(u),
            _ => None,
        }
    }
}

/// Computes the hex-encoded SHA-256 digest of the given bytes.
fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_asset_is_hashed() {
        let a = Asset::from_text("hello");
        let b = Asset::from_text("hello");
        let c = Asset::from_text("goodbye");

        assert!(a.hash().is_some());
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.text(), Some("hello"));
    }

    #[test]
    fn test_path_and_uri_assets_have_no_hash() {
        assert!(Asset::from_path("./app.zip").hash().is_none());
        assert!(Asset::from_uri("https://example.com/app.zip").hash().is_none());
    }

    #[test]
    fn test_archive_hash_covers_members() {
        let mut members = BTreeMap::new();
        members.insert(String::from("index.html"), Asset::from_text("<html/>"));
        members.insert(String::from("main.js"), Asset::from_text("console.log(1)"));

        let a = Archive::from_assets(members.clone());
        let b = Archive::from_assets(members.clone());
        assert_eq!(a.hash(), b.hash());

        members.insert(String::from("style.css"), Asset::from_text("body {}"));
        let c = Archive::from_assets(members);
        assert_ne!(a.hash(), c.hash());
    }
}
