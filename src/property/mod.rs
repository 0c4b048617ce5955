//! The property value layer.
//!
//! Everything that flows between program, engine, and providers is carried
//! by [`PropertyValue`]s and [`PropertyMap`]s: scalars, containers, asset
//! handles, plan-time unknowns, outputs with dependency sets, secrets with
//! shared identity, and cross-resource references.

mod asset;
mod convert;
mod map;
mod value;
mod wire;

pub use asset::{Archive, ArchiveSource, Asset, AssetSource};
pub use convert::{HostValue, KeyRenderer, KeyReplacer, ValueRenderer, ValueReplacer};
pub use map::{INTERNAL_KEY_PREFIX, PropertyKey, PropertyMap};
pub use value::{Output, Property, PropertyValue, ResourceReference, Secret};
pub use wire::{
    ARCHIVE_SIG, ASSET_SIG, OUTPUT_VALUE_SIG, RESOURCE_REFERENCE_SIG, SECRET_SIG, SIG_KEY, has_sig,
};
