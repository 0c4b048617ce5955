//! Resource identity and records.
//!
//! This module defines how resources are identified (URNs and
//! provider-assigned IDs), the durable per-resource state record, and the
//! ephemeral registration intent emitted by programs.

mod goal;
mod state;
mod urn;

pub use goal::Goal;
pub use state::ResourceState;
pub use urn::{Id, TYPE_CHAIN_DELIMITER, URN_PREFIX, URN_SECTION_DELIMITER, Urn};
