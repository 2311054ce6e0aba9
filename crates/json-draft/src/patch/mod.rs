//! Patches: records of what a producer call changed.
//!
//! A producer call can report its changes as `add`, `replace` and `remove`
//! patches together with the inverse patches that undo them. Both lists are
//! in replay order and can be fed to
//! [`Producer::apply_patches`](crate::Producer::apply_patches).

pub mod types;
pub mod codec;
pub(crate) mod apply;
pub(crate) mod generate;

pub use types::{Patch, PatchError};
pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
