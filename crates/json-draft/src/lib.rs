//! Immutable updates through mutable drafts.
//!
//! A [`Producer`] hands a recipe a [`Draft`] of some base [`Value`]. The
//! recipe mutates the draft as if it owned the data; the producer then builds
//! the next value, copying only the nodes along changed paths and sharing the
//! rest with the base. The base is never modified.
//!
//! ```
//! use json_draft::{DraftError, Producer, ProducerConfig, Value};
//! use serde_json::json;
//!
//! let producer = Producer::new(ProducerConfig::default().with_auto_freeze(true));
//! let base = Value::from(json!({"todos": [{"done": false}], "user": {"name": "ann"}}));
//!
//! let next = producer.produce(&base, |draft| {
//!     draft.draft()?.child("todos")?.child(0)?.set("done", true)?;
//!     Ok::<_, DraftError>(None)
//! })?;
//!
//! assert_eq!(next.to_json()?, json!({"todos": [{"done": true}], "user": {"name": "ann"}}));
//! assert_eq!(base.to_json()?, json!({"todos": [{"done": false}], "user": {"name": "ann"}}));
//! assert!(next.get("user").unwrap().is(base.get("user").unwrap()));
//! # Ok::<(), DraftError>(())
//! ```
//!
//! With [`Producer::produce_with_patches`] a call also reports what changed,
//! as patches that can be replayed with [`Producer::apply_patches`].

pub mod config;
pub mod draft;
pub mod error;
pub mod patch;
pub mod producer;
pub mod scope;
pub mod value;

mod backend;
mod finalize;
mod state;
mod sweep;

pub use backend::Strategy;
pub use config::{Hooks, ProducerConfig};
pub use draft::Draft;
pub use error::DraftError;
pub use patch::{Patch, PatchError};
pub use producer::Producer;
pub use value::{Array, Map, Object, Value};

pub use json_draft_path::{Path, PathStep};
