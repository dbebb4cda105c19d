//! Backing stores.
//!
//! A store is the only external collaborator of a tree. It parses its
//! persisted state into a skeleton, writes a skeleton back, and reports a
//! cheap version stamp that the root compares to notice outside changes.

mod file;
mod memory;

pub use file::{FileFormat, FileStore};
pub use memory::MemoryStore;

use serde_json::Value;
use std::fmt::Debug;

/// The contract a root needs from its persistence backend.
///
/// Errors are returned as `anyhow::Error` and surface unmodified through
/// [`Error::Store`](crate::Error::Store).
pub trait Store {
    /// Opaque version marker. Stamps are only compared for inequality.
    type Stamp: PartialEq + Clone + Debug;

    /// Parse the current persisted state.
    fn load(&self) -> anyhow::Result<Value>;

    /// Persist a full skeleton.
    fn dump(&mut self, skeleton: &Value) -> anyhow::Result<()>;

    /// Snapshot of the store's current version. Must not have side effects.
    fn stamp(&self) -> anyhow::Result<Self::Stamp>;
}
