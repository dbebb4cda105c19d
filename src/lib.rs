//! Live hierarchical configuration.
//!
//! A [`Root`] loads a document from a [`Store`] into a tree of nodes. Reads
//! reload the tree when the store changed underneath, writes are logged as
//! mutation events and persisted back, and per-node flags control which
//! parts are writable, which are saved, and which survive a reload.
//!
//! ```
//! use hotmarkup::{MemoryStore, Root, RootOptions};
//! use serde_json::json;
//!
//! let store = MemoryStore::new(json!({"server": {"port": 8080}}));
//! let mut root = Root::open(store.clone(), RootOptions::named("app")).unwrap();
//! root.set("server.port", 9090).unwrap();
//! assert_eq!(store.data(), json!({"server": {"port": 9090}}));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod mutation;
pub mod node;
pub mod ops;
pub mod path;
pub mod root;
pub mod store;
pub mod tree;

pub use config::RootOptions;
pub use error::{Error, ErrorCode, Result};
pub use logging::Logger;
pub use mutation::{Mutation, MutationKind};
pub use node::NodeMut;
pub use ops::StructuralOp;
pub use path::Key;
pub use root::Root;
pub use store::{FileFormat, FileStore, MemoryStore, Store};
pub use tree::{Flag, Flags, NodeId, Shape};
