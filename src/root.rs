//! The root of a live configuration tree.
//!
//! A [`Root`] owns the node arena and the connection to its [`Store`]. Every
//! access first asks whether the store's stamp moved since it was last
//! cached and reloads if so; every mutation is logged and, when enabled,
//! persisted by dumping the whole tree.

use crate::config::RootOptions;
use crate::error::{Error, Result};
use crate::format::render_value;
use crate::logging::{LogLevel, Logger};
use crate::mutation::{Mutation, MutationKind};
use crate::node::NodeMut;
use crate::ops::StructuralOp;
use crate::path::{Key, parse_path, qualify, split_last};
use crate::store::Store;
use crate::tree::{Children, Entry, Flag, NodeId, Tree};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A configuration tree bound to a backing store.
pub struct Root<S: Store> {
    tree: Tree,
    store: S,
    /// Stamp observed at the last persistence (or at open).
    cached_stamp: S::Stamp,
    options: RootOptions,
    logger: Logger,
}

impl<S: Store> Root<S> {
    /// Load the store and build the tree, logging under the root's name.
    pub fn open(store: S, options: RootOptions) -> Result<Self> {
        let logger = Logger::new().with_name(options.name.clone());
        Self::open_with_logger(store, options, logger)
    }

    /// Open with an explicit logger. An unnamed logger takes the root's name.
    pub fn open_with_logger(store: S, options: RootOptions, logger: Logger) -> Result<Self> {
        let logger = if logger.name().is_some() {
            logger
        } else {
            logger.with_name(options.name.clone())
        };
        // Captured before the first load
        let cached_stamp = store.stamp()?;
        let skeleton = store.load()?;
        let tree = Tree::build(options.name.clone(), options.flags(), skeleton)?;

        let root = Self {
            tree,
            store,
            cached_stamp,
            options,
            logger,
        };
        root.logger.info(&format!(
            "Loaded {} config: {}",
            root.options.name,
            render_value(&root.tree.materialize(NodeId::ROOT))
        ));
        Ok(root)
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &RootOptions {
        &self.options
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn cached_stamp(&self) -> &S::Stamp {
        &self.cached_stamp
    }

    /// The node arena, for inspection.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Reload from the store if its stamp differs from the cached one.
    ///
    /// Does nothing while the root's `reload` flag is off. A read-triggered
    /// reload leaves the cached stamp alone unless
    /// `refresh_stamp_on_reload` is set.
    pub fn refresh(&mut self) -> Result<()> {
        if !self.tree.flags(NodeId::ROOT).reload {
            return Ok(());
        }
        let stamp = self.store.stamp()?;
        self.logger.debug(&format!(
            "Cached stamp: {:?} Current stamp: {:?}",
            self.cached_stamp, stamp
        ));
        if stamp != self.cached_stamp {
            self.logger.debug("Loading config");
            let reloaded = self
                .store
                .load()
                .map_err(Error::from)
                .and_then(|skeleton| self.tree.reload(skeleton));
            if let Err(err) = reloaded {
                self.logger.warning(&format!(
                    "Keeping previous {} config: {}",
                    self.options.name, err
                ));
                return Err(err);
            }
            if self.options.refresh_stamp_on_reload {
                self.cached_stamp = stamp;
            }
        }
        Ok(())
    }

    /// Dump the whole tree to the store.
    ///
    /// Calling this while the root's `save` flag is off is a programming
    /// error and fails with `PersistenceDisabled`.
    pub fn persist(&mut self) -> Result<()> {
        if !self.tree.flags(NodeId::ROOT).save {
            let err = Error::PersistenceDisabled {
                name: self.options.name.clone(),
            };
            self.logger.error(&err.to_string());
            return Err(err);
        }
        self.write_through()
    }

    fn write_through(&mut self) -> Result<()> {
        self.logger.debug("Saving config");
        let skeleton = self.tree.materialize(NodeId::ROOT);
        self.store.dump(&skeleton)?;
        self.cached_stamp = self.store.stamp()?;
        Ok(())
    }

    /// Log a mutation and persist if both the mutated node and the root
    /// have `save` on.
    fn on_mutation(&mut self, source: NodeId, mutation: Mutation) -> Result<()> {
        self.logger.log_with_data(
            LogLevel::Info,
            &format!("Mutation {}", mutation),
            mutation.to_data(),
        );
        if self.tree.flags(source).save && self.tree.flags(NodeId::ROOT).save {
            self.write_through()?;
        }
        Ok(())
    }

    // Path-addressed API

    /// Handle to the node at `path` (`""` is the root itself).
    pub fn node(&mut self, path: &str) -> Result<NodeMut<'_, S>> {
        let keys = parse_path(path);
        self.refresh()?;
        self.tree.resolve(&keys)?;
        Ok(NodeMut::new(self, keys))
    }

    /// Id of the node at `path`. Ids are stable until the node leaves the tree.
    pub fn node_id(&mut self, path: &str) -> Result<NodeId> {
        self.refresh()?;
        self.tree.resolve(&parse_path(path))
    }

    fn split(&self, path: &str) -> Result<(NodeId, Key)> {
        let Some((parents, last)) = split_last(path) else {
            return Err(Error::InvalidKey {
                path: self.options.name.clone(),
                key: String::new(),
            });
        };
        Ok((self.tree.resolve(&parents)?, last))
    }

    /// Value at `path`; containers come back materialized.
    pub fn get(&mut self, path: &str) -> Result<Value> {
        self.refresh()?;
        if path.is_empty() {
            return Ok(self.tree.materialize(NodeId::ROOT));
        }
        let (id, key) = self.split(path)?;
        self.get_at(id, &key)
    }

    /// Value at `path`, deserialized.
    pub fn get_as<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get(path)?)?)
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.refresh()?;
        let (id, key) = self.split(path)?;
        self.set_at(id, key, value.into())
    }

    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.refresh()?;
        let (id, key) = self.split(path)?;
        self.delete_at(id, key)
    }

    /// Apply a structural operation to the node at `path`.
    pub fn apply(&mut self, path: &str, op: StructuralOp) -> Result<Option<Value>> {
        self.refresh()?;
        let id = self.tree.resolve(&parse_path(path))?;
        self.apply_at(id, op)
    }

    /// Whether `path` names an existing entry.
    pub fn contains(&mut self, path: &str) -> Result<bool> {
        self.refresh()?;
        let (id, key) = self.split(path)?;
        match self.tree.lookup(id, &key) {
            Ok(_) => Ok(true),
            Err(
                Error::KeyNotFound { .. }
                | Error::IndexOutOfRange { .. }
                | Error::InvalidKey { .. },
            ) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of children of the root.
    pub fn len(&mut self) -> Result<usize> {
        self.refresh()?;
        Ok(self.tree.children(NodeId::ROOT).len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Full materialized snapshot.
    pub fn to_basic(&mut self) -> Result<Value> {
        self.refresh()?;
        Ok(self.tree.materialize(NodeId::ROOT))
    }

    pub fn mutable(&self) -> bool {
        self.tree.flags(NodeId::ROOT).mutable
    }

    pub fn save(&self) -> bool {
        self.tree.flags(NodeId::ROOT).save
    }

    pub fn reload(&self) -> bool {
        self.tree.flags(NodeId::ROOT).reload
    }

    /// Set `mutable` on the root and every node below it.
    pub fn set_mutable(&mut self, value: bool) {
        self.tree.set_flag(NodeId::ROOT, Flag::Mutable, value);
    }

    pub fn set_save(&mut self, value: bool) {
        self.tree.set_flag(NodeId::ROOT, Flag::Save, value);
    }

    pub fn set_reload(&mut self, value: bool) {
        self.tree.set_flag(NodeId::ROOT, Flag::Reload, value);
    }

    // Node-addressed operations shared with `NodeMut`. Callers refresh first.

    pub(crate) fn resolve(&self, keys: &[Key]) -> Result<NodeId> {
        self.tree.resolve(keys)
    }

    pub(crate) fn get_at(&self, id: NodeId, key: &Key) -> Result<Value> {
        let entry = self.tree.lookup(id, key)?;
        Ok(self.tree.materialize_entry(entry))
    }

    pub(crate) fn set_at(&mut self, id: NodeId, key: Key, value: Value) -> Result<()> {
        let path = qualify(&self.tree.qualified_name(id), &key);
        let kind = match self.tree.children(id) {
            Children::Map(map) => match map.get(&key.as_name()) {
                Some(entry) if self.tree.entry_equals(entry, &value) => return Ok(()),
                Some(_) => MutationKind::Update,
                None => MutationKind::New,
            },
            Children::Seq(items) => {
                let index = key.as_index(&path)?;
                match items.get(index) {
                    Some(entry) if self.tree.entry_equals(entry, &value) => return Ok(()),
                    Some(_) => MutationKind::Update,
                    None => {
                        return Err(Error::IndexOutOfRange {
                            path,
                            index,
                            len: items.len(),
                        });
                    }
                }
            }
        };
        if !self.tree.is_writable(id) || self.replaces_read_only(id, &key) {
            return Err(Error::not_mutable(path));
        }

        let entry = self.tree.wrap(id, value.clone());
        match self.tree.children_mut(id) {
            Children::Map(map) => {
                map.insert(key.as_name(), entry);
            }
            Children::Seq(items) => {
                let index = key.as_index(&path)?;
                items[index] = entry;
            }
        }
        self.tree.collect_garbage();

        let mutation = match kind {
            MutationKind::New => Mutation::new(path, value),
            _ => Mutation::update(path, value),
        };
        self.on_mutation(id, mutation)
    }

    pub(crate) fn delete_at(&mut self, id: NodeId, key: Key) -> Result<()> {
        let path = qualify(&self.tree.qualified_name(id), &key);
        self.tree.lookup(id, &key)?;
        if !self.tree.is_writable(id) || self.replaces_read_only(id, &key) {
            return Err(Error::not_mutable(path));
        }

        match self.tree.children_mut(id) {
            Children::Map(map) => {
                map.shift_remove(&key.as_name());
            }
            Children::Seq(items) => {
                let index = key.as_index(&path)?;
                items.remove(index);
            }
        }
        self.tree.collect_garbage();
        self.on_mutation(id, Mutation::delete(path))
    }

    /// An existing child node that is read-only, or holds one, cannot be
    /// overwritten or removed through its parent.
    fn replaces_read_only(&self, id: NodeId, key: &Key) -> bool {
        match self.tree.lookup(id, key) {
            Ok(&Entry::Node(node)) => self.tree.contains_read_only(node),
            _ => false,
        }
    }

    /// Run a structural operation and classify it by content.
    pub(crate) fn apply_at(&mut self, id: NodeId, op: StructuralOp) -> Result<Option<Value>> {
        let path = self.tree.qualified_name(id);
        let name = op.name();

        let mut working = self.tree.children(id).clone();
        let removed = op.apply(&mut working, &self.tree, &path)?;
        let before = self.tree.replace_children(id, working);
        self.tree.rewrap(id);

        if self.tree.same_content(&before, self.tree.children(id)) {
            // Fresh nodes made for equal content are dropped
            self.tree.replace_children(id, before);
            self.tree.collect_garbage();
            return Ok(None);
        }
        if !self.tree.is_writable(id) {
            self.tree.replace_children(id, before);
            self.tree.collect_garbage();
            return Err(Error::not_mutable(path));
        }
        let kept = self.tree.children(id).node_ids();
        let locked = before
            .node_ids()
            .into_iter()
            .find(|node| !kept.contains(node) && self.tree.contains_read_only(*node));
        if let Some(node) = locked {
            self.tree.replace_children(id, before);
            self.tree.collect_garbage();
            return Err(Error::not_mutable(self.tree.qualified_name(node)));
        }

        // Materialize removed nodes before they are reclaimed
        let removed = removed.first().map(|entry| self.tree.materialize_entry(entry));
        self.tree.collect_garbage();
        let value = self.tree.materialize(id);
        self.on_mutation(id, Mutation::func(path, name, value))?;
        Ok(removed)
    }

    pub(crate) fn set_flag_at(&mut self, id: NodeId, flag: Flag, value: bool) {
        self.tree.set_flag(id, flag, value);
    }

    pub(crate) fn entry_is_node(&self, id: NodeId, key: &Key) -> Result<bool> {
        Ok(matches!(self.tree.lookup(id, key)?, Entry::Node(_)))
    }
}

impl<S: Store> std::fmt::Debug for Root<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root")
            .field("name", &self.options.name)
            .field("cached_stamp", &self.cached_stamp)
            .field("nodes", &self.tree.node_count())
            .finish()
    }
}
