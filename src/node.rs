//! Path-based handles into a root.
//!
//! A [`NodeMut`] remembers the keys leading to its node rather than the node
//! itself, and resolves them again after the staleness check on every call.
//! A handle taken before a reload therefore sees the reloaded node, and a
//! handle whose node disappeared fails with a lookup error instead of
//! operating on a detached copy.

use crate::error::{Error, Result};
use crate::ops::StructuralOp;
use crate::path::{Key, qualify};
use crate::root::Root;
use crate::store::Store;
use crate::tree::{Children, Flag, NodeId, Shape};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ops::Range;

/// Mutable handle to one node of a [`Root`].
pub struct NodeMut<'a, S: Store> {
    root: &'a mut Root<S>,
    keys: Vec<Key>,
}

impl<'a, S: Store> NodeMut<'a, S> {
    pub(crate) fn new(root: &'a mut Root<S>, keys: Vec<Key>) -> Self {
        Self { root, keys }
    }

    /// Keys from the root down to this node.
    pub fn keys_from_root(&self) -> &[Key] {
        &self.keys
    }

    /// Check the store, then find this node.
    fn locate(&mut self) -> Result<NodeId> {
        self.root.refresh()?;
        self.root.resolve(&self.keys)
    }

    pub fn id(&mut self) -> Result<NodeId> {
        self.locate()
    }

    /// Own name: a key, an index, or the root name.
    pub fn name(&mut self) -> Result<String> {
        let id = self.locate()?;
        Ok(self.root.tree().name(id))
    }

    /// Dot-joined path from the root, e.g. `mock.a.0`.
    pub fn qualified_name(&mut self) -> Result<String> {
        let id = self.locate()?;
        Ok(self.root.tree().qualified_name(id))
    }

    pub fn shape(&mut self) -> Result<Shape> {
        let id = self.locate()?;
        Ok(self.root.tree().children(id).shape())
    }

    /// Handle to a child container.
    pub fn child(&mut self, key: impl Into<Key>) -> Result<NodeMut<'_, S>> {
        let key = key.into();
        let id = self.locate()?;
        if !self.root.entry_is_node(id, &key)? {
            let path = qualify(&self.root.tree().qualified_name(id), &key);
            return Err(Error::not_a_node(path));
        }
        let mut keys = self.keys.clone();
        keys.push(key);
        Ok(NodeMut::new(&mut *self.root, keys))
    }

    pub fn get(&mut self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        let id = self.locate()?;
        self.root.get_at(id, &key)
    }

    pub fn get_as<T: DeserializeOwned>(&mut self, key: impl Into<Key>) -> Result<T> {
        Ok(serde_json::from_value(self.get(key)?)?)
    }

    /// Assign a child. Mappings accept new keys; sequences only existing
    /// indices. Assigning an equal value is a no-op.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let id = self.locate()?;
        self.root.set_at(id, key, value.into())
    }

    pub fn delete(&mut self, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        let id = self.locate()?;
        self.root.delete_at(id, key)
    }

    /// Apply a structural operation. Returns the removed element for
    /// `Remove` and `Pop`.
    pub fn apply(&mut self, op: StructuralOp) -> Result<Option<Value>> {
        let id = self.locate()?;
        self.root.apply_at(id, op)
    }

    pub fn append(&mut self, value: impl Into<Value>) -> Result<()> {
        self.apply(StructuralOp::Append(value.into())).map(drop)
    }

    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.apply(StructuralOp::Insert(index, value.into())).map(drop)
    }

    pub fn remove(&mut self, index: usize) -> Result<Value> {
        Ok(self
            .apply(StructuralOp::Remove(index))?
            .unwrap_or(Value::Null))
    }

    /// Remove and return the last element, `None` when empty.
    pub fn pop(&mut self) -> Result<Option<Value>> {
        self.apply(StructuralOp::Pop)
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) -> Result<()> {
        self.apply(StructuralOp::Extend(values.into_iter().collect()))
            .map(drop)
    }

    pub fn replace(&mut self, range: Range<usize>, values: Vec<Value>) -> Result<()> {
        self.apply(StructuralOp::Replace { range, values }).map(drop)
    }

    pub fn merge(&mut self, values: Map<String, Value>) -> Result<()> {
        self.apply(StructuralOp::Merge(values)).map(drop)
    }

    pub fn sort(&mut self) -> Result<()> {
        self.apply(StructuralOp::Sort).map(drop)
    }

    pub fn reverse(&mut self) -> Result<()> {
        self.apply(StructuralOp::Reverse).map(drop)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.apply(StructuralOp::Clear).map(drop)
    }

    pub fn len(&mut self) -> Result<usize> {
        let id = self.locate()?;
        Ok(self.root.tree().children(id).len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a key (mapping) or index (sequence) is present.
    pub fn contains(&mut self, key: impl Into<Key>) -> Result<bool> {
        let key = key.into();
        let id = self.locate()?;
        Ok(match self.root.tree().children(id) {
            Children::Map(map) => map.contains_key(&key.as_name()),
            Children::Seq(items) => matches!(key.as_index(""), Ok(i) if i < items.len()),
        })
    }

    /// Whether any child equals `value`.
    pub fn contains_value(&mut self, value: &Value) -> Result<bool> {
        let id = self.locate()?;
        let tree = self.root.tree();
        Ok(tree
            .children(id)
            .entries()
            .any(|entry| tree.entry_equals(entry, value)))
    }

    /// Keys of a mapping in order, or the indices of a sequence.
    pub fn keys(&mut self) -> Result<Vec<Key>> {
        let id = self.locate()?;
        Ok(match self.root.tree().children(id) {
            Children::Map(map) => map.keys().map(|k| Key::Name(k.clone())).collect(),
            Children::Seq(items) => (0..items.len()).map(Key::Index).collect(),
        })
    }

    pub fn values(&mut self) -> Result<Vec<Value>> {
        let id = self.locate()?;
        let tree = self.root.tree();
        Ok(tree
            .children(id)
            .entries()
            .map(|entry| tree.materialize_entry(entry))
            .collect())
    }

    pub fn entries(&mut self) -> Result<Vec<(Key, Value)>> {
        let keys = self.keys()?;
        let values = self.values()?;
        Ok(keys.into_iter().zip(values).collect())
    }

    /// Materialized copy of this node.
    pub fn to_basic(&mut self) -> Result<Value> {
        let id = self.locate()?;
        Ok(self.root.tree().materialize(id))
    }

    fn flag(&mut self, flag: Flag) -> Result<bool> {
        let id = self.locate()?;
        Ok(self.root.tree().flags(id).get(flag))
    }

    fn set_flag(&mut self, flag: Flag, value: bool) -> Result<()> {
        let id = self.locate()?;
        self.root.set_flag_at(id, flag, value);
        Ok(())
    }

    pub fn mutable(&mut self) -> Result<bool> {
        self.flag(Flag::Mutable)
    }

    pub fn save(&mut self) -> Result<bool> {
        self.flag(Flag::Save)
    }

    pub fn reload(&mut self) -> Result<bool> {
        self.flag(Flag::Reload)
    }

    /// Set `mutable` on this node and everything below it.
    pub fn set_mutable(&mut self, value: bool) -> Result<()> {
        self.set_flag(Flag::Mutable, value)
    }

    /// Set `save` on this node and everything below it.
    pub fn set_save(&mut self, value: bool) -> Result<()> {
        self.set_flag(Flag::Save, value)
    }

    /// Set `reload` on this node and everything below it. A node with
    /// `reload` off keeps its state across reloads.
    pub fn set_reload(&mut self, value: bool) -> Result<()> {
        self.set_flag(Flag::Reload, value)
    }

    /// Whether writes here are permitted, counting ancestors.
    pub fn is_writable(&mut self) -> Result<bool> {
        let id = self.locate()?;
        Ok(self.root.tree().is_writable(id))
    }
}

impl<S: Store> std::fmt::Debug for NodeMut<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMut").field("keys", &self.keys).finish()
    }
}
