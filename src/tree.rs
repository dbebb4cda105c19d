//! Node arena for a configuration tree.
//!
//! Nodes live in a slot vector owned by the tree and are addressed by
//! [`NodeId`]. Slot 0 is always the root, whose parent is itself. Only a
//! parent's [`Children`] hold a child's id, so ownership stays tree shaped;
//! nodes that fall out of the tree are reclaimed by [`Tree::collect_garbage`].

use crate::error::{Error, Result};
use crate::path::{Key, qualify};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Stable index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// Per-node flags, inherited from the parent when a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// Writes are permitted below this node.
    pub mutable: bool,
    /// Mutations below this node trigger persistence.
    pub save: bool,
    /// This node is rebuilt when the store changes.
    pub reload: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            mutable: true,
            save: true,
            reload: true,
        }
    }
}

/// Selects one of the [`Flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Mutable,
    Save,
    Reload,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Mutable => self.mutable,
            Flag::Save => self.save,
            Flag::Reload => self.reload,
        }
    }

    fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Mutable => self.mutable = value,
            Flag::Save => self.save = value,
            Flag::Reload => self.reload = value,
        }
    }
}

/// Container shape of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Map,
    Seq,
}

impl Shape {
    /// Shape of a skeleton value, `None` for scalars.
    pub fn of(value: &Value) -> Option<Shape> {
        match value {
            Value::Object(_) => Some(Shape::Map),
            Value::Array(_) => Some(Shape::Seq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Map => "mapping",
            Shape::Seq => "sequence",
        }
    }

    fn empty_value(&self) -> Value {
        match self {
            Shape::Map => Value::Object(Map::new()),
            Shape::Seq => Value::Array(Vec::new()),
        }
    }
}

/// Short description of a skeleton value's type, for error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "mapping",
        Value::Array(_) => "sequence",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// One child slot: a leaf value or an owned child node.
///
/// A `Scalar` holding a container only exists transiently while a
/// structural operation runs; [`Tree::rewrap`] turns it into a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Scalar(Value),
    Node(NodeId),
}

/// Children of a node.
#[derive(Debug, Clone)]
pub enum Children {
    Map(IndexMap<String, Entry>),
    Seq(Vec<Entry>),
}

impl Children {
    pub fn shape(&self) -> Shape {
        match self {
            Children::Map(_) => Shape::Map,
            Children::Seq(_) => Shape::Seq,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Children::Map(map) => map.len(),
            Children::Seq(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Box<dyn Iterator<Item = &Entry> + '_> {
        match self {
            Children::Map(map) => Box::new(map.values()),
            Children::Seq(items) => Box::new(items.iter()),
        }
    }

    /// Ids of the direct child nodes.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.entries()
            .filter_map(|entry| match entry {
                Entry::Node(id) => Some(*id),
                Entry::Scalar(_) => None,
            })
            .collect()
    }

    fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Map => Children::Map(IndexMap::new()),
            Shape::Seq => Children::Seq(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: NodeId,
    flags: Flags,
    children: Children,
}

/// A child carried across a reload.
enum Carry {
    /// `reload = false`: kept verbatim.
    Exempt,
    /// Rebuilt, but has an exempt node somewhere below it.
    Nested,
}

/// Position of a node inside its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    Key(String),
    Index(usize),
}

/// The arena holding every node of one configuration tree.
#[derive(Debug)]
pub struct Tree {
    name: String,
    nodes: Vec<Option<NodeData>>,
    free: Vec<usize>,
}

impl Tree {
    /// Build a tree from its first skeleton. Nothing is carried on the
    /// first load.
    pub fn build(name: impl Into<String>, flags: Flags, skeleton: Value) -> Result<Self> {
        let mut tree = Self {
            name: name.into(),
            nodes: vec![Some(NodeData {
                parent: NodeId::ROOT,
                flags,
                children: Children::empty(Shape::Map),
            })],
            free: Vec::new(),
        };
        tree.reload(skeleton)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root_name(&self) -> &str {
        &self.name
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        match self.nodes.get(id.0) {
            Some(Some(data)) => data,
            _ => unreachable!("dangling node id {:?}", id),
        }
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        match self.nodes.get_mut(id.0) {
            Some(Some(data)) => data,
            _ => unreachable!("dangling node id {:?}", id),
        }
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.data(id).parent
    }

    pub fn flags(&self, id: NodeId) -> Flags {
        self.data(id).flags
    }

    pub fn children(&self, id: NodeId) -> &Children {
        &self.data(id).children
    }

    pub fn children_mut(&mut self, id: NodeId) -> &mut Children {
        &mut self.data_mut(id).children
    }

    pub(crate) fn replace_children(&mut self, id: NodeId, children: Children) -> Children {
        std::mem::replace(&mut self.data_mut(id).children, children)
    }

    fn alloc(&mut self, parent: NodeId, flags: Flags, children: Children) -> NodeId {
        let data = Some(NodeData {
            parent,
            flags,
            children,
        });
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = data;
                NodeId(slot)
            }
            None => {
                self.nodes.push(data);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Free every slot not reachable from the root.
    pub fn collect_garbage(&mut self) {
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            if reachable[id.0] {
                continue;
            }
            reachable[id.0] = true;
            stack.extend(self.children(id).node_ids());
        }
        for (slot, live) in reachable.into_iter().enumerate() {
            if !live && self.nodes[slot].is_some() {
                self.nodes[slot] = None;
                self.free.push(slot);
            }
        }
    }

    fn position(&self, id: NodeId) -> Option<Position> {
        if id == NodeId::ROOT {
            return None;
        }
        let target = Entry::Node(id);
        match self.children(self.parent(id)) {
            Children::Map(map) => map
                .iter()
                .find(|(_, e)| **e == target)
                .map(|(k, _)| Position::Key(k.clone())),
            Children::Seq(items) => items
                .iter()
                .position(|e| *e == target)
                .map(Position::Index),
        }
    }

    /// Path segment addressing this node from its parent.
    pub fn name(&self, id: NodeId) -> String {
        match self.position(id) {
            None => self.name.clone(),
            Some(Position::Key(k)) => k,
            Some(Position::Index(i)) => i.to_string(),
        }
    }

    /// Dot-joined path from the root, starting with the root's name.
    pub fn qualified_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while current != NodeId::ROOT {
            segments.push(self.name(current));
            current = self.parent(current);
        }
        segments.push(self.name.clone());
        segments.reverse();
        segments.join(".")
    }

    /// A node accepts writes only when it and all of its ancestors are mutable.
    pub fn is_writable(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if !self.flags(current).mutable {
                return false;
            }
            if current == NodeId::ROOT {
                return true;
            }
            current = self.parent(current);
        }
    }

    /// Set a flag on a node and on every node currently below it.
    pub fn set_flag(&mut self, id: NodeId, flag: Flag, value: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let data = self.data_mut(current);
            data.flags.set(flag, value);
            stack.extend(data.children.node_ids());
        }
    }

    fn has_exempt_below(&self, id: NodeId) -> bool {
        self.children(id)
            .node_ids()
            .into_iter()
            .any(|child| !self.flags(child).reload || self.has_exempt_below(child))
    }

    /// Look up one key in a node.
    pub fn lookup(&self, id: NodeId, key: &Key) -> Result<&Entry> {
        let path = qualify(&self.qualified_name(id), key);
        match self.children(id) {
            Children::Map(map) => map
                .get(&key.as_name())
                .ok_or_else(|| Error::key_not_found(&path)),
            Children::Seq(items) => {
                let index = key.as_index(&path)?;
                items.get(index).ok_or(Error::IndexOutOfRange {
                    path,
                    index,
                    len: items.len(),
                })
            }
        }
    }

    /// Follow keys from `start` down to a node.
    pub fn resolve_from(&self, start: NodeId, keys: &[Key]) -> Result<NodeId> {
        let mut current = start;
        for key in keys {
            current = match self.lookup(current, key)? {
                Entry::Node(child) => *child,
                Entry::Scalar(_) => {
                    return Err(Error::not_a_node(qualify(
                        &self.qualified_name(current),
                        key,
                    )));
                }
            };
        }
        Ok(current)
    }

    pub fn resolve(&self, keys: &[Key]) -> Result<NodeId> {
        self.resolve_from(NodeId::ROOT, keys)
    }

    /// Wrap a skeleton value as an entry under `parent`. Containers become
    /// new nodes inheriting the parent's flags.
    pub fn wrap(&mut self, parent: NodeId, value: Value) -> Entry {
        let flags = self.flags(parent);
        match value {
            Value::Object(map) => {
                let id = self.alloc(parent, flags, Children::empty(Shape::Map));
                let children = map.into_iter().map(|(k, v)| (k, self.wrap(id, v))).collect();
                self.data_mut(id).children = Children::Map(children);
                Entry::Node(id)
            }
            Value::Array(items) => {
                let id = self.alloc(parent, flags, Children::empty(Shape::Seq));
                let children = items.into_iter().map(|v| self.wrap(id, v)).collect();
                self.data_mut(id).children = Children::Seq(children);
                Entry::Node(id)
            }
            scalar => Entry::Scalar(scalar),
        }
    }

    /// Turn raw container entries of a node into child nodes.
    pub fn rewrap(&mut self, id: NodeId) {
        let mut children = self.replace_children(id, Children::empty(Shape::Map));
        let raw =
            |entry: &Entry| matches!(entry, Entry::Scalar(Value::Object(_) | Value::Array(_)));
        match &mut children {
            Children::Map(map) => {
                for entry in map.values_mut().filter(|e| raw(e)) {
                    let taken = std::mem::replace(entry, Entry::Scalar(Value::Null));
                    if let Entry::Scalar(value) = taken {
                        *entry = self.wrap(id, value);
                    }
                }
            }
            Children::Seq(items) => {
                for entry in items.iter_mut().filter(|e| raw(e)) {
                    let taken = std::mem::replace(entry, Entry::Scalar(Value::Null));
                    if let Entry::Scalar(value) = taken {
                        *entry = self.wrap(id, value);
                    }
                }
            }
        }
        self.data_mut(id).children = children;
    }

    /// Convert a node back to its skeleton shape.
    pub fn materialize(&self, id: NodeId) -> Value {
        match self.children(id) {
            Children::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, e)| (k.clone(), self.materialize_entry(e)))
                    .collect(),
            ),
            Children::Seq(items) => {
                Value::Array(items.iter().map(|e| self.materialize_entry(e)).collect())
            }
        }
    }

    pub fn materialize_entry(&self, entry: &Entry) -> Value {
        match entry {
            Entry::Scalar(value) => value.clone(),
            Entry::Node(id) => self.materialize(*id),
        }
    }

    /// Whether an entry already holds `value`.
    pub fn entry_equals(&self, entry: &Entry, value: &Value) -> bool {
        match entry {
            Entry::Scalar(current) => current == value,
            Entry::Node(id) => Shape::of(value).is_some() && self.materialize(*id) == *value,
        }
    }

    /// Whether two child sets hold the same content, order included. Entries
    /// are equal when they are the same entry or materialize to the same
    /// value, so a container re-inserted as a fresh node still matches.
    pub fn same_content(&self, a: &Children, b: &Children) -> bool {
        let same = |x: &Entry, y: &Entry| {
            x == y || same_value(&self.materialize_entry(x), &self.materialize_entry(y))
        };
        match (a, b) {
            (Children::Map(a), Children::Map(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, ea), (kb, eb))| ka == kb && same(ea, eb))
            }
            (Children::Seq(a), Children::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same(x, y))
            }
            _ => false,
        }
    }

    /// Whether a node or anything below it has `mutable` off.
    pub fn contains_read_only(&self, id: NodeId) -> bool {
        !self.flags(id).mutable
            || self
                .children(id)
                .node_ids()
                .into_iter()
                .any(|child| self.contains_read_only(child))
    }

    /// Replace the root's children from a freshly loaded skeleton, carrying
    /// over reload-exempt subtrees. All or nothing: on error the tree is
    /// left exactly as it was.
    pub fn reload(&mut self, skeleton: Value) -> Result<()> {
        let root = NodeId::ROOT;
        let previous = self.children(root).clone();
        let path = self.name.clone();
        let mut reparent = Vec::new();
        match self.rebuild(root, &previous, skeleton, &path, &mut reparent) {
            Ok(children) => {
                self.data_mut(root).children = children;
                for (child, parent) in reparent {
                    self.data_mut(child).parent = parent;
                }
                self.collect_garbage();
                Ok(())
            }
            Err(err) => {
                self.collect_garbage();
                Err(err)
            }
        }
    }

    fn carried(&self, previous: &Children) -> Vec<(Position, NodeId, Carry)> {
        let classify = |id: NodeId| {
            if !self.flags(id).reload {
                Some(Carry::Exempt)
            } else if self.has_exempt_below(id) {
                Some(Carry::Nested)
            } else {
                None
            }
        };
        match previous {
            Children::Map(map) => map
                .iter()
                .filter_map(|(k, e)| match e {
                    Entry::Node(id) => classify(*id).map(|c| (Position::Key(k.clone()), *id, c)),
                    Entry::Scalar(_) => None,
                })
                .collect(),
            Children::Seq(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, e)| match e {
                    Entry::Node(id) => classify(*id).map(|c| (Position::Index(i), *id, c)),
                    Entry::Scalar(_) => None,
                })
                .collect(),
        }
    }

    /// Build the children of `node` from `skeleton`. Carried nodes are
    /// recorded in `reparent` but not touched until the caller commits.
    fn rebuild(
        &mut self,
        node: NodeId,
        previous: &Children,
        skeleton: Value,
        path: &str,
        reparent: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<Children> {
        let carried = self.carried(previous);
        let found = Shape::of(&skeleton);
        if !carried.is_empty() && found != Some(previous.shape()) {
            return Err(Error::ShapeMismatch {
                path: path.to_string(),
                expected: previous.shape().as_str(),
                found: describe(&skeleton),
            });
        }

        let mut placed = vec![false; carried.len()];
        let carried_at = |position: &Position| carried.iter().position(|(p, _, _)| p == position);

        let mut children = match skeleton {
            Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    let entry = match carried_at(&Position::Key(key.clone())) {
                        Some(i) => {
                            placed[i] = true;
                            let at = qualify(path, &key);
                            self.carry(node, &carried[i], Some(value), &at, reparent)?
                        }
                        None => self.wrap(node, value),
                    };
                    out.insert(key, entry);
                }
                Children::Map(out)
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, value) in items.into_iter().enumerate() {
                    let entry = match carried_at(&Position::Index(index)) {
                        Some(i) => {
                            placed[i] = true;
                            let at = qualify(path, index);
                            self.carry(node, &carried[i], Some(value), &at, reparent)?
                        }
                        None => self.wrap(node, value),
                    };
                    out.push(entry);
                }
                Children::Seq(out)
            }
            scalar => {
                return Err(Error::InvalidSkeleton {
                    found: describe(&scalar),
                });
            }
        };

        // Carried positions the new skeleton no longer has
        for (i, carry) in carried.iter().enumerate() {
            if placed[i] {
                continue;
            }
            match (&mut children, &carry.0) {
                (Children::Map(map), Position::Key(key)) => {
                    let entry = self.carry(node, carry, None, &qualify(path, key), reparent)?;
                    map.insert(key.clone(), entry);
                }
                (Children::Seq(items), Position::Index(_)) => {
                    let at = items.len();
                    let entry = self.carry(node, carry, None, &qualify(path, at), reparent)?;
                    items.push(entry);
                }
                // Shapes were checked above
                _ => unreachable!("carried position does not match container shape"),
            }
        }
        Ok(children)
    }

    /// Produce the entry for a carried position. `incoming` is the new
    /// skeleton's value there, if any.
    fn carry(
        &mut self,
        parent: NodeId,
        (_, old, carry): &(Position, NodeId, Carry),
        incoming: Option<Value>,
        path: &str,
        reparent: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<Entry> {
        match carry {
            Carry::Exempt => {
                reparent.push((*old, parent));
                Ok(Entry::Node(*old))
            }
            Carry::Nested => {
                let previous = self.children(*old).clone();
                let skeleton = incoming.unwrap_or_else(|| previous.shape().empty_value());
                let flags = self.flags(parent);
                let fresh = self.alloc(parent, flags, Children::empty(previous.shape()));
                let children = self.rebuild(fresh, &previous, skeleton, path, reparent)?;
                self.data_mut(fresh).children = children;
                Ok(Entry::Node(fresh))
            }
        }
    }
}

/// Value equality that also compares mapping key order.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && same_value(va, vb))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(x, y))
        }
        _ => a == b,
    }
}
