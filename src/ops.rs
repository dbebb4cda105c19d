//! Structural operations on containers.
//!
//! Bulk mutations (append, sort, slice assignment, concatenation, ...) are a
//! closed set of variants applied to a node's children. Whether an operation
//! counts as a mutation is decided afterwards by comparing the container's
//! content in order, so an operation that leaves it as it was emits nothing.

use crate::error::{Error, Result};
use crate::tree::{Children, Entry, Tree};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::ops::Range;

/// An in-place operation on a sequence or mapping node.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralOp {
    /// Push onto the end of a sequence.
    Append(Value),
    /// Insert before an index (`index == len` appends).
    Insert(usize, Value),
    /// Remove the element at an index.
    Remove(usize),
    /// Remove the last element; a no-op on an empty sequence.
    Pop,
    /// Concatenate values onto a sequence.
    Extend(Vec<Value>),
    /// Slice assignment: replace `range` with `values`.
    Replace { range: Range<usize>, values: Vec<Value> },
    /// Shallow update of a mapping.
    Merge(Map<String, Value>),
    /// Stable sort of sequence elements, or of mapping keys.
    Sort,
    /// Reverse element or key order.
    Reverse,
    /// Remove every child.
    Clear,
}

impl StructuralOp {
    /// Name used in `FUNC` mutation records.
    pub fn name(&self) -> &'static str {
        match self {
            StructuralOp::Append(_) => "append",
            StructuralOp::Insert(..) => "insert",
            StructuralOp::Remove(_) => "remove",
            StructuralOp::Pop => "pop",
            StructuralOp::Extend(_) => "extend",
            StructuralOp::Replace { .. } => "replace",
            StructuralOp::Merge(_) => "merge",
            StructuralOp::Sort => "sort",
            StructuralOp::Reverse => "reverse",
            StructuralOp::Clear => "clear",
        }
    }

    /// Run the operation on detached children. New values are inserted as
    /// raw entries; the caller re-wraps containers. Returns the removed
    /// entries for `Remove` and `Pop`.
    ///
    /// Validation happens before anything is touched, so an error leaves
    /// `children` unchanged.
    pub(crate) fn apply(
        self,
        children: &mut Children,
        tree: &Tree,
        path: &str,
    ) -> Result<Vec<Entry>> {
        let op = self.name();
        let out_of_range = |index: usize, len: usize| Error::IndexOutOfRange {
            path: path.to_string(),
            index,
            len,
        };
        let wrong = |found: &'static str| Error::WrongContainer {
            path: path.to_string(),
            op,
            found,
        };

        match children {
            Children::Seq(items) => match self {
                StructuralOp::Append(value) => {
                    items.push(Entry::Scalar(value));
                    Ok(Vec::new())
                }
                StructuralOp::Insert(index, value) => {
                    if index > items.len() {
                        return Err(out_of_range(index, items.len()));
                    }
                    items.insert(index, Entry::Scalar(value));
                    Ok(Vec::new())
                }
                StructuralOp::Remove(index) => {
                    if index >= items.len() {
                        return Err(out_of_range(index, items.len()));
                    }
                    Ok(vec![items.remove(index)])
                }
                StructuralOp::Pop => Ok(items.pop().into_iter().collect()),
                StructuralOp::Extend(values) => {
                    items.extend(values.into_iter().map(Entry::Scalar));
                    Ok(Vec::new())
                }
                StructuralOp::Replace { range, values } => {
                    if range.start > range.end {
                        return Err(out_of_range(range.start, items.len()));
                    }
                    if range.end > items.len() {
                        return Err(out_of_range(range.end, items.len()));
                    }
                    items
                        .splice(range, values.into_iter().map(Entry::Scalar))
                        .for_each(drop);
                    Ok(Vec::new())
                }
                StructuralOp::Sort => {
                    let mut keyed: Vec<(Value, Entry)> = items
                        .drain(..)
                        .map(|entry| (tree.materialize_entry(&entry), entry))
                        .collect();
                    keyed.sort_by(|a, b| compare_values(&a.0, &b.0));
                    items.extend(keyed.into_iter().map(|(_, entry)| entry));
                    Ok(Vec::new())
                }
                StructuralOp::Reverse => {
                    items.reverse();
                    Ok(Vec::new())
                }
                StructuralOp::Clear => {
                    items.clear();
                    Ok(Vec::new())
                }
                StructuralOp::Merge(_) => Err(wrong("sequence")),
            },
            Children::Map(map) => match self {
                StructuralOp::Merge(values) => {
                    for (key, value) in values {
                        map.insert(key, Entry::Scalar(value));
                    }
                    Ok(Vec::new())
                }
                StructuralOp::Sort => {
                    map.sort_keys();
                    Ok(Vec::new())
                }
                StructuralOp::Reverse => {
                    map.reverse();
                    Ok(Vec::new())
                }
                StructuralOp::Clear => {
                    map.clear();
                    Ok(Vec::new())
                }
                _ => Err(wrong("mapping")),
            },
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over skeleton values used by [`StructuralOp::Sort`].
///
/// Values of different types order as null < boolean < number < string <
/// sequence < mapping. Numbers compare numerically, sequences
/// lexicographically, mappings by their (key, value) pairs in order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((kx, vx), (ky, vy))| kx.cmp(ky).then_with(|| compare_values(vx, vy)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Flags;
    use serde_json::json;

    fn seq(tree: &Tree) -> Children {
        tree.children(tree.root()).clone()
    }

    fn run(value: Value, op: StructuralOp) -> (Tree, Result<Vec<Entry>>, Children) {
        let tree = Tree::build("mock", Flags::default(), value).unwrap();
        let mut children = seq(&tree);
        let result = op.apply(&mut children, &tree, "mock");
        (tree, result, children)
    }

    fn scalars(children: &Children) -> Vec<Value> {
        children
            .entries()
            .map(|e| match e {
                Entry::Scalar(v) => v.clone(),
                Entry::Node(_) => json!("<node>"),
            })
            .collect()
    }

    #[test]
    fn test_sort_sequence() {
        let (_, result, children) = run(json!([3, 1, 2, 0]), StructuralOp::Sort);
        assert!(result.unwrap().is_empty());
        assert_eq!(scalars(&children), vec![json!(0), json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_sort_orders_nodes_by_contents() {
        let (tree, result, children) = run(json!([{"b": 2}, {"a": 1}, 5]), StructuralOp::Sort);
        result.unwrap();
        let values: Vec<Value> = children.entries().map(|e| tree.materialize_entry(e)).collect();
        assert_eq!(values, vec![json!(5), json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_replace_slice() {
        let (_, result, children) = run(
            json!([0, 1, 2, 3, 4]),
            StructuralOp::Replace {
                range: 1..3,
                values: vec![json!("x")],
            },
        );
        result.unwrap();
        assert_eq!(scalars(&children), vec![json!(0), json!("x"), json!(3), json!(4)]);
    }

    #[test]
    fn test_out_of_range_leaves_children_untouched() {
        let (_, result, children) = run(json!([0, 1]), StructuralOp::Insert(3, json!(9)));
        assert!(matches!(
            result.unwrap_err(),
            Error::IndexOutOfRange { index: 3, len: 2, .. }
        ));
        assert_eq!(scalars(&children), vec![json!(0), json!(1)]);

        let (_, result, _) = run(
            json!([0, 1]),
            StructuralOp::Replace {
                range: 1..5,
                values: vec![],
            },
        );
        assert!(matches!(result.unwrap_err(), Error::IndexOutOfRange { .. }));
    }

    #[test]
    fn test_remove_and_pop_return_entries() {
        let (_, result, children) = run(json!([0, 1, 2]), StructuralOp::Remove(1));
        assert_eq!(result.unwrap(), vec![Entry::Scalar(json!(1))]);
        assert_eq!(scalars(&children), vec![json!(0), json!(2)]);

        let (_, result, _) = run(json!([]), StructuralOp::Pop);
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_wrong_container() {
        let (_, result, _) = run(json!({"a": 1}), StructuralOp::Append(json!(2)));
        assert!(matches!(
            result.unwrap_err(),
            Error::WrongContainer {
                op: "append",
                found: "mapping",
                ..
            }
        ));
        let (_, result, _) = run(json!([1]), StructuralOp::Merge(Map::new()));
        assert!(matches!(result.unwrap_err(), Error::WrongContainer { .. }));
    }

    #[test]
    fn test_map_sort_and_merge() {
        let (_, result, children) = run(json!({"b": 1, "a": 2}), StructuralOp::Sort);
        result.unwrap();
        match children {
            Children::Map(map) => {
                let keys: Vec<&String> = map.keys().collect();
                assert_eq!(keys, ["a", "b"]);
            }
            Children::Seq(_) => panic!("expected a mapping"),
        }

        let mut update = Map::new();
        update.insert("b".to_string(), json!(1));
        update.insert("c".to_string(), json!(3));
        let (_, result, children) = run(json!({"b": 1}), StructuralOp::Merge(update));
        result.unwrap();
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_compare_values_across_types() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1])), Ordering::Greater);
        assert_eq!(compare_values(&json!("z"), &json!([0])), Ordering::Less);
    }
}
