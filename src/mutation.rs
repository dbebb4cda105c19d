//! Mutation taxonomy.
//!
//! Every change to a tree is classified into one of four kinds and bubbled
//! to the root, which renders it into a log record and decides whether to
//! persist.

use crate::format::render_value;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Categories of mutations reported to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    /// A key that did not exist was added.
    New,
    /// An existing key or index got a different value.
    Update,
    /// A key or index was removed.
    Delete,
    /// A structural operation changed a container's contents.
    Func,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::New => "NEW",
            MutationKind::Update => "UPDATE",
            MutationKind::Delete => "DELETE",
            MutationKind::Func => "FUNC",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified change to the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    /// Qualified name of the affected entry (for `Func`, of the container).
    pub path: String,
    /// Structural operation name, set only for `Func`.
    pub op: Option<&'static str>,
    /// New value; the whole resulting container for `Func`, `None` for `Delete`.
    pub value: Option<Value>,
}

impl Mutation {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self::with_kind(MutationKind::New, path, Some(value))
    }

    pub fn update(path: impl Into<String>, value: Value) -> Self {
        Self::with_kind(MutationKind::Update, path, Some(value))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::with_kind(MutationKind::Delete, path, None)
    }

    pub fn func(path: impl Into<String>, op: &'static str, value: Value) -> Self {
        Self {
            kind: MutationKind::Func,
            path: path.into(),
            op: Some(op),
            value: Some(value),
        }
    }

    fn with_kind(kind: MutationKind, path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            kind,
            path: path.into(),
            op: None,
            value,
        }
    }

    /// Structured form attached to the log record.
    pub fn to_data(&self) -> Value {
        json!({
            "kind": self.kind,
            "path": self.path,
            "op": self.op,
            "value": self.value,
        })
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.as_ref().map(render_value).unwrap_or_default();
        match self.kind {
            MutationKind::Delete => write!(f, "{} {}", self.kind, self.path),
            MutationKind::New | MutationKind::Update => {
                write!(f, "{} {}={}", self.kind, self.path, value)
            }
            MutationKind::Func => write!(f, "{} {}; new value: {}", self.kind, self.path, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_each_kind() {
        assert_eq!(Mutation::new("mock.a", json!("b")).to_string(), "NEW mock.a=b");
        assert_eq!(Mutation::delete("mock.c.0").to_string(), "DELETE mock.c.0");
        assert_eq!(
            Mutation::update("mock.c.0", json!("e")).to_string(),
            "UPDATE mock.c.0=e"
        );
        assert_eq!(
            Mutation::func("mock.a", "sort", json!([0, 1, 2, 3])).to_string(),
            "FUNC mock.a; new value: [0, 1, 2, 3]"
        );
    }

    #[test]
    fn test_structured_data() {
        let data = Mutation::update("mock.a", json!(3)).to_data();
        assert_eq!(data["kind"], "UPDATE");
        assert_eq!(data["path"], "mock.a");
        assert_eq!(data["value"], 3);
        assert!(data["op"].is_null());

        let data = Mutation::func("mock.l", "append", json!([1])).to_data();
        assert_eq!(data["kind"], "FUNC");
        assert_eq!(data["op"], "append");
    }
}
