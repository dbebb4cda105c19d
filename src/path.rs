//! Dotted paths and keys.
//!
//! A path such as `servers.0.host` addresses an entry from the root. Each
//! segment is a mapping key or, under a sequence, a decimal index. Keys
//! containing dots can only be reached through [`NodeMut`](crate::NodeMut)
//! one segment at a time.

use crate::error::{Error, Result};
use std::fmt;

/// One path segment: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    /// Interpret this key as a sequence index.
    pub fn as_index(&self, path: &str) -> Result<usize> {
        match self {
            Key::Index(i) => Ok(*i),
            Key::Name(name) => name.parse().map_err(|_| Error::InvalidKey {
                path: path.to_string(),
                key: name.clone(),
            }),
        }
    }

    /// Interpret this key as a mapping key.
    pub fn as_name(&self) -> String {
        match self {
            Key::Name(name) => name.clone(),
            Key::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Name(s.clone())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

/// Split a dotted path into keys. The empty path addresses the root.
pub fn parse_path(path: &str) -> Vec<Key> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(Key::from).collect()
}

/// Split a path into its parent keys and its last key.
pub fn split_last(path: &str) -> Option<(Vec<Key>, Key)> {
    let mut keys = parse_path(path);
    let last = keys.pop()?;
    Some((keys, last))
}

/// Qualified name of a child entry.
pub fn qualify(parent: &str, key: impl fmt::Display) -> String {
    format!("{}.{}", parent, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        assert!(parse_path("").is_empty());
        assert_eq!(
            parse_path("a.0.b"),
            vec![Key::from("a"), Key::from("0"), Key::from("b")]
        );
    }

    #[test]
    fn test_split_last() {
        let (parents, last) = split_last("a.b").unwrap();
        assert_eq!(parents, vec![Key::from("a")]);
        assert_eq!(last, Key::from("b"));
        assert!(split_last("").is_none());
    }

    #[test]
    fn test_key_as_index() {
        assert_eq!(Key::from("3").as_index("mock").unwrap(), 3);
        assert_eq!(Key::from(4).as_index("mock").unwrap(), 4);
        let err = Key::from("x").as_index("mock.list").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("mock", "a"), "mock.a");
        assert_eq!(qualify("mock.c", 0), "mock.c.0");
    }
}
