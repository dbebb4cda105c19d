//! Configuration types for opening a root.

use crate::tree::Flags;
use serde::{Deserialize, Serialize};

/// Options a root is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootOptions {
    /// Root name; first segment of every qualified name and the logger name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Writes permitted.
    #[serde(default = "default_true")]
    pub mutable: bool,

    /// Mutations persist the whole tree.
    #[serde(default = "default_true")]
    pub save: bool,

    /// Reads check the store's stamp and reload when it changed.
    #[serde(default = "default_true")]
    pub reload: bool,

    /// Remember the new stamp after a read-triggered reload. Off by default:
    /// only persistence refreshes the cached stamp, so a stale store is
    /// reloaded on every read until the next write.
    #[serde(default)]
    pub refresh_stamp_on_reload: bool,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            name: default_name(),
            mutable: true,
            save: true,
            reload: true,
            refresh_stamp_on_reload: false,
        }
    }
}

impl RootOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn with_refresh_stamp_on_reload(mut self, refresh: bool) -> Self {
        self.refresh_stamp_on_reload = refresh;
        self
    }

    /// Flags given to the root node.
    pub fn flags(&self) -> Flags {
        Flags {
            mutable: self.mutable,
            save: self.save,
            reload: self.reload,
        }
    }
}

fn default_name() -> String {
    "hotmarkup".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let options: RootOptions = serde_yaml::from_str("save: false\n").unwrap();
        assert_eq!(options.name, "hotmarkup");
        assert!(options.mutable);
        assert!(!options.save);
        assert!(options.reload);
        assert!(!options.refresh_stamp_on_reload);
    }

    #[test]
    fn test_builder_flags() {
        let options = RootOptions::named("mock").with_mutable(false).with_reload(false);
        assert_eq!(
            options.flags(),
            Flags {
                mutable: false,
                save: true,
                reload: false
            }
        );
    }
}
