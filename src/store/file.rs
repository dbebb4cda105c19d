//! File-backed store for JSON and YAML documents.

use super::Store;
use crate::config::deep_merge;
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Serialization format of a file store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl FileFormat {
    /// Format named by a file extension, case-insensitive.
    pub fn from_extension(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            FileFormat::Json => Ok(serde_json::from_str(content)?),
            FileFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }

    pub fn render(&self, value: &Value) -> Result<String> {
        match self {
            FileFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            FileFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}

/// A store that keeps one document in one file.
///
/// The stamp is the file's modification time in nanoseconds.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: FileFormat,
    /// Deep-merged over every loaded document.
    overlay: Option<Value>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            overlay: None,
        }
    }

    /// Create a store, inferring the format from the extension.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(format) = FileFormat::from_path(&path) else {
            bail!(
                "Cannot infer format of {}: expected .json, .yaml or .yml",
                path.display()
            );
        };
        Ok(Self::new(path, format))
    }

    /// Write `default` if the file is missing or empty.
    pub fn with_default(self, default: Value) -> Result<Self> {
        let empty = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", self.path.display()));
            }
        };
        if empty {
            self.write(&default)?;
        }
        Ok(self)
    }

    /// Merge `overlay` over every loaded document.
    pub fn with_override(mut self, overlay: Value) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn write(&self, value: &Value) -> Result<()> {
        let content = self.format.render(value)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl Store for FileStore {
    type Stamp = u128;

    fn load(&self) -> Result<Value> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let value = self
            .format
            .parse(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(match self.overlay {
            Some(ref overlay) => deep_merge(value, overlay.clone()),
            None => value,
        })
    }

    fn dump(&mut self, skeleton: &Value) -> Result<()> {
        self.write(skeleton)
    }

    fn stamp(&self) -> Result<u128> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        Ok(modified.duration_since(UNIX_EPOCH)?.as_nanos())
    }
}
