//! Options loader with tier-based merging.
//!
//! Loads root options from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::RootOptions;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name looked up in the user directory.
pub const USER_OPTIONS_FILE: &str = "options.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// User-level options (~/.hotmarkup/options.yaml)
    User = 1,
    /// Explicit options file (--options or HOTMARKUP_OPTIONS_PATH)
    File = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::File => write!(f, "file"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each file tier lives.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User-level directory holding `options.yaml`
    pub user_dir: Option<PathBuf>,
    /// Explicit options file
    pub options_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover paths from the environment and the home directory.
    pub fn discover() -> Self {
        // User dir: HOTMARKUP_USER_DIR or ~/.hotmarkup
        let user_dir = std::env::var("HOTMARKUP_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".hotmarkup")));

        let options_file = std::env::var("HOTMARKUP_OPTIONS_PATH")
            .ok()
            .map(PathBuf::from);

        Self {
            user_dir,
            options_file,
        }
    }

    pub fn with_paths(user_dir: Option<PathBuf>, options_file: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            options_file,
        }
    }
}

/// Loads [`RootOptions`] from every tier.
#[derive(Debug, Clone)]
pub struct OptionsLoader {
    pub paths: ConfigPaths,
    options: RootOptions,
    /// Tiers that contributed, lowest first
    sources: Vec<ConfigTier>,
}

impl OptionsLoader {
    /// Load options from all tiers using the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    /// Load options with an explicit environment lookup.
    pub fn load_with_env(paths: ConfigPaths, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut layers: Vec<Value> = Vec::new();
        let mut sources = vec![ConfigTier::Defaults];

        // Tier 1: Defaults
        layers.push(serde_json::to_value(RootOptions::default())?);

        // Tier 2: User options; unreadable files are skipped
        if let Some(ref user_dir) = paths.user_dir {
            let file = user_dir.join(USER_OPTIONS_FILE);
            if file.exists() {
                match read_yaml(&file) {
                    Ok(value) => {
                        layers.push(value);
                        sources.push(ConfigTier::User);
                    }
                    Err(e) => warn!("Skipping user options {}: {:#}", file.display(), e),
                }
            }
        }

        // Tier 3: Explicit file; errors here are the caller's to see
        if let Some(ref file) = paths.options_file {
            layers.push(read_yaml(file)?);
            sources.push(ConfigTier::File);
        }

        let merged = deep_merge_all(layers);
        let mut options: RootOptions = serde_json::from_value(merged)?;

        // Tier 4: Environment
        if apply_env_overrides(&mut options, env)? {
            sources.push(ConfigTier::Environment);
        }
        debug!("Loaded root options from {:?}: {:?}", sources, options);

        Ok(Self {
            paths,
            options,
            sources,
        })
    }

    pub fn options(&self) -> &RootOptions {
        &self.options
    }

    pub fn into_options(self) -> RootOptions {
        self.options
    }

    pub fn sources(&self) -> &[ConfigTier] {
        &self.sources
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    // An empty file contributes nothing
    Ok(value)
}

/// Apply `HOTMARKUP_*` overrides. Returns whether any was set.
fn apply_env_overrides(
    options: &mut RootOptions,
    env: impl Fn(&str) -> Option<String>,
) -> Result<bool> {
    let mut applied = false;

    if let Some(name) = env("HOTMARKUP_NAME") {
        options.name = name;
        applied = true;
    }

    for (key, slot) in [
        ("HOTMARKUP_MUTABLE", &mut options.mutable),
        ("HOTMARKUP_SAVE", &mut options.save),
        ("HOTMARKUP_RELOAD", &mut options.reload),
    ] {
        if let Some(raw) = env(key) {
            *slot = parse_bool(key, &raw)?;
            applied = true;
        }
    }

    Ok(applied)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be a boolean, got '{}'", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_paths(Some(temp.path().join("user")), None);

        let loader = OptionsLoader::load_with_env(paths, no_env).unwrap();
        assert_eq!(loader.options(), &RootOptions::default());
        assert_eq!(loader.sources(), &[ConfigTier::Defaults]);
    }

    #[test]
    fn test_file_overrides_user() {
        let temp = TempDir::new().unwrap();
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::write(user_dir.join(USER_OPTIONS_FILE), "name: from-user\nsave: false\n").unwrap();
        let options_file = temp.path().join("explicit.yaml");
        std::fs::write(&options_file, "name: from-file\n").unwrap();

        let paths = ConfigPaths::with_paths(Some(user_dir), Some(options_file));
        let loader = OptionsLoader::load_with_env(paths, no_env).unwrap();

        // name from the explicit file, save from the user tier
        assert_eq!(loader.options().name, "from-file");
        assert!(!loader.options().save);
        assert_eq!(
            loader.sources(),
            &[ConfigTier::Defaults, ConfigTier::User, ConfigTier::File]
        );
    }

    #[test]
    fn test_broken_user_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(USER_OPTIONS_FILE), "save: [unclosed\n").unwrap();
        let paths = ConfigPaths::with_paths(Some(temp.path().to_path_buf()), None);

        let loader = OptionsLoader::load_with_env(paths, no_env).unwrap();
        assert!(loader.options().save);
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_paths(None, Some(temp.path().join("absent.yaml")));
        assert!(OptionsLoader::load_with_env(paths, no_env).is_err());
    }

    #[test]
    fn test_env_overrides_everything() {
        let temp = TempDir::new().unwrap();
        let options_file = temp.path().join("explicit.yaml");
        std::fs::write(&options_file, "reload: true\n").unwrap();
        let env: HashMap<&str, &str> = [("HOTMARKUP_RELOAD", "off"), ("HOTMARKUP_NAME", "env")]
            .into_iter()
            .collect();

        let paths = ConfigPaths::with_paths(None, Some(options_file));
        let loader =
            OptionsLoader::load_with_env(paths, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(!loader.options().reload);
        assert_eq!(loader.options().name, "env");
        assert_eq!(loader.sources().last(), Some(&ConfigTier::Environment));
    }

    #[test]
    fn test_bad_env_boolean_errors() {
        let paths = ConfigPaths::default();
        let result = OptionsLoader::load_with_env(paths, |k| {
            (k == "HOTMARKUP_SAVE").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }
}
