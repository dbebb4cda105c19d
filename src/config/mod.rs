//! Root options and their configuration tiers.
//!
//! Options are merged field-by-field from:
//! 1. **Defaults** - `RootOptions::default()`
//! 2. **User** - `~/.hotmarkup/options.yaml`
//! 3. **File** - an explicit options file
//! 4. **Environment** - `HOTMARKUP_*` variables
//!
//! ## Environment Variables
//! - `HOTMARKUP_OPTIONS_PATH` - Explicit options file
//! - `HOTMARKUP_USER_DIR` - User options dir (default: `~/.hotmarkup`)
//! - `HOTMARKUP_NAME` - Root name
//! - `HOTMARKUP_MUTABLE`, `HOTMARKUP_SAVE`, `HOTMARKUP_RELOAD` - Root flags

mod loader;
mod merge;
mod types;

pub use loader::{ConfigPaths, ConfigTier, OptionsLoader, USER_OPTIONS_FILE};
pub use merge::{deep_merge, deep_merge_all};
pub use types::RootOptions;
