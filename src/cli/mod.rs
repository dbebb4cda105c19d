//! CLI command definitions for hotmarkup
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use crate::store::FileFormat;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Inspect and edit live configuration files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root options file (overrides HOTMARKUP_OPTIONS_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Document format (default: from the file extension)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<FileFormat>,

    /// Output format for printed values
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the whole document
    Show(FileArgs),

    /// Print the value at a dotted path
    Get(PathArgs),

    /// Assign a value at a dotted path
    Set(ValueArgs),

    /// Remove the entry at a dotted path
    Delete(PathArgs),

    /// Append a value to the sequence at a dotted path
    Append(ValueArgs),

    /// Sort a sequence, or the keys of a mapping
    Sort(SortArgs),

    /// Write a default document if the file is missing or empty
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Configuration file
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Configuration file
    pub file: PathBuf,

    /// Dotted path, e.g. `servers.0.host`
    pub path: String,
}

#[derive(Args, Debug)]
pub struct ValueArgs {
    /// Configuration file
    pub file: PathBuf,

    /// Dotted path, e.g. `servers.0.host`
    pub path: String,

    /// Value as JSON; anything that does not parse is taken as a string
    pub value: String,
}

impl ValueArgs {
    pub fn parsed_value(&self) -> Value {
        parse_value(&self.value)
    }
}

#[derive(Args, Debug)]
pub struct SortArgs {
    /// Configuration file
    pub file: PathBuf,

    /// Dotted path of the container (default: the root)
    #[arg(default_value = "")]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Configuration file
    pub file: PathBuf,

    /// Default document as JSON
    pub default: String,
}

/// Parse a command line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
