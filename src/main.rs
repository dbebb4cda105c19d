//! hotmarkup command line
//!
//! Opens a configuration file as a live tree and reads or edits it through
//! the same API a library caller would use.

use anyhow::{Context, Result};
use clap::Parser;
use hotmarkup::cli::{Cli, Command, parse_value};
use hotmarkup::config::{ConfigPaths, OptionsLoader};
use hotmarkup::logging::{LogLevel, Logger};
use hotmarkup::{FileStore, Root};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // --options takes precedence over HOTMARKUP_OPTIONS_PATH
    let mut paths = ConfigPaths::discover();
    if let Some(ref file) = cli.options {
        paths.options_file = Some(file.clone());
    }
    let options = OptionsLoader::load_with_paths(paths)?.into_options();
    debug!("Root options: {:?}", options);

    let output = cli.output;
    let format = cli.format;

    let logger = Logger::new();
    logger.level_filter().set(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let open_store = |file: &Path| -> Result<FileStore> {
        match format {
            Some(format) => Ok(FileStore::new(file, format)),
            None => FileStore::open(file),
        }
    };
    let open_root = |store: FileStore| -> Result<Root<FileStore>> {
        let path = store.path().display().to_string();
        Root::open_with_logger(store, options.clone(), logger.clone())
            .with_context(|| format!("Failed to open {}", path))
    };

    match cli.command {
        Command::Show(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            println!("{}", output.render(&root.to_basic()?)?);
        }
        Command::Get(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            println!("{}", output.render(&root.get(&args.path)?)?);
        }
        Command::Set(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            root.set(&args.path, args.parsed_value())?;
        }
        Command::Delete(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            root.delete(&args.path)?;
        }
        Command::Append(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            root.node(&args.path)?.append(args.parsed_value())?;
        }
        Command::Sort(args) => {
            let mut root = open_root(open_store(args.file.as_path())?)?;
            root.node(&args.path)?.sort()?;
        }
        Command::Init(args) => {
            let default = parse_value(&args.default);
            let store = open_store(args.file.as_path())?.with_default(default)?;
            let mut root = open_root(store)?;
            println!("{}", output.render(&root.to_basic()?)?);
        }
    }

    Ok(())
}
