//! CLI argument parsing for flowlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flowlock: inspect and repair task locks held in the shared cache.
///
/// Workers record cache locks as files under the configured cache
/// directory. Entries normally disappear when the work finishes; entries
/// left behind by crashed workers expire on their own and can be
/// listed, purged, or cleared here.
#[derive(Parser, Debug)]
#[command(name = "flowlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: flowlock.yaml in the current directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory, overriding `cache_dir` from the config.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for flowlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock management commands.
    ///
    /// List, clear, or purge cache lock entries.
    Lock(LockCommand),

    /// Print the effective configuration as YAML.
    Config,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all lock entries.
    ///
    /// Shows each entry with its owner, age, and expiry.
    List,

    /// Clear the lock of one process.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),

    /// Remove expired lock entries.
    Purge,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Flow label of the locked process (e.g., helpdesk).
    pub flow: String,

    /// Process key. Digits are read as an integer key unless --string-key is set.
    pub key: String,

    /// Treat the key as a string key even if it is all digits (e.g., "007").
    #[arg(long)]
    pub string_key: bool,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
