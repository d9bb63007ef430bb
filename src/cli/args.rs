//! Command-line argument parsing for catsinit
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// catsinit - load the cats model and gear into Redis, once
#[derive(Parser, Debug)]
#[command(name = "catsinit")]
#[command(version)]
#[command(about = "Provision a RedisAI/RedisGears server with the cats model and gear", long_about = None)]
pub struct Args {
    /// Redis URL (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bootstrap (default)
    Run,

    /// Check connectivity, module versions and the flag without installing
    Check,

    /// Display the effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Subcommand, defaulting to `run`
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
