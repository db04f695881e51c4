//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{PlanCommand, SyncCommand, VersionsCommand};
use std::ffi::OsString;

/// Upgrade report pipeline synthesiser
#[derive(Debug, Parser, Clone)]
#[command(name = "build-reports")]
#[command(version)]
#[command(about = "Builds the upgrade report pipeline from release channel versions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML report configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Synthesise the pipeline, reconcile it with the cluster and trigger a run
    Sync(SyncCommand),

    /// Synthesise the pipeline and print it without contacting the cluster
    Plan(PlanCommand),

    /// Print the admitted versions grouped by minor line
    Versions(VersionsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
