use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "license-audit",
    about = "Inventory project dependencies across ecosystems and audit their licenses",
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file [layered over ~/.license-audit.toml and ./.license-audit.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format [default: from config, else json]
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Report file; `-` writes to stdout [default: license-report.json / .md]
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory to scan, replacing the configured scan paths
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Run the license audit (`--audit=false` to only inventory)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub audit: Option<bool>,

    /// Fetch missing license data from package registries
    #[arg(long)]
    pub online: bool,

    /// Show all dependencies and progress logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default .license-audit.toml and .licignore
    Init {
        /// Directory to write into
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}
