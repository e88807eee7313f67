//! CLI definitions and plumbing.

use std::path::Path;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The workspace root; defaults to the current directory
    #[arg(short = 'w', long)]
    pub workspace: Option<Box<Path>>,
    /// The config file; defaults to `modweave.toml` in the workspace
    #[arg(short = 'c', long)]
    pub config: Option<Box<Path>>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the dependencies of a module
    Resolve {
        module: Box<str>,
        /// Include the transitive closure
        #[arg(short = 't', long)]
        transitive: bool,
        /// Include the resolved service providers
        #[arg(short = 'p', long)]
        providers: bool,
    },
    /// List cyclic dependency loops between workspace modules
    Cycles,
    /// Print the module owning a package
    Owner { package: Box<str> },
    /// List the providers of a service usable by a module
    Providers {
        service: Box<str>,
        #[arg(short = 'f', long = "for")]
        module: Box<str>,
    },
    /// List every discovered module in discovery order
    Modules,
}
