use std::path::PathBuf;

use clap::Parser;

use crate::model::module_path::Protocol;

/// Source-only dependency manager for C projects.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Project root. Defaults to the closest directory holding the manifest.
    #[clap(short, long, global = true)]
    pub root: Option<PathBuf>,
    /// Name of the manifest file
    #[clap(short, long, global = true, default_value = "cpkg.toml")]
    pub manifest_location: PathBuf,
    /// Name of the lock file
    #[clap(short, long, global = true, default_value = "cpkg.lock")]
    pub lockfile_location: PathBuf,
    /// Override the dependency root
    #[clap(long, global = true)]
    pub dep_root: Option<String>,
    /// Scheme used for host/owner/repo module paths (https or ssh)
    #[clap(long, global = true)]
    pub protocol: Option<Protocol>,
    /// Maximum number of dependencies resolved concurrently
    #[clap(short, long, global = true)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Creates a manifest in the project root
    Init {
        /// Module path of the project. Inferred from the origin remote when absent.
        #[clap(long)]
        module: Option<String>,
    },
    /// Adds or updates dependencies given as module@version
    Add {
        #[clap(required = true)]
        modules: Vec<String>,
    },
    /// Resolves the dependencies and writes the lock file
    Tidy {
        /// Check whether the lock file would change, without writing it
        #[clap(long)]
        check: bool,
    },
    /// Upgrades dependencies to the latest versions their constraints allow
    Upgrade {
        /// Re-resolve every dependency even if no update is available
        #[clap(long)]
        all: bool,
    },
    /// Lists the dependencies and their locked versions
    List,
    /// Checks the locked dependencies for newer compatible versions
    Check,
    /// Prints the locked dependency graph
    Graph,
    /// Shows everything known about one dependency
    Explain { module: String },
    /// Compares locked versions with the local checkouts
    Status,
}
