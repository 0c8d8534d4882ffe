use std::path::{Path, PathBuf};

use crate::{
    cli::command_handlers::{
        do_add, do_check, do_explain, do_graph, do_init, do_list, do_status, do_tidy,
        do_upgrade,
        ManifestEdit, TidyOutcome, UpgradeOutcome,
    },
    git::GitRemote,
    model::manifest::Manifest,
    report::{Explanation, Graph, ListRow, OutdatedRow, StatusRow},
    resolver::{Resolver, Vcs},
};

mod builder;

pub use builder::CpkgBuilder;

pub struct Cpkg<V = GitRemote> {
    resolver: Resolver<V>,
    root: PathBuf,
    manifest_file_name: PathBuf,
    lock_file_name: PathBuf,
    dep_root: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TidyMode {
    /// Report whether the lock file is up to date without touching it. This
    /// mode should be normally used on CI.
    Check,
    /// Write the lock file if it changed.
    Write,
}

impl Cpkg {
    pub fn builder() -> CpkgBuilder {
        CpkgBuilder::default()
    }
}

impl<V: Vcs + 'static> Cpkg<V> {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the manifest for a new project.
    pub fn init(&self, module: Option<String>, dep_root: Option<String>) -> anyhow::Result<Manifest> {
        do_init(
            &self.root,
            &self.manifest_file_name,
            module,
            dep_root.or_else(|| self.dep_root.clone()),
        )
    }

    /// Adds or updates `module@version` requirements in the manifest.
    pub fn add(&self, specs: &[String]) -> anyhow::Result<Vec<ManifestEdit>> {
        do_add(&self.root, &self.manifest_file_name, specs)
    }

    /// Resolves the manifest and creates, updates or verifies the lock file.
    pub async fn tidy(&self, mode: TidyMode) -> anyhow::Result<TidyOutcome> {
        do_tidy(
            &self.resolver,
            &self.root,
            &self.manifest_file_name,
            &self.lock_file_name,
            self.dep_root.as_deref(),
            mode,
        )
        .await
    }

    /// Moves dependencies to the latest versions their constraints allow.
    pub async fn upgrade(&self, all: bool) -> anyhow::Result<UpgradeOutcome> {
        do_upgrade(
            &self.resolver,
            &self.root,
            &self.manifest_file_name,
            &self.lock_file_name,
            self.dep_root.as_deref(),
            all,
        )
        .await
    }

    /// Returns the manifest dependencies and whether a lock file exists.
    pub fn list(&self) -> anyhow::Result<(Vec<ListRow>, bool)> {
        do_list(&self.root, &self.manifest_file_name, &self.lock_file_name)
    }

    pub async fn check(&self) -> anyhow::Result<Vec<OutdatedRow>> {
        do_check(
            &self.resolver,
            &self.root,
            &self.manifest_file_name,
            &self.lock_file_name,
        )
        .await
    }

    /// The locked dependency graph.
    pub fn graph(&self) -> anyhow::Result<Graph> {
        do_graph(&self.root, &self.lock_file_name)
    }

    pub fn explain(&self, module: &str) -> anyhow::Result<Explanation> {
        do_explain(
            &self.root,
            &self.manifest_file_name,
            &self.lock_file_name,
            module,
        )
    }

    pub fn status(&self) -> anyhow::Result<Option<Vec<StatusRow>>> {
        do_status(&self.root, &self.manifest_file_name, &self.lock_file_name)
    }
}
