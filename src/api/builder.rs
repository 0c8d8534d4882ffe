use std::{env, path::PathBuf, sync::Arc};

use crate::{
    config::CpkgConfig,
    git::GitRemote,
    model::{
        lock::LOCK_FILE_NAME,
        manifest::{find_project_root, MANIFEST_FILE_NAME},
        module_path::Protocol,
    },
    resolver::{ResolveOptions, Resolver, Vcs},
    Cpkg,
};

#[derive(Default)]
pub struct CpkgBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    manifest_file_name: Option<PathBuf>,
    lock_file_name: Option<PathBuf>,
    dep_root: Option<String>,
    protocol: Option<Protocol>,
    jobs: Option<usize>,
    config: Option<CpkgConfig>,
}

impl CpkgBuilder {
    /// Project root directory.
    ///
    /// Defaults to the closest ancestor of the current directory holding a
    /// manifest, or the current directory itself.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the manifest file.
    ///
    /// Defaults to `cpkg.toml`.
    pub fn manifest_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_file_name = Some(path.into());
        self
    }

    /// Name of the lock file.
    ///
    /// Defaults to `cpkg.lock`.
    pub fn lock_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file_name = Some(path.into());
        self
    }

    /// Directory dependencies are checked out under. Takes precedence over
    /// the configuration and the manifest's `dep_root`.
    pub fn dep_root(mut self, dep_root: impl Into<String>) -> Self {
        self.dep_root = Some(dep_root.into());
        self
    }

    /// Scheme used for bare `host/owner/repo` module paths.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Maximum number of dependencies resolved at the same time.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Use `config` instead of loading `~/.cpkg/config.toml` and `CPKG_*`
    /// variables.
    pub fn config(mut self, config: CpkgConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn try_build(self) -> anyhow::Result<Cpkg> {
        self.build_with(Arc::new(GitRemote::new()))
    }

    /// Builds with a custom version control backend.
    pub fn build_with<V: Vcs + 'static>(self, vcs: Arc<V>) -> anyhow::Result<Cpkg<V>> {
        let Self {
            root,
            manifest_file_name,
            lock_file_name,
            dep_root,
            protocol,
            jobs,
            config,
        } = self;
        let root = match root {
            Some(root) => root,
            None => {
                let current_dir = env::current_dir()?;
                find_project_root(&current_dir).unwrap_or(current_dir)
            }
        };
        let config = match config {
            Some(config) => config,
            None => CpkgConfig::load()?,
        };

        let options = ResolveOptions {
            protocol: protocol.unwrap_or(config.protocol),
            jobs: jobs.unwrap_or(config.jobs).max(1),
        };

        Ok(Cpkg {
            resolver: Resolver::new(vcs, options),
            root,
            manifest_file_name: manifest_file_name
                .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE_NAME)),
            lock_file_name: lock_file_name.unwrap_or_else(|| PathBuf::from(LOCK_FILE_NAME)),
            dep_root: dep_root.or(config.dep_root),
        })
    }
}
