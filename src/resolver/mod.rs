mod select;

#[cfg(test)]
pub(crate) mod fake;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{info, trace};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    config::DEFAULT_JOBS,
    model::{
        lock::{LockFile, LockedDependency, VcsKind},
        manifest::Manifest,
        module_path::{ModulePath, ModulePathError, Protocol},
    },
    tags::TagError,
    version::{Constraint, VersionError},
};

pub use select::{select_version, Selection};

/// Enumerates the tags of a remote repository.
pub trait TagSource {
    fn list_tags(&self, repo_url: &str) -> anyhow::Result<Vec<String>>;
}

/// Maps a tag to an immutable commit identifier.
pub trait CommitSource {
    fn resolve_commit(&self, repo_url: &str, tag: &str) -> anyhow::Result<String>;
}

/// Derives an integrity token for a commit.
pub trait ChecksumSource {
    fn compute_checksum(&self, repo_url: &str, commit: &str) -> anyhow::Result<String>;
}

/// Everything the resolver needs from version control.
pub trait Vcs: TagSource + CommitSource + ChecksumSource + Send + Sync {}

impl<T> Vcs for T where T: TagSource + CommitSource + ChecksumSource + Send + Sync {}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidModulePath(#[from] ModulePathError),
    #[error("invalid version `{version}` for {module}")]
    InvalidVersion { module: String, version: String },
    #[error("unsupported constraint `{constraint}` for {module}")]
    UnsupportedConstraint { module: String, constraint: String },
    #[error("{module}: {source}")]
    TagSubpathMismatch { module: String, source: TagError },
    #[error("failed to list tags of {module} from {repo_url}: {source}")]
    TagListFailure {
        module: String,
        repo_url: String,
        source: anyhow::Error,
    },
    #[error("no version of {module} satisfies `{constraint}`")]
    NoCompatibleVersion { module: String, constraint: String },
    #[error("failed to resolve tag {tag} of {module} to a commit: {source}")]
    CommitResolutionFailure {
        module: String,
        tag: String,
        source: anyhow::Error,
    },
    #[error("failed to compute checksum of {module} at {commit}: {source}")]
    ChecksumFailure {
        module: String,
        commit: String,
        source: anyhow::Error,
    },
    #[error("resolution of {module} was cancelled")]
    Cancelled { module: String },
    #[error("resolver worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ResolveError {
    fn constraint(module: &str, constraint: &str, error: VersionError) -> Self {
        match error {
            VersionError::InvalidVersion(version) => ResolveError::InvalidVersion {
                module: module.to_owned(),
                version,
            },
            VersionError::UnsupportedConstraint(_) => ResolveError::UnsupportedConstraint {
                module: module.to_owned(),
                constraint: constraint.to_owned(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub protocol: Protocol,
    pub jobs: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            protocol: Protocol::Https,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// Turns manifest constraints into pinned lock entries.
pub struct Resolver<V> {
    vcs: Arc<V>,
    options: ResolveOptions,
}

impl<V> Clone for Resolver<V> {
    fn clone(&self) -> Self {
        Resolver {
            vcs: self.vcs.clone(),
            options: self.options,
        }
    }
}

impl<V: Vcs + 'static> Resolver<V> {
    pub fn new(vcs: Arc<V>, options: ResolveOptions) -> Self {
        Resolver { vcs, options }
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Resolves every manifest dependency into a new lock file.
    ///
    /// Dependencies are resolved concurrently, at most `jobs` at a time. The
    /// first failure cancels the remaining workers and is returned; nothing is
    /// produced unless every dependency resolved.
    pub async fn resolve(
        &self,
        manifest: &Manifest,
        dep_root: &str,
    ) -> Result<LockFile, ResolveError> {
        let semaphore = Arc::new(Semaphore::new(self.options.jobs.max(1)));
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for (module, dependency) in &manifest.dependencies {
            let resolver = self.clone();
            let semaphore = semaphore.clone();
            let cancelled = cancelled.clone();
            let module = module.clone();
            let constraint = dependency.constraint.clone();
            let dep_root = dep_root.to_owned();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ResolveError::Cancelled {
                        module: module.clone(),
                    })?;
                tokio::task::spawn_blocking(move || {
                    resolver
                        .resolve_dependency(&module, &constraint, &dep_root, &cancelled)
                        .map(|locked| (module, locked))
                })
                .await?
            });
        }

        let mut dependencies = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(ResolveError::from).and_then(|result| result) {
                Ok((module, locked)) => {
                    dependencies.insert(module, locked);
                }
                Err(error) => {
                    cancelled.store(true, Ordering::SeqCst);
                    tasks.abort_all();
                    return Err(error);
                }
            }
        }

        Ok(LockFile::new(
            manifest.module.clone(),
            dep_root,
            dependencies,
        ))
    }

    /// Finds the highest tag of `module` satisfying `constraint` without
    /// pinning it to a commit.
    pub fn latest_compatible(
        &self,
        module: &str,
        constraint: &str,
    ) -> Result<Selection, ResolveError> {
        self.select(module, constraint, &AtomicBool::new(false))
            .map(|(_, selection)| selection)
    }

    /// Resolves a single dependency, checking `cancelled` before every
    /// version control call.
    pub fn resolve_dependency(
        &self,
        module: &str,
        constraint: &str,
        dep_root: &str,
        cancelled: &AtomicBool,
    ) -> Result<LockedDependency, ResolveError> {
        let (module_path, selection) = self.select(module, constraint, cancelled)?;
        let repo_url = module_path.repo_url(self.options.protocol);

        check_cancelled(cancelled, module)?;
        trace!("Resolving tag {} of {repo_url}", selection.tag);
        let commit = self
            .vcs
            .resolve_commit(&repo_url, &selection.tag)
            .map_err(|source| ResolveError::CommitResolutionFailure {
                module: module.to_owned(),
                tag: selection.tag.clone(),
                source,
            })?;

        check_cancelled(cancelled, module)?;
        let sum = self
            .vcs
            .compute_checksum(&repo_url, &commit)
            .map_err(|source| ResolveError::ChecksumFailure {
                module: module.to_owned(),
                commit: commit.clone(),
                source,
            })?;

        let path = join_path(dep_root, &module_path.checkout_dir());
        let source_path = if module_path.has_subpath() {
            join_path(&path, &module_path.subpath)
        } else {
            path.clone()
        };

        info!("Locking {module} at {} ({commit})", selection.tag);
        Ok(LockedDependency {
            version: selection.version,
            tag: selection.tag,
            commit,
            sum,
            vcs: VcsKind::Git,
            repo_url,
            path,
            subdir: module_path.subpath,
            source_path,
        })
    }

    fn select(
        &self,
        module: &str,
        constraint: &str,
        cancelled: &AtomicBool,
    ) -> Result<(ModulePath, Selection), ResolveError> {
        let module_path = ModulePath::parse(module)?;
        let parsed = Constraint::parse(constraint)
            .map_err(|error| ResolveError::constraint(module, constraint, error))?;
        let repo_url = module_path.repo_url(self.options.protocol);
        info!("Resolving {module} {parsed}");

        check_cancelled(cancelled, module)?;
        trace!("Listing tags of {repo_url}");
        let tags = self
            .vcs
            .list_tags(&repo_url)
            .map_err(|source| ResolveError::TagListFailure {
                module: module.to_owned(),
                repo_url: repo_url.clone(),
                source,
            })?;

        let selection = select_version(&tags, &module_path, &parsed)
            .map_err(|source| ResolveError::TagSubpathMismatch {
                module: module.to_owned(),
                source,
            })?
            .ok_or_else(|| ResolveError::NoCompatibleVersion {
                module: module.to_owned(),
                constraint: constraint.to_owned(),
            })?;
        Ok((module_path, selection))
    }
}

fn check_cancelled(cancelled: &AtomicBool, module: &str) -> Result<(), ResolveError> {
    if cancelled.load(Ordering::SeqCst) {
        Err(ResolveError::Cancelled {
            module: module.to_owned(),
        })
    } else {
        Ok(())
    }
}

fn join_path(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        rest.to_owned()
    } else {
        format!("{base}/{rest}")
    }
}
