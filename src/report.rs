//! Read-only views over the manifest, the lock file and the local checkouts.
//!
//! A row that cannot be computed carries its error instead of failing the
//! whole report.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{
    model::{
        lock::{LockFile, LockedDependency},
        manifest::Manifest,
    },
    resolver::{ResolveError, Resolver, Vcs},
    version::Version,
};

/// State of a dependency checkout on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutState {
    pub commit: String,
    pub dirty: bool,
}

/// Reads the state of local checkouts.
pub trait Checkouts {
    /// `Ok(None)` when there is no checkout at `path`.
    fn inspect(&self, path: &Path) -> anyhow::Result<Option<CheckoutState>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    UpToDate,
    Patch,
    Minor,
    Major,
}

impl Freshness {
    fn between(current: &Version, latest: &Version) -> Self {
        if latest <= current {
            Freshness::UpToDate
        } else if latest.major > current.major {
            Freshness::Major
        } else if latest.minor > current.minor {
            Freshness::Minor
        } else {
            Freshness::Patch
        }
    }
}

impl Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::UpToDate => f.write_str("up to date"),
            Freshness::Patch => f.write_str("patch available"),
            Freshness::Minor => f.write_str("minor available"),
            Freshness::Major => f.write_str("major available"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedRow {
    pub module: String,
    pub constraint: String,
    pub current: String,
    pub latest: Result<String, String>,
    pub freshness: Option<Freshness>,
}

impl OutdatedRow {
    pub fn has_update(&self) -> bool {
        matches!(self.freshness, Some(freshness) if freshness != Freshness::UpToDate)
    }
}

/// Compares each locked dependency with the latest version its constraint
/// allows. Dependencies missing from the lock file are not reported.
pub fn check_outdated<V: Vcs + 'static>(
    resolver: &Resolver<V>,
    manifest: &Manifest,
    lock: &LockFile,
) -> Vec<OutdatedRow> {
    manifest
        .dependencies
        .iter()
        .filter_map(|(module, dependency)| {
            let locked = lock.get(module)?;
            let outcome = resolver
                .latest_compatible(module, &dependency.constraint)
                .and_then(|latest| {
                    let current =
                        Version::parse(&locked.version).map_err(|_| ResolveError::InvalidVersion {
                            module: module.clone(),
                            version: locked.version.clone(),
                        })?;
                    // Selected tokens always parse.
                    let parsed = Version::parse(&latest.version).map_err(|_| {
                        ResolveError::InvalidVersion {
                            module: module.clone(),
                            version: latest.version.clone(),
                        }
                    })?;
                    Ok((latest.version, Freshness::between(&current, &parsed)))
                });
            let (latest, freshness) = match outcome {
                Ok((latest, freshness)) => (Ok(latest), Some(freshness)),
                Err(err) => {
                    warn!("Could not check {module}: {err}");
                    (Err(err.to_string()), None)
                }
            };
            Some(OutdatedRow {
                module: module.clone(),
                constraint: dependency.constraint.clone(),
                current: locked.version.clone(),
                latest,
                freshness,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub module: String,
    pub constraint: String,
    /// `None` when the dependency is not in the lock file.
    pub locked: Option<String>,
}

pub fn list(manifest: &Manifest, lock: Option<&LockFile>) -> Vec<ListRow> {
    manifest
        .dependencies
        .iter()
        .map(|(module, dependency)| ListRow {
            module: module.clone(),
            constraint: dependency.constraint.clone(),
            locked: lock
                .and_then(|lock| lock.get(module))
                .map(|locked| locked.version.clone()),
        })
        .collect()
}

/// The locked dependencies of a module, ordered by module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    pub module: String,
    /// `(module, version)` pairs.
    pub dependencies: Vec<(String, String)>,
}

pub fn graph(lock: &LockFile) -> Graph {
    Graph {
        module: lock.module.clone(),
        dependencies: lock
            .dependencies
            .iter()
            .map(|(module, locked)| (module.clone(), locked.version.clone()))
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    Ok,
    OutOfSync,
    Dirty,
    Missing,
    NoLock,
}

impl Display for DependencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DependencyStatus::Ok => "OK",
            DependencyStatus::OutOfSync => "OUT_OF_SYNC",
            DependencyStatus::Dirty => "DIRTY",
            DependencyStatus::Missing => "MISSING",
            DependencyStatus::NoLock => "NO_LOCK",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub module: String,
    pub constraint: String,
    pub locked: Option<String>,
    pub local: String,
    pub status: DependencyStatus,
    pub error: Option<String>,
}

/// Compares locked commits with what is checked out under `root`.
pub fn status(
    manifest: &Manifest,
    lock: &LockFile,
    root: &Path,
    checkouts: &impl Checkouts,
) -> Vec<StatusRow> {
    manifest
        .dependencies
        .iter()
        .map(|(module, dependency)| {
            let mut row = StatusRow {
                module: module.clone(),
                constraint: dependency.constraint.clone(),
                locked: None,
                local: "MISSING".to_owned(),
                status: DependencyStatus::NoLock,
                error: None,
            };
            let Some(locked) = lock.get(module) else {
                return row;
            };
            row.locked = Some(locked.version.clone());
            row.status = DependencyStatus::Missing;
            match checkouts.inspect(&checkout_path(root, locked)) {
                Ok(None) => {}
                Ok(Some(state)) => {
                    if state.commit == locked.commit {
                        row.local = locked.version.clone();
                        row.status = DependencyStatus::Ok;
                    } else {
                        row.local = short_commit(&state.commit).to_owned();
                        row.status = DependencyStatus::OutOfSync;
                    }
                    if state.dirty {
                        row.local.push_str(" (dirty)");
                        row.status = DependencyStatus::Dirty;
                    }
                }
                Err(err) => {
                    warn!("Could not inspect the checkout of {module}: {err}");
                    row.error = Some(err.to_string());
                }
            }
            row
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub module: String,
    pub constraint: String,
    pub locked: Option<LockedDependency>,
    /// Outer `None` when not locked; inner `None` when there is no checkout.
    pub checkout: Option<Result<Option<CheckoutState>, String>>,
}

impl Explanation {
    pub fn in_sync(&self) -> Option<bool> {
        let locked = self.locked.as_ref()?;
        match &self.checkout {
            Some(Ok(Some(state))) => Some(state.commit == locked.commit),
            _ => None,
        }
    }
}

/// Everything known about one manifest dependency, `None` if the manifest
/// does not declare it.
pub fn explain(
    manifest: &Manifest,
    lock: Option<&LockFile>,
    module: &str,
    root: &Path,
    checkouts: &impl Checkouts,
) -> Option<Explanation> {
    let dependency = manifest.dependencies.get(module)?;
    let locked = lock.and_then(|lock| lock.get(module)).cloned();
    let checkout = locked.as_ref().map(|locked| {
        checkouts
            .inspect(&checkout_path(root, locked))
            .map_err(|err| err.to_string())
    });
    Some(Explanation {
        module: module.to_owned(),
        constraint: dependency.constraint.clone(),
        locked,
        checkout,
    })
}

pub fn short_commit(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

fn checkout_path(root: &Path, locked: &LockedDependency) -> PathBuf {
    root.join(&locked.path)
}
