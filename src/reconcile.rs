//! Comparison of a freshly resolved lock file against the one on disk.

use std::fmt::Display;

use log::{debug, warn};

use crate::{
    model::{lock::LockFile, manifest::Manifest},
    resolver::{Resolver, Vcs},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    pub module: String,
    pub from: String,
    pub to: String,
}

/// What a new lock file changes, each list sorted by module path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub added: Vec<String>,
    pub updated: Vec<VersionChange>,
    pub removed: Vec<String>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

pub fn classify(previous: Option<&LockFile>, current: &LockFile) -> ChangeReport {
    let mut report = ChangeReport::default();
    for (module, locked) in &current.dependencies {
        match previous.and_then(|previous| previous.get(module)) {
            None => report.added.push(module.clone()),
            Some(old) if old.version != locked.version => report.updated.push(VersionChange {
                module: module.clone(),
                from: old.version.clone(),
                to: locked.version.clone(),
            }),
            Some(_) => {}
        }
    }
    if let Some(previous) = previous {
        report.removed = previous
            .dependencies
            .keys()
            .filter(|module| !current.dependencies.contains_key(*module))
            .cloned()
            .collect();
    }
    report
}

/// Whether writing `current` would alter the pinned state. Timestamps and
/// generator identity are not part of the comparison.
pub fn would_change(previous: Option<&LockFile>, current: &LockFile) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if previous.dependencies.len() != current.dependencies.len() {
        return true;
    }
    current.dependencies.iter().any(|(module, locked)| {
        previous.get(module).map_or(true, |old| {
            old.version != locked.version || old.commit != locked.commit
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    UpToDate,
    WouldChange,
    WouldBeCreated,
}

impl LockStatus {
    pub fn of(previous: Option<&LockFile>, current: &LockFile) -> Self {
        match previous {
            None => LockStatus::WouldBeCreated,
            Some(_) if would_change(previous, current) => LockStatus::WouldChange,
            Some(_) => LockStatus::UpToDate,
        }
    }
}

impl Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockStatus::UpToDate => f.write_str("lockfile is up to date"),
            LockStatus::WouldChange => f.write_str("lockfile would change"),
            LockStatus::WouldBeCreated => f.write_str("lockfile would be created"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeAction {
    Upgrade { from: String, to: String },
    Refresh { version: String },
    Add { version: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpgrade {
    pub module: String,
    pub action: UpgradeAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradePlan {
    pub upgrades: Vec<PlannedUpgrade>,
    /// Dependencies whose latest version could not be determined.
    pub skipped: Vec<(String, String)>,
    pub all: bool,
}

impl UpgradePlan {
    /// Whether the resolver has to run again.
    pub fn needs_resolution(&self) -> bool {
        self.all
            || self
                .upgrades
                .iter()
                .any(|planned| !matches!(planned.action, UpgradeAction::Refresh { .. }))
    }
}

/// Looks up the latest compatible version of every manifest dependency and
/// marks those that differ from the lock file. With `all`, dependencies
/// already at their latest version are marked for a refresh as well.
///
/// Lookups are best-effort: a failing dependency is recorded in `skipped`.
pub fn plan_upgrade<V: Vcs + 'static>(
    resolver: &Resolver<V>,
    manifest: &Manifest,
    locked: Option<&LockFile>,
    all: bool,
) -> UpgradePlan {
    let mut plan = UpgradePlan {
        all,
        ..Default::default()
    };
    for (module, dependency) in &manifest.dependencies {
        let latest = match resolver.latest_compatible(module, &dependency.constraint) {
            Ok(latest) => latest,
            Err(err) => {
                warn!("Skipping {module}: {err}");
                plan.skipped.push((module.clone(), err.to_string()));
                continue;
            }
        };
        let action = match locked.and_then(|lock| lock.get(module)) {
            None => UpgradeAction::Add {
                version: latest.version,
            },
            Some(current) if current.version != latest.version => UpgradeAction::Upgrade {
                from: current.version.clone(),
                to: latest.version,
            },
            Some(_) if all => UpgradeAction::Refresh {
                version: latest.version,
            },
            Some(_) => {
                debug!("{module} is at its latest compatible version");
                continue;
            }
        };
        plan.upgrades.push(PlannedUpgrade {
            module: module.clone(),
            action,
        });
    }
    plan
}
