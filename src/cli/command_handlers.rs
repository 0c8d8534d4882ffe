use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use log::{debug, info};

use crate::{
    api::TidyMode,
    flock::ProjectLock,
    git::{infer_module_path, LocalCheckouts},
    model::{
        lock::LockFile,
        manifest::{Manifest, DEFAULT_DEP_ROOT},
        module_path::ModulePath,
    },
    reconcile::{classify, plan_upgrade, ChangeReport, LockStatus, UpgradePlan},
    report::{self, Explanation, Graph, ListRow, OutdatedRow, StatusRow},
    resolver::{Resolver, Vcs},
    version::Constraint,
};

/// A dependency added to or changed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEdit {
    pub module: String,
    pub previous: Option<String>,
    pub constraint: String,
}

#[derive(Debug, Clone)]
pub struct TidyOutcome {
    pub lock_file: LockFile,
    pub changes: ChangeReport,
    pub status: LockStatus,
    /// Where the lock file was written, if it was.
    pub written: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    pub plan: UpgradePlan,
    pub tidy: Option<TidyOutcome>,
}

/// Handler to init command
pub fn do_init(
    root: &Path,
    manifest_file_name: &Path,
    module: Option<String>,
    dep_root: Option<String>,
) -> anyhow::Result<Manifest> {
    let manifest_path = root.join(manifest_file_name);
    if manifest_path.exists() {
        bail!("{} already exists", manifest_path.display());
    }

    let module = match module.filter(|module| !module.trim().is_empty()) {
        Some(module) => module,
        None => infer_module_path(root).with_context(|| {
            format!(
                "Could not infer the module path from the origin remote of {}, pass --module",
                root.display()
            )
        })?,
    };
    ModulePath::parse(&module)?;

    let manifest = Manifest::new(
        module,
        Some(dep_root.unwrap_or_else(|| DEFAULT_DEP_ROOT.to_owned())),
    );
    manifest.write(&manifest_path)?;
    info!(
        "Created {} for module {}",
        manifest_path.display(),
        manifest.module
    );
    Ok(manifest)
}

/// Handler to add command. Every `module@constraint` is validated before the
/// manifest is rewritten.
pub fn do_add(
    root: &Path,
    manifest_file_name: &Path,
    specs: &[String],
) -> anyhow::Result<Vec<ManifestEdit>> {
    if specs.is_empty() {
        bail!("At least one module@version is required");
    }
    let manifest_path = root.join(manifest_file_name);
    let mut manifest = load_manifest(&manifest_path)?;

    let mut parsed = Vec::with_capacity(specs.len());
    for spec in specs {
        let (module, constraint) = split_spec(spec)?;
        ModulePath::parse(module)?;
        Constraint::parse(constraint)
            .with_context(|| format!("Invalid version for {module}"))?;
        parsed.push((module.to_owned(), constraint.trim().to_owned()));
    }

    let edits = parsed
        .into_iter()
        .filter_map(|(module, constraint)| {
            let previous = manifest.set_dependency(module.clone(), constraint.clone());
            if previous.as_deref() == Some(constraint.as_str()) {
                debug!("{module} already requires {constraint}");
                return None;
            }
            Some(ManifestEdit {
                module,
                previous,
                constraint,
            })
        })
        .collect::<Vec<_>>();

    manifest.write(&manifest_path)?;
    info!("Updated {}", manifest_path.display());
    Ok(edits)
}

// The module may itself contain `@` (`git@host:org/repo.git`), so the
// constraint is whatever follows the last one.
fn split_spec(spec: &str) -> anyhow::Result<(&str, &str)> {
    match spec.rsplit_once('@') {
        Some((module, constraint))
            if !module.is_empty()
                && !constraint.trim().is_empty()
                && !constraint.contains(['/', ':']) =>
        {
            Ok((module, constraint))
        }
        _ => bail!("Missing version in `{spec}`, expected module@version"),
    }
}

/// Handler to tidy command
///
/// Resolves every manifest dependency and, in [`TidyMode::Write`], replaces
/// the lock file. Nothing is written when resolution fails.
pub async fn do_tidy<V: Vcs + 'static>(
    resolver: &Resolver<V>,
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
    dep_root: Option<&str>,
    mode: TidyMode,
) -> anyhow::Result<TidyOutcome> {
    let manifest = load_manifest(&root.join(manifest_file_name))?;
    let dep_root = dep_root.unwrap_or(manifest.dep_root()).to_owned();
    let lock_file_path = root.join(lock_file_name);

    let _lock = match mode {
        TidyMode::Write => Some(acquire_project_lock(root).await?),
        TidyMode::Check => None,
    };

    let previous = LockFile::from_file_if_exists(&lock_file_path)?;
    let mut lock_file = resolver.resolve(&manifest, &dep_root).await?;
    debug!("Generated lockfile: {:?}", lock_file);

    let changes = classify(previous.as_ref(), &lock_file);
    let status = LockStatus::of(previous.as_ref(), &lock_file);

    // `status` only tracks versions and commits; paths, URLs and the module
    // must reach disk as well.
    let unchanged = previous
        .as_ref()
        .is_some_and(|previous| previous.same_content(&lock_file));
    let written = match mode {
        TidyMode::Check => None,
        TidyMode::Write if unchanged => {
            debug!("Lockfile is up to date");
            None
        }
        TidyMode::Write => {
            lock_file.write(&lock_file_path)?;
            info!("Wrote lockfile to {}", lock_file_path.display());
            Some(lock_file_path)
        }
    };

    Ok(TidyOutcome {
        lock_file,
        changes,
        status,
        written,
    })
}

/// Handler to upgrade command
pub async fn do_upgrade<V: Vcs + 'static>(
    resolver: &Resolver<V>,
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
    dep_root: Option<&str>,
    all: bool,
) -> anyhow::Result<UpgradeOutcome> {
    let manifest = load_manifest(&root.join(manifest_file_name))?;
    let locked = LockFile::from_file_if_exists(&root.join(lock_file_name))?;

    let plan = {
        let resolver = resolver.clone();
        tokio::task::spawn_blocking(move || {
            plan_upgrade(&resolver, &manifest, locked.as_ref(), all)
        })
        .await?
    };

    if !plan.needs_resolution() {
        return Ok(UpgradeOutcome { plan, tidy: None });
    }

    let tidy = do_tidy(
        resolver,
        root,
        manifest_file_name,
        lock_file_name,
        dep_root,
        TidyMode::Write,
    )
    .await?;
    Ok(UpgradeOutcome {
        plan,
        tidy: Some(tidy),
    })
}

/// Handler to list command. Works without a lock file.
pub fn do_list(
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
) -> anyhow::Result<(Vec<ListRow>, bool)> {
    let manifest = load_manifest(&root.join(manifest_file_name))?;
    let locked = LockFile::from_file_if_exists(&root.join(lock_file_name))?;
    Ok((report::list(&manifest, locked.as_ref()), locked.is_some()))
}

/// Handler to check command
pub async fn do_check<V: Vcs + 'static>(
    resolver: &Resolver<V>,
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
) -> anyhow::Result<Vec<OutdatedRow>> {
    let manifest = load_manifest(&root.join(manifest_file_name))?;
    let locked = load_lock_file(&root.join(lock_file_name))?;
    let resolver = resolver.clone();
    let rows = tokio::task::spawn_blocking(move || {
        report::check_outdated(&resolver, &manifest, &locked)
    })
    .await?;
    Ok(rows)
}

/// Handler to graph command. Reads only the lock file.
pub fn do_graph(root: &Path, lock_file_name: &Path) -> anyhow::Result<Graph> {
    let locked = load_lock_file(&root.join(lock_file_name))?;
    Ok(report::graph(&locked))
}

/// Handler to explain command
pub fn do_explain(
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
    module: &str,
) -> anyhow::Result<Explanation> {
    let manifest_path = root.join(manifest_file_name);
    let manifest = load_manifest(&manifest_path)?;
    let locked = LockFile::from_file_if_exists(&root.join(lock_file_name))?;
    match report::explain(&manifest, locked.as_ref(), module, root, &LocalCheckouts) {
        Some(explanation) => Ok(explanation),
        None => bail!(
            "Dependency {module} not found in {}",
            manifest_path.display()
        ),
    }
}

/// Handler to status command. `None` when there is no lock file yet.
pub fn do_status(
    root: &Path,
    manifest_file_name: &Path,
    lock_file_name: &Path,
) -> anyhow::Result<Option<Vec<StatusRow>>> {
    let manifest = load_manifest(&root.join(manifest_file_name))?;
    let Some(locked) = LockFile::from_file_if_exists(&root.join(lock_file_name))? else {
        return Ok(None);
    };
    Ok(Some(report::status(
        &manifest,
        &locked,
        root,
        &LocalCheckouts,
    )))
}

fn load_manifest(path: &Path) -> anyhow::Result<Manifest> {
    if !path.exists() {
        bail!(
            "No {} found, run `cpkg init` first",
            path.display()
        );
    }
    Ok(Manifest::from_file(path)?)
}

fn load_lock_file(path: &Path) -> anyhow::Result<LockFile> {
    match LockFile::from_file_if_exists(path)? {
        Some(lock_file) => Ok(lock_file),
        None => bail!(
            "No {} found, run `cpkg tidy` first",
            path.display()
        ),
    }
}

async fn acquire_project_lock(root: &Path) -> anyhow::Result<ProjectLock> {
    let root = root.to_path_buf();
    let lock = tokio::task::spawn_blocking(move || ProjectLock::acquire(&root)).await??;
    Ok(lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn splits_module_and_version() {
        assert_eq!(
            split_spec("github.com/acme/list@^1.0.0").unwrap(),
            ("github.com/acme/list", "^1.0.0")
        );
        assert_eq!(
            split_spec("git@git.internal:platform/alloc.git@=2.1.0").unwrap(),
            ("git@git.internal:platform/alloc.git", "=2.1.0")
        );
        assert!(split_spec("github.com/acme/list").is_err());
        assert!(split_spec("github.com/acme/list@").is_err());
        assert!(split_spec("git@git.internal:platform/alloc.git").is_err());
    }
}
