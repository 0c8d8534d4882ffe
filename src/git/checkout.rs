use std::path::Path;

use git2::{ErrorCode, Repository, StatusOptions};
use log::trace;

use crate::{
    model::module_path::normalize_remote_url,
    report::{CheckoutState, Checkouts},
};

use super::GitError;

/// Dependency checkouts on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCheckouts;

impl Checkouts for LocalCheckouts {
    fn inspect(&self, path: &Path) -> anyhow::Result<Option<CheckoutState>> {
        if !path.exists() {
            return Ok(None);
        }
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(error) if error.code() == ErrorCode::NotFound => {
                trace!("{} is not a git checkout", path.display());
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };
        let commit = repo.head()?.peel_to_commit()?.id().to_string();

        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        let dirty = !repo.statuses(Some(&mut options))?.is_empty();

        Ok(Some(CheckoutState { commit, dirty }))
    }
}

/// Derives a module path from the `origin` remote of the repository at `dir`.
pub fn infer_module_path(dir: &Path) -> Result<String, GitError> {
    let repo = Repository::open(dir)?;
    let remote = repo.find_remote("origin")?;
    let url = remote
        .url()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| GitError::NoOriginUrl {
            path: dir.display().to_string(),
        })?;
    Ok(normalize_remote_url(url))
}
