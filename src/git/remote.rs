use std::sync::Arc;

use dashmap::DashMap;
use git2::{Config, Direction, Remote};
use log::{debug, trace};

use crate::resolver::{ChecksumSource, CommitSource, TagSource};

use super::{remote_callbacks, GitError};

const TAG_PREFIX: &str = "refs/tags/";
const PEELED_SUFFIX: &str = "^{}";
const CHECKSUM_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteRef {
    name: String,
    oid: String,
}

/// Talks to remote repositories without cloning them, the way
/// `git ls-remote` does.
///
/// The advertised refs of each URL are fetched once per instance.
#[derive(Default)]
pub struct GitRemote {
    refs: DashMap<String, Arc<Vec<RemoteRef>>>,
}

impl GitRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn refs(&self, url: &str) -> Result<Arc<Vec<RemoteRef>>, GitError> {
        if let Some(refs) = self.refs.get(url) {
            trace!("Using cached refs of {url}");
            return Ok(refs.clone());
        }
        let refs = Arc::new(list_remote(url)?);
        self.refs.insert(url.to_owned(), refs.clone());
        Ok(refs)
    }
}

fn list_remote(url: &str) -> Result<Vec<RemoteRef>, GitError> {
    debug!("Listing refs of {url}");
    let git_config = Config::open_default()?;
    let mut remote = Remote::create_detached(url)?;
    let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks(&git_config)), None)?;
    let refs = connection
        .list()?
        .iter()
        .map(|head| RemoteRef {
            name: head.name().to_owned(),
            oid: head.oid().to_string(),
        })
        .collect::<Vec<_>>();
    trace!("{url} advertises {} refs", refs.len());
    Ok(refs)
}

fn tag_names(refs: &[RemoteRef]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for name in refs.iter().filter_map(|r| r.name.strip_prefix(TAG_PREFIX)) {
        let name = name.strip_suffix(PEELED_SUFFIX).unwrap_or(name);
        if !tags.iter().any(|tag| tag == name) {
            tags.push(name.to_owned());
        }
    }
    tags
}

// Annotated tags advertise the tag object and, with the peeled suffix, the
// commit it points to.
fn tag_commit(refs: &[RemoteRef], tag: &str) -> Option<String> {
    let direct = format!("{TAG_PREFIX}{tag}");
    let peeled = format!("{direct}{PEELED_SUFFIX}");
    refs.iter()
        .find(|r| r.name == peeled)
        .or_else(|| refs.iter().find(|r| r.name == direct))
        .map(|r| r.oid.clone())
}

/// `h1:` followed by the first characters of the commit id.
pub fn commit_checksum(commit: &str) -> Result<String, GitError> {
    commit
        .get(..CHECKSUM_PREFIX_LEN)
        .map(|prefix| format!("h1:{prefix}"))
        .ok_or_else(|| GitError::ShortCommit {
            commit: commit.to_owned(),
        })
}

impl TagSource for GitRemote {
    fn list_tags(&self, repo_url: &str) -> anyhow::Result<Vec<String>> {
        Ok(tag_names(&self.refs(repo_url)?))
    }
}

impl CommitSource for GitRemote {
    fn resolve_commit(&self, repo_url: &str, tag: &str) -> anyhow::Result<String> {
        let refs = self.refs(repo_url)?;
        let commit = tag_commit(&refs, tag).ok_or_else(|| GitError::TagNotFound {
            url: repo_url.to_owned(),
            tag: tag.to_owned(),
        })?;
        Ok(commit)
    }
}

impl ChecksumSource for GitRemote {
    fn compute_checksum(&self, _repo_url: &str, commit: &str) -> anyhow::Result<String> {
        Ok(commit_checksum(commit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn refs(refs: &[(&str, &str)]) -> Vec<RemoteRef> {
        refs.iter()
            .map(|(name, oid)| RemoteRef {
                name: name.to_string(),
                oid: oid.to_string(),
            })
            .collect()
    }

    fn advertised() -> Vec<RemoteRef> {
        refs(&[
            ("HEAD", "1111"),
            ("refs/heads/main", "1111"),
            ("refs/tags/span/v1.0.0", "2222"),
            ("refs/tags/v1.0.0", "3333"),
            ("refs/tags/v1.1.0", "4444"),
            ("refs/tags/v1.1.0^{}", "5555"),
        ])
    }

    #[test]
    fn lists_tags_once() {
        assert_eq!(
            tag_names(&advertised()),
            vec!["span/v1.0.0", "v1.0.0", "v1.1.0"]
        );
    }

    #[test]
    fn resolves_lightweight_and_annotated_tags() {
        let refs = advertised();
        assert_eq!(tag_commit(&refs, "v1.0.0").as_deref(), Some("3333"));
        assert_eq!(tag_commit(&refs, "v1.1.0").as_deref(), Some("5555"));
        assert_eq!(tag_commit(&refs, "span/v1.0.0").as_deref(), Some("2222"));
        assert_eq!(tag_commit(&refs, "main"), None);
    }

    #[test]
    fn checksum_of_commit() {
        assert_eq!(
            commit_checksum("0123456789abcdef0123456789abcdef01234567").unwrap(),
            "h1:0123456789abcdef"
        );
        assert!(matches!(
            commit_checksum("0123456789"),
            Err(GitError::ShortCommit { .. })
        ));
    }

    #[test]
    fn cached_refs_are_reused() {
        let remote = GitRemote::new();
        remote
            .refs
            .insert("https://example.com/a.git".to_owned(), Arc::new(advertised()));

        assert_eq!(
            remote.list_tags("https://example.com/a.git").unwrap(),
            vec!["span/v1.0.0", "v1.0.0", "v1.1.0"]
        );
        assert_eq!(
            remote
                .resolve_commit("https://example.com/a.git", "v1.1.0")
                .unwrap(),
            "5555"
        );
        assert!(remote
            .resolve_commit("https://example.com/a.git", "v9.9.9")
            .unwrap_err()
            .to_string()
            .contains("Tag v9.9.9 not found"));
    }
}
