use std::{
    collections::{HashMap, HashSet},
    hash::{DefaultHasher, Hash, Hasher},
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{anyhow, bail};

use super::{ChecksumSource, CommitSource, TagSource};

/// In-memory repositories keyed by URL, with tags in listing order.
#[derive(Default)]
pub struct FakeVcs {
    repos: HashMap<String, Vec<(String, Option<String>)>>,
    unreachable: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, url: &str, tags: &[&str]) -> Self {
        let repo = self.repos.entry(url.to_owned()).or_default();
        for tag in tags {
            repo.push((tag.to_string(), Some(fake_commit(url, tag))));
        }
        self
    }

    pub fn with_commit(mut self, url: &str, tag: &str, commit: &str) -> Self {
        self.repos
            .entry(url.to_owned())
            .or_default()
            .push((tag.to_owned(), Some(commit.to_owned())));
        self
    }

    /// The tag is listed but cannot be resolved.
    pub fn without_commit(mut self, url: &str, tag: &str) -> Self {
        if let Some(repo) = self.repos.get_mut(url) {
            for (name, commit) in repo.iter_mut() {
                if name == tag {
                    *commit = None;
                }
            }
        }
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_owned());
        self
    }

    pub fn commit_of(&self, url: &str, tag: &str) -> String {
        fake_commit(url, tag)
    }

    /// Number of collaborator calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn repo(&self, url: &str) -> anyhow::Result<&[(String, Option<String>)]> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(url) {
            bail!("could not connect to {url}");
        }
        self.repos
            .get(url)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("repository {url} not found"))
    }
}

impl TagSource for FakeVcs {
    fn list_tags(&self, repo_url: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .repo(repo_url)?
            .iter()
            .map(|(tag, _)| tag.clone())
            .collect())
    }
}

impl CommitSource for FakeVcs {
    fn resolve_commit(&self, repo_url: &str, tag: &str) -> anyhow::Result<String> {
        self.repo(repo_url)?
            .iter()
            .find(|(name, _)| name == tag)
            .and_then(|(_, commit)| commit.clone())
            .ok_or_else(|| anyhow!("tag {tag} not found in {repo_url}"))
    }
}

impl ChecksumSource for FakeVcs {
    fn compute_checksum(&self, _repo_url: &str, commit: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match commit.get(..16) {
            Some(prefix) => Ok(format!("h1:{prefix}")),
            None => bail!("commit {commit} is too short"),
        }
    }
}

fn fake_commit(url: &str, tag: &str) -> String {
    let mut hasher = DefaultHasher::new();
    (url, tag).hash(&mut hasher);
    let hash = hasher.finish();
    format!("{hash:016x}{:016x}{:08x}", hash.rotate_left(17), hash as u32)
}
