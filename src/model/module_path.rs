use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    sync::LazyLock,
};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// `user@host:path`, the scp-like shorthand git accepts for SSH remotes.
static SSH_SHORTHAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[^/:]+:").expect("ssh shorthand pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid module path `{path}`: {reason}")]
pub struct ModulePathError {
    pub path: String,
    pub reason: &'static str,
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "https")]
    Https,
    #[serde(rename = "ssh")]
    Ssh,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "https" => Ok(Protocol::Https),
            "ssh" => Ok(Protocol::Ssh),
            other => Err(format!("unsupported git protocol `{other}`")),
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Https => f.write_str("https"),
            Protocol::Ssh => f.write_str("ssh"),
        }
    }
}

/// A module identifier split into the repository that hosts it and the
/// directory inside that repository.
///
/// `github.com/acme/libs/span` lives in the repository `github.com/acme/libs`
/// under the subpath `span`. Direct URLs (`https://...`, `git@host:...`)
/// always address a whole repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath {
    pub repo: String,
    pub subpath: String,
    pub full: String,
}

impl ModulePath {
    pub fn parse(path: &str) -> Result<ModulePath, ModulePathError> {
        let error = |reason| ModulePathError {
            path: path.to_owned(),
            reason,
        };

        if is_direct_url(path) {
            return Ok(ModulePath {
                repo: path.to_owned(),
                subpath: String::new(),
                full: path.to_owned(),
            });
        }

        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() < 2 {
            return Err(error("expected at least host/owner/repo"));
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(error("empty path segment"));
        }

        let (repo, subpath) = if segments.len() > 3 {
            (segments[..3].join("/"), segments[3..].join("/"))
        } else {
            (trimmed.to_owned(), String::new())
        };

        Ok(ModulePath {
            repo,
            subpath,
            full: path.to_owned(),
        })
    }

    pub fn is_direct_url(&self) -> bool {
        is_direct_url(&self.full)
    }

    pub fn has_subpath(&self) -> bool {
        !self.subpath.is_empty()
    }

    /// The URL the repository is fetched from. Bare `host/owner/repo`
    /// addresses get the default protocol injected; direct URLs pass through.
    pub fn repo_url(&self, protocol: Protocol) -> String {
        repo_url(&self.repo, protocol)
    }

    /// Relative directory of the repository checkout under the dependency
    /// root.
    pub fn checkout_dir(&self) -> String {
        if self.is_direct_url() {
            normalize_remote_url(&self.full)
        } else {
            self.full.strip_suffix('/').unwrap_or(&self.full).to_owned()
        }
    }
}

impl Display for ModulePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for ModulePath {
    type Err = ModulePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModulePath::parse(s)
    }
}

fn is_direct_url(path: &str) -> bool {
    path.contains("://") || SSH_SHORTHAND_RE.is_match(path)
}

pub fn repo_url(repo: &str, protocol: Protocol) -> String {
    if is_direct_url(repo) {
        return repo.to_owned();
    }
    match protocol {
        Protocol::Https => format!("https://{repo}.git"),
        Protocol::Ssh => match repo.split_once('/') {
            Some((host, path)) => format!("ssh://git@{host}/{path}.git"),
            None => format!("ssh://git@{repo}.git"),
        },
    }
}

/// Turns a remote URL into a `host/owner/repo` style path:
/// `https://github.com/acme/app.git` and `git@github.com:acme/app.git` both
/// become `github.com/acme/app`.
pub fn normalize_remote_url(url: &str) -> String {
    let url = url.trim();
    let url = url.strip_suffix('/').unwrap_or(url);
    let url = url.strip_suffix(".git").unwrap_or(url);

    if let Some((_, rest)) = url.split_once("://") {
        let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
        return rest.to_owned();
    }
    if SSH_SHORTHAND_RE.is_match(url) {
        if let Some((_, rest)) = url.split_once('@') {
            return rest.replacen(':', "/", 1);
        }
    }
    url.to_owned()
}
