use std::{collections::BTreeMap, fmt::Display, path::Path};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{write_atomically, ParseError};

pub const LOCK_FILE_NAME: &str = "cpkg.lock";
pub const GENERATED_BY: &str = concat!("cpkg ", env!("CARGO_PKG_VERSION"));

const VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    pub module: String,
    pub generated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    pub dep_root: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, LockedDependency>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct VersionedLockFile<'a> {
    pub version: i64,
    #[serde(flatten)]
    pub content: &'a LockFile,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    #[default]
    Git,
}

impl Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VcsKind::Git => f.write_str("git"),
        }
    }
}

/// The pinned state of one dependency.
///
/// `path` is the checkout of the whole repository; `source_path` is where the
/// module's sources live, which is `path/subdir` for subpath modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedDependency {
    pub version: String,
    pub tag: String,
    pub commit: String,
    pub sum: String,
    #[serde(default)]
    pub vcs: VcsKind,
    pub repo_url: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subdir: String,
    pub source_path: String,
}

impl LockFile {
    pub fn new(
        module: impl Into<String>,
        dep_root: impl Into<String>,
        dependencies: BTreeMap<String, LockedDependency>,
    ) -> Self {
        LockFile {
            module: module.into(),
            generated_by: GENERATED_BY.to_owned(),
            generated_at: None,
            dep_root: dep_root.into(),
            dependencies,
        }
    }

    pub fn from_file(file: &Path) -> Result<LockFile, ParseError> {
        LockFile::from_str(&std::fs::read_to_string(file)?)
    }

    /// Reads the lock file when it exists.
    pub fn from_file_if_exists(file: &Path) -> Result<Option<LockFile>, ParseError> {
        if file.exists() {
            LockFile::from_file(file).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn from_str(s: &str) -> Result<LockFile, ParseError> {
        let mut table = toml::from_str::<toml::Table>(s)?;
        match table.remove("version") {
            Some(toml::Value::Integer(VERSION)) => table.try_into::<LockFile>().map_err(Into::into),
            Some(other) => Err(ParseError::UnsupportedLockFileVersion(other)),
            None => Err(ParseError::MissingLockFileVersion),
        }
    }

    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&VersionedLockFile {
            version: VERSION,
            content: self,
        })
    }

    /// Refreshes `generated_at` and replaces `path` atomically.
    pub fn write(&mut self, path: &Path) -> Result<(), ParseError> {
        self.generated_at = Some(Utc::now().trunc_subsecs(0));
        write_atomically(path, &self.to_string()?)
    }

    /// Whether both documents pin the same content, ignoring the
    /// `generated_*` stamps.
    pub fn same_content(&self, other: &LockFile) -> bool {
        self.module == other.module
            && self.dep_root == other.dep_root
            && self.dependencies == other.dependencies
    }

    pub fn get(&self, module: &str) -> Option<&LockedDependency> {
        self.dependencies.get(module)
    }
}
