use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::model::{write_atomically, ParseError};

pub const MANIFEST_FILE_NAME: &str = "cpkg.toml";
pub const DEFAULT_DEP_ROOT: &str = "third_party/cpkg";

/// The user-owned `cpkg.toml` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dep_root: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,
}

/// A dependency declaration. Written as a bare constraint string
/// (`"^1.0.0"`) or as a table (`{ version = "^1.0.0" }`); always saved in the
/// short form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawDependency", into = "String")]
pub struct Dependency {
    pub constraint: String,
}

impl Dependency {
    pub fn new(constraint: impl Into<String>) -> Self {
        Dependency {
            constraint: constraint.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Short(String),
    Table {
        #[serde(default)]
        version: String,
    },
}

impl From<RawDependency> for Dependency {
    fn from(raw: RawDependency) -> Self {
        match raw {
            RawDependency::Short(constraint) => Dependency::new(constraint),
            RawDependency::Table { version } => Dependency::new(version),
        }
    }
}

impl From<Dependency> for String {
    fn from(dependency: Dependency) -> Self {
        dependency.constraint
    }
}

impl Manifest {
    pub fn new(module: impl Into<String>, dep_root: Option<String>) -> Self {
        Manifest {
            module: module.into(),
            dep_root,
            dependencies: BTreeMap::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Manifest, ParseError> {
        debug!("Attempting to read manifest from {}", path.display());
        let contents = std::fs::read_to_string(path)?;

        let manifest = Manifest::from_toml_str(&contents);
        if let Err(err) = &manifest {
            error!(
                "Could not build a valid manifest from {} due to err {err}",
                path.display()
            )
        }
        manifest
    }

    pub fn from_toml_str(data: &str) -> Result<Manifest, ParseError> {
        let manifest = toml::from_str::<Manifest>(data)?;
        if manifest.module.trim().is_empty() {
            return Err(ParseError::MissingKey("module".to_owned()));
        }
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> Result<String, ParseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ParseError> {
        write_atomically(path, &self.to_toml_string()?)
    }

    /// The dependency root declared by the manifest, or the default one.
    pub fn dep_root(&self) -> &str {
        self.dep_root.as_deref().unwrap_or(DEFAULT_DEP_ROOT)
    }

    /// Adds or replaces a dependency, returning the previous constraint.
    pub fn set_dependency(
        &mut self,
        module: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Option<String> {
        self.dependencies
            .insert(module.into(), Dependency::new(constraint))
            .map(|previous| previous.constraint)
    }
}

/// Walks up from `start` looking for a directory holding a manifest.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}
