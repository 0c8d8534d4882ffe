use std::{io::Write, path::Path};

use atomicwrites::{AtomicFile, OverwriteBehavior};
use thiserror::Error;

pub mod lock;
pub mod manifest;
pub mod module_path;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Missing TOML key `{0}` while parsing")]
    MissingKey(String),
    #[error("Unsupported lock file version {0}")]
    UnsupportedLockFileVersion(toml::Value),
    #[error("Lock file has no format version; regenerate it with `cpkg tidy`")]
    MissingLockFileVersion,
}

/// Replaces `path` with `contents` through a temporary file.
pub(crate) fn write_atomically(path: &Path, contents: &str) -> Result<(), ParseError> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| {
            f.write_all(contents.as_bytes())?;
            f.flush()
        })
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(())
}
