use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::{debug, info};
use thiserror::Error;

const LOCK_FILE_NAME: &str = ".cpkg.flock";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Exclusive advisory lock held while a project's lock file is rewritten.
/// Released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    path: PathBuf,
    _file: File,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Timed out waiting for another cpkg process holding {0}")]
    Timeout(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

impl ProjectLock {
    pub fn acquire(root: &Path) -> Result<Self, Error> {
        Self::acquire_with_timeout(root, DEFAULT_TIMEOUT)
    }

    pub fn acquire_with_timeout(root: &Path, timeout: Duration) -> Result<Self, Error> {
        let path = root.join(LOCK_FILE_NAME);
        debug!("Acquiring a lock on {}", path.display());
        let file = File::create(&path)?;
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(_) => {
                    debug!("Acquired a lock on {}", path.display());
                    return Ok(Self { path, _file: file });
                }
                Err(error) if error.raw_os_error() == fs4::lock_contended_error().raw_os_error() => {
                    if start.elapsed() >= timeout {
                        return Err(Error::Timeout(path.display().to_string()));
                    }
                    info!("Waiting for another cpkg process to release {}", path.display());
                    std::thread::sleep(Duration::from_millis(200).min(timeout));
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
