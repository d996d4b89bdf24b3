// # Run Lock
//
// Single-instance guard backed by a lockfile.
//
// The lockfile is created with create-new semantics and holds the owning
// process id as plain text. The guard removes the file when dropped, which
// covers normal completion, `?` propagation, panic unwinding and a dropped
// run future. A hard kill leaves the file behind; an operator has to remove
// it before the next run can start.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::Error;

/// Result of trying to take the lock
#[derive(Debug)]
pub enum LockAttempt {
    /// Lock taken; dropping the guard releases it
    Acquired(RunLock),
    /// Another run holds the lock
    Held {
        /// Process id found in the lockfile, if readable
        owner: Option<u32>,
    },
}

/// Held lockfile; removed on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock at `path`
    ///
    /// # Errors
    ///
    /// Any failure other than "already exists" (missing directory,
    /// permissions) is an `Error::Lock`.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<LockAttempt, Error> {
        let path = path.as_ref();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(LockAttempt::Held {
                    owner: Self::read_owner(path),
                });
            }
            Err(e) => {
                return Err(Error::lock(format!(
                    "Failed to create lock file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        // From here on the guard owns the file, so a failed write still cleans up.
        let lock = RunLock {
            path: path.to_path_buf(),
        };

        write!(file, "{}", std::process::id()).map_err(|e| {
            Error::lock(format!(
                "Failed to write lock file {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!("Lock acquired: {}", path.display());
        Ok(LockAttempt::Acquired(lock))
    }

    /// Process id recorded in the lockfile at `path`
    pub fn read_owner<P: AsRef<Path>>(path: P) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// Path of the held lockfile
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Lock released: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove lock file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
