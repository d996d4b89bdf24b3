// # File State Store
//
// File-based implementation of StateStore.
//
// ## Files
//
// - Previous hosts: one hostname per line, no header
// - Last applied IP: the IP as plain text, no trailing newline
//
// Both are plain text with no format version so they stay readable (and
// editable) by operators.
//
// ## Crash Safety
//
// Writes go to a `.tmp` sibling first and are then renamed over the target,
// so a crash mid-write never leaves a truncated file behind.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::StateStore;

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use proxy_ddns_core::state::FileStateStore;
/// use proxy_ddns_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("last_hosts.txt", "current_ip.txt");
///
///     let previous = store.load_previous_hosts().await?;
///     store.save_previous_hosts(&previous).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    hosts_path: PathBuf,
    ip_path: PathBuf,
}

impl FileStateStore {
    /// Create a store over the previous-hosts file and the IP marker file
    ///
    /// Nothing is touched on disk until the first read or write.
    pub fn new<H: AsRef<Path>, I: AsRef<Path>>(hosts_path: H, ip_path: I) -> Self {
        Self {
            hosts_path: hosts_path.as_ref().to_path_buf(),
            ip_path: ip_path.as_ref().to_path_buf(),
        }
    }

    /// Path of the previous-hosts file
    pub fn hosts_path(&self) -> &Path {
        &self.hosts_path
    }

    /// Path of the last-applied IP marker
    pub fn ip_path(&self) -> &Path {
        &self.ip_path
    }

    /// Read a file, mapping "not found" to `None`
    async fn read_optional(path: &Path) -> Result<Option<String>, Error> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write `content` to `path` atomically
    async fn write_atomic(path: &Path, content: &str) -> Result<(), Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = Self::temp_path(path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load_previous_hosts(&self) -> Result<BTreeSet<String>, Error> {
        let Some(content) = Self::read_optional(&self.hosts_path).await? else {
            return Ok(BTreeSet::new());
        };

        let hosts: BTreeSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        tracing::debug!("Loaded {} previous host(s)", hosts.len());
        Ok(hosts)
    }

    async fn save_previous_hosts(&self, hosts: &BTreeSet<String>) -> Result<(), Error> {
        let mut content = String::new();
        for host in hosts {
            content.push_str(host);
            content.push('\n');
        }
        Self::write_atomic(&self.hosts_path, &content).await
    }

    async fn last_applied_ip(&self) -> Result<Option<String>, Error> {
        let content = Self::read_optional(&self.ip_path).await?;
        Ok(content
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty()))
    }

    async fn save_applied_ip(&self, ip: &str) -> Result<(), Error> {
        Self::write_atomic(&self.ip_path, ip).await
    }
}
