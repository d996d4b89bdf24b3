// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Keeps previous-run state for the lifetime of the process only. Useful for
// embedding the reconciler in a long-running host, and for tests.
//
// ## Crash Behavior
//
// - All state is lost on restart
// - The first run after a restart sees an empty previous-host set, so no
//   deletions happen until a second run has something to diff against

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::traits::state_store::StateStore;
use crate::Error;

/// In-memory state store implementation
///
/// Clones share the same underlying state.
///
/// # Example
///
/// ```rust,no_run
/// use proxy_ddns_core::state::MemoryStateStore;
/// use proxy_ddns_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     store.save_applied_ip("1.2.3.4").await?;
///     assert_eq!(store.last_applied_ip().await?, Some("1.2.3.4".to_string()));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    previous_hosts: BTreeSet<String>,
    applied_ip: Option<String>,
    hosts_saves: usize,
    ip_saves: usize,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already remembers `hosts` from a previous run
    pub fn with_previous_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MemoryState {
            previous_hosts: hosts.into_iter().map(Into::into).collect(),
            ..MemoryState::default()
        };
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Currently stored previous-host set
    pub async fn previous_hosts(&self) -> BTreeSet<String> {
        self.inner.read().await.previous_hosts.clone()
    }

    /// Currently stored applied IP
    pub async fn applied_ip(&self) -> Option<String> {
        self.inner.read().await.applied_ip.clone()
    }

    /// Number of times the previous-host set was saved
    pub async fn hosts_save_count(&self) -> usize {
        self.inner.read().await.hosts_saves
    }

    /// Number of times the applied IP was saved
    pub async fn ip_save_count(&self) -> usize {
        self.inner.read().await.ip_saves
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_previous_hosts(&self) -> Result<BTreeSet<String>, Error> {
        Ok(self.inner.read().await.previous_hosts.clone())
    }

    async fn save_previous_hosts(&self, hosts: &BTreeSet<String>) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.previous_hosts = hosts.clone();
        guard.hosts_saves += 1;
        Ok(())
    }

    async fn last_applied_ip(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.applied_ip.clone())
    }

    async fn save_applied_ip(&self, ip: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.applied_ip = Some(ip.to_string());
        guard.ip_saves += 1;
        Ok(())
    }
}
