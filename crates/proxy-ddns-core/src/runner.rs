//! Run controller
//!
//! One invocation of the program is one run:
//!
//! ```text
//! Idle ──lock──▶ Running ──drop guard──▶ Idle
//! ```
//!
//! While running, the controller resolves the IP, queries the desired
//! hostnames, loads the previous set, hands everything to the [`Reconciler`]
//! and finally persists state. IP and domain failures are fatal; zone and
//! mutation failures are absorbed by the reconciler and only show up in the
//! report.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::ZoneConfig;
use crate::engine::{Reconciler, RunReport};
use crate::error::Result;
use crate::lock::{LockAttempt, RunLock};
use crate::traits::{DomainSource, IpSource, StateStore};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run went through every step
    Completed(RunReport),
    /// Another run holds the lock; nothing was done
    AlreadyRunning {
        /// Process id recorded in the lockfile
        owner: Option<u32>,
    },
}

/// Orchestrates one run
pub struct RunController {
    ip_source: Box<dyn IpSource>,
    domain_source: Box<dyn DomainSource>,
    state_store: Box<dyn StateStore>,
    reconciler: Reconciler,
    zones: Vec<ZoneConfig>,
    lock_path: PathBuf,
    persist_state: bool,
}

impl RunController {
    /// Create a controller
    ///
    /// State persistence is on; see [`RunController::with_persist_state`].
    pub fn new(
        ip_source: Box<dyn IpSource>,
        domain_source: Box<dyn DomainSource>,
        state_store: Box<dyn StateStore>,
        reconciler: Reconciler,
        zones: Vec<ZoneConfig>,
        lock_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            ip_source,
            domain_source,
            state_store,
            reconciler,
            zones,
            lock_path: lock_path.as_ref().to_path_buf(),
            persist_state: true,
        }
    }

    /// Enable or disable both state writes (dry runs disable them)
    pub fn with_persist_state(mut self, persist_state: bool) -> Self {
        self.persist_state = persist_state;
        self
    }

    /// Run once
    ///
    /// # Returns
    ///
    /// - `Ok(RunOutcome::Completed)`: every step ran; the report says what
    ///   changed and what failed
    /// - `Ok(RunOutcome::AlreadyRunning)`: the lockfile already existed
    /// - `Err(Error)`: a fatal step failed (lock creation, IP resolution,
    ///   domain source, previous-state load or previous-hosts write)
    ///
    /// The lock is released on every path out of this function, including
    /// when the returned future is dropped.
    pub async fn run(&self) -> Result<RunOutcome> {
        let _lock = match RunLock::acquire(&self.lock_path)? {
            LockAttempt::Acquired(lock) => lock,
            LockAttempt::Held { owner } => {
                match owner {
                    Some(pid) => info!("Script is already running (PID {}). Exiting.", pid),
                    None => info!("Script is already running. Exiting."),
                }
                return Ok(RunOutcome::AlreadyRunning { owner });
            }
        };

        let current_ip = self.ip_source.current().await?;
        info!("Current IP ({}): {}", self.ip_source.source_name(), current_ip);

        match self.state_store.last_applied_ip().await {
            Ok(Some(last)) if last != current_ip => {
                info!("IP changed from {} to {}", last, current_ip);
            }
            Ok(Some(_)) => debug!("IP unchanged since last applied run"),
            Ok(None) => debug!("No previously applied IP recorded"),
            Err(e) => warn!("Could not read last applied IP: {}", e),
        }

        let desired = self.domain_source.fetch().await?;
        info!(
            "Fetched {} hostname(s) from {}",
            desired.len(),
            self.domain_source.source_name()
        );

        let previous = self.state_store.load_previous_hosts().await?;

        let report = self
            .reconciler
            .reconcile(&current_ip, &desired, &previous, &self.zones)
            .await;

        if !self.persist_state {
            info!("State persistence disabled, skipping state writes");
            return Ok(RunOutcome::Completed(report));
        }

        if report.changed() {
            if let Err(e) = self.state_store.save_applied_ip(&current_ip).await {
                error!("Failed to record applied IP: {}", e);
            }
        } else {
            debug!("No changes applied, IP marker left as is");
        }

        self.state_store.save_previous_hosts(&desired).await?;

        Ok(RunOutcome::Completed(report))
    }
}
