// # State Store Trait
//
// Defines the interface for state carried from one run to the next.
//
// ## Purpose
//
// Two pieces of state survive between runs:
// - The previous run's desired hostname set, used to detect removed hosts
// - The last IP a run successfully applied (informational marker)
//
// ## Implementations
//
// - File-based: plain-text files (see `state::file`)
// - In-memory: for embedding and tests (see `state::memory`)

use async_trait::async_trait;
use std::collections::BTreeSet;

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
///
/// ## Forbidden Capabilities
/// - ❌ Decide what to save or when (owned by `RunController`)
/// - ❌ Perform DNS calls (owned by `DnsProvider`)
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the hostname set saved by the previous run
    ///
    /// A store that has never been written returns an empty set.
    async fn load_previous_hosts(&self) -> Result<BTreeSet<String>, crate::Error>;

    /// Replace the saved hostname set
    async fn save_previous_hosts(&self, hosts: &BTreeSet<String>) -> Result<(), crate::Error>;

    /// The last IP a run applied, if any was ever recorded
    async fn last_applied_ip(&self) -> Result<Option<String>, crate::Error>;

    /// Record `ip` as the last applied IP
    async fn save_applied_ip(&self, ip: &str) -> Result<(), crate::Error>;
}
