// # Domain Source Trait
//
// Defines the interface for fetching the desired hostname set.
//
// ## Implementations
//
// - MySQL/MariaDB reverse-proxy database: `proxy-ddns-source-mysql` crate

use async_trait::async_trait;
use std::collections::BTreeSet;

/// Trait for desired-state sources
///
/// The returned set is rebuilt from scratch on every call. Every hostname in
/// it must already be normalized with [`crate::hostname::normalize`].
///
/// A failure is fatal for the run: reconciling against a partial desired set
/// would delete records for hosts that still exist.
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Fetch the current set of managed hostnames
    async fn fetch(&self) -> Result<BTreeSet<String>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
