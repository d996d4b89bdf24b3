// # proxy-ddns-core
//
// Core library for the proxy-host DNS reconciler.
//
// ## Architecture Overview
//
// One run brings a provider's A records in line with two inputs: the host's
// current public IP and the hostnames a reverse proxy serves.
// - **IpSource**: Trait for resolving the current public IP
// - **DomainSource**: Trait for querying the desired hostname set
// - **DnsProvider**: Trait for listing and mutating DNS records, per zone
// - **StateStore**: Trait for state carried between runs
// - **Reconciler**: Diffs and applies per-zone corrections
// - **RunController**: Lock, sequence, persist
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single-Shot Providers**: Retry lives in the engine, never in a provider
// 3. **Isolation**: A failed zone or record never stops the rest of the run
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod engine;
pub mod error;
pub mod hostname;
pub mod lock;
pub mod runner;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, DatabaseConfig, IpSourceConfig, PathsConfig, ProviderConfig, RetryConfig, ZoneConfig};
pub use engine::{ReconcileEvent, Reconciler, ReconcilerSettings, RetryPolicy, RunReport};
pub use error::{Error, Result};
pub use lock::{LockAttempt, RunLock};
pub use runner::{RunController, RunOutcome};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DnsProvider, DomainSource, IpSource, StateStore};
