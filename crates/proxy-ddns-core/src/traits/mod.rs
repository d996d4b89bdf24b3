//! Core traits for proxy-ddns
//!
//! This module defines the abstract interfaces the reconciler and the run
//! controller are written against.
//!
//! - [`IpSource`]: Resolve the host's current public IP
//! - [`DomainSource`]: Fetch the desired hostname set
//! - [`DnsProvider`]: Single-shot record CRUD against a provider API
//! - [`StateStore`]: Persist previous-run state between runs

pub mod ip_source;
pub mod domain_source;
pub mod dns_provider;
pub mod state_store;

pub use ip_source::{IpSource, validate_ipv4_shape};
pub use domain_source::DomainSource;
pub use dns_provider::{DnsProvider, DnsRecord, ProviderResponse, RecordPayload, AUTOMATIC_TTL};
pub use state_store::StateStore;
