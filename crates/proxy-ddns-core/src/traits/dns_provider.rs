// # DNS Provider Trait
//
// Defines the interface for reading and mutating DNS records via a provider API.
//
// ## Implementations
//
// - Cloudflare: `proxy-ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use proxy_ddns_core::traits::{DnsProvider, RecordPayload};
//
// let page = provider.list_records(&zone, "A", 1, 100).await?;
// if page.success {
//     for record in page.result.unwrap_or_default() {
//         println!("{} -> {}", record.name, record.content);
//     }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ZoneConfig;
use crate::error::Result;

/// TTL value meaning "automatic" at the provider
pub const AUTOMATIC_TTL: u32 = 1;

/// A DNS record as observed at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Opaque provider key, discovered per fetch
    pub id: String,
    /// Record name as returned by the provider
    pub name: String,
    /// Record content (the IP for A records)
    #[serde(default)]
    pub content: String,
    /// Record type
    #[serde(rename = "type", default)]
    pub record_type: String,
}

impl DnsRecord {
    /// Create a new record
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            record_type: record_type.into(),
        }
    }
}

/// Body of every create/update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub comment: String,
}

impl RecordPayload {
    /// Payload for a managed record: automatic TTL, not proxied, tagged
    pub fn managed(
        record_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
            ttl: AUTOMATIC_TTL,
            proxied: false,
            comment: comment.into(),
        }
    }
}

/// An answer that arrived from the provider
///
/// Arriving is not the same as succeeding: `success` carries the provider's
/// own verdict. Transport-level failures are reported as `Err` instead and
/// never produce a `ProviderResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse<T> {
    /// Application-level success flag
    pub success: bool,
    /// Result payload, when the provider sent one
    pub result: Option<T>,
    /// Error messages reported by the provider
    pub errors: Vec<String>,
    /// Total pages available (listings only)
    pub total_pages: Option<u32>,
}

impl<T> ProviderResponse<T> {
    /// A successful answer carrying `result`
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            errors: Vec::new(),
            total_pages: None,
        }
    }

    /// An answer in which the provider rejected the request
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            result: None,
            errors,
            total_pages: None,
        }
    }

    /// Attach a total page count
    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = Some(total_pages);
        self
    }

    /// Provider error messages joined for logging
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            "no error details".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Trait for DNS provider implementations
///
/// Every method performs exactly one API call against the zone it is given,
/// authenticated with that zone's token.
///
/// # Error contract
///
/// - `Err(Error)`: the provider did not answer usably (connection failure,
///   timeout, non-success HTTP status, unparseable body). The reconciler's
///   retry wrapper retries these.
/// - `Ok(ProviderResponse { success: false, .. })`: the provider answered and
///   rejected the request. Never retried; the caller logs it as a failure.
///
/// # Forbidden
///
/// - ❌ Retry or backoff (owned by the reconciler's `RetryPolicy`)
/// - ❌ Deciding whether a mutation is needed (owned by the reconciler)
/// - ❌ Touching local state (owned by `StateStore`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List one page of records of `record_type` in `zone`
    ///
    /// Pages are numbered from 1. The response should carry the provider's
    /// total page count when it reports one.
    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ProviderResponse<Vec<DnsRecord>>>;

    /// Create a record in `zone`
    async fn create_record(
        &self,
        zone: &ZoneConfig,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>>;

    /// Overwrite the record `record_id` in `zone` with `payload`
    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>>;

    /// Delete the record `record_id` from `zone`
    async fn delete_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
    ) -> Result<ProviderResponse<serde_json::Value>>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
