// # Cloudflare DNS Provider
//
// DnsProvider implementation over the Cloudflare v4 DNS records API.
//
// ## Behavior
//
// - ✅ One HTTP request per trait call
// - ✅ Per-zone bearer token, taken from the ZoneConfig passed in
// - ✅ Per-request timeout (from the retry configuration)
// - ✅ Dry-run mode: listings are real, mutations are logged and faked
// - ❌ NO retry logic (owned by the reconciler's RetryPolicy)
// - ❌ NO caching (records are re-fetched every run)
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Access the state store
//
// ## Security Requirements
//
// - API tokens NEVER appear in logs or Debug output
// - The Authorization header is marked sensitive
//
// ## API Reference
//
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&page=N&per_page=M`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

mod envelope;

use async_trait::async_trait;
use proxy_ddns_core::config::{DdnsConfig, ZoneConfig};
use proxy_ddns_core::traits::{DnsProvider, DnsRecord, ProviderResponse, RecordPayload};
use proxy_ddns_core::{Error, Result};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Name reported in logs and errors
pub const PROVIDER_NAME: &str = "cloudflare";

/// Record id reported for records "created" in dry-run mode
pub const DRY_RUN_RECORD_ID: &str = "dry-run";

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP connection pool. The zone, and with it the
/// API token, is supplied on every call.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform listings against the real API
/// - Log the intended create/update/delete payloads
/// - **NOT** actually modify DNS records, answering as if it had
pub struct CloudflareProvider {
    /// HTTP client for API requests
    client: reqwest::Client,

    /// API base URL without trailing slash
    api_base: String,

    dry_run: bool,
}

// Custom Debug implementation; tokens never live here, the client is noise
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_base`: API root, normally `https://api.cloudflare.com/client/v4`
    /// - `timeout`: per-request timeout
    /// - `dry_run`: if true, perform listings but skip mutations
    pub fn new(api_base: impl Into<String>, timeout: Duration, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = api_base.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_base,
            dry_run,
        })
    }

    /// Create a provider from the loaded configuration
    pub fn from_config(config: &DdnsConfig, dry_run: bool) -> Result<Self> {
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(config.provider.api_base.clone(), config.retry.timeout(), dry_run)
    }

    /// Whether mutations are faked
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/{}", self.records_url(zone_id), record_id)
    }

    /// Authorization header for `zone`, marked sensitive
    fn auth_header(zone: &ZoneConfig) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", zone.api_token)).map_err(|_| {
            Error::config(format!(
                "API token for domain {} contains invalid characters",
                zone.domain_name
            ))
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Send one request and parse the v4 envelope
    async fn send<T: DeserializeOwned>(
        &self,
        zone: &ZoneConfig,
        request: reqwest::RequestBuilder,
    ) -> Result<ProviderResponse<T>> {
        let response = request
            .header(AUTHORIZATION, Self::auth_header(zone)?)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body: {}", e)))?;

        envelope::parse(status, &body)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ProviderResponse<Vec<DnsRecord>>> {
        tracing::debug!(
            "Listing {} records for {} (page {}, per_page {})",
            record_type,
            zone.domain_name,
            page,
            per_page
        );

        let page = page.to_string();
        let per_page = per_page.to_string();
        let request = self.client.get(self.records_url(&zone.zone_id)).query(&[
            ("type", record_type),
            ("page", page.as_str()),
            ("per_page", per_page.as_str()),
        ]);

        self.send(zone, request).await
    }

    async fn create_record(
        &self,
        zone: &ZoneConfig,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>> {
        let url = self.records_url(&zone.zone_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(payload)?
            );
            return Ok(ProviderResponse::ok(DnsRecord::new(
                DRY_RUN_RECORD_ID,
                payload.name.clone(),
                payload.content.clone(),
                payload.record_type.clone(),
            )));
        }

        self.send(zone, self.client.post(url).json(payload)).await
    }

    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>> {
        let url = self.record_url(&zone.zone_id, record_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(payload)?
            );
            return Ok(ProviderResponse::ok(DnsRecord::new(
                record_id,
                payload.name.clone(),
                payload.content.clone(),
                payload.record_type.clone(),
            )));
        }

        self.send(zone, self.client.put(url).json(payload)).await
    }

    async fn delete_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
    ) -> Result<ProviderResponse<serde_json::Value>> {
        let url = self.record_url(&zone.zone_id, record_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(ProviderResponse::ok(serde_json::json!({ "id": record_id })));
        }

        self.send(zone, self.client.delete(url)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens here; dry-run mutations must never get that far.
    const UNREACHABLE_BASE: &str = "http://127.0.0.1:9/client/v4/";

    fn zone() -> ZoneConfig {
        ZoneConfig::new("example.com", "secret_token_12345", "zone123")
    }

    fn provider(dry_run: bool) -> CloudflareProvider {
        CloudflareProvider::new(UNREACHABLE_BASE, Duration::from_secs(1), dry_run).unwrap()
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let provider = provider(false);

        assert_eq!(
            provider.records_url("zone123"),
            "http://127.0.0.1:9/client/v4/zones/zone123/dns_records"
        );
        assert_eq!(
            provider.record_url("zone123", "rec1"),
            "http://127.0.0.1:9/client/v4/zones/zone123/dns_records/rec1"
        );
    }

    #[test]
    fn auth_header_is_sensitive() {
        let header = CloudflareProvider::auth_header(&zone()).unwrap();

        assert!(header.is_sensitive());
        assert_eq!(header.to_str().unwrap(), "Bearer secret_token_12345");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let zone = ZoneConfig::new("example.com", "bad\ntoken", "zone123");

        let err = CloudflareProvider::auth_header(&zone).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.to_string().contains("bad"));
    }

    #[test]
    fn debug_output_has_no_secrets() {
        let debug_str = format!("{:?}", provider(true));

        assert!(debug_str.contains("CloudflareProvider"));
        assert!(debug_str.contains("dry_run: true"));
        assert!(!debug_str.contains("secret"));
    }

    #[test]
    fn from_config_uses_configured_base() {
        let mut config = DdnsConfig::default();
        config.provider.api_base = "https://cf.internal/v4".to_string();

        let provider = CloudflareProvider::from_config(&config, false).unwrap();

        assert_eq!(provider.api_base, "https://cf.internal/v4");
        assert!(!provider.is_dry_run());
        assert_eq!(provider.provider_name(), "cloudflare");
    }

    #[tokio::test]
    async fn dry_run_mutations_answer_without_network() {
        let provider = provider(true);
        let payload = RecordPayload::managed("A", "a.example.com", "1.2.3.4", "Managed by DDNS script");

        let created = provider.create_record(&zone(), &payload).await.unwrap();
        assert!(created.success);
        assert_eq!(created.result.unwrap().id, DRY_RUN_RECORD_ID);

        let updated = provider.update_record(&zone(), "rec1", &payload).await.unwrap();
        assert_eq!(updated.result.unwrap().id, "rec1");

        let deleted = provider.delete_record(&zone(), "rec1").await.unwrap();
        assert!(deleted.success);
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let provider = provider(false);

        let result = provider.list_records(&zone(), "A", 1, 100).await;

        assert!(matches!(result, Err(Error::Http(_))));
    }
}
