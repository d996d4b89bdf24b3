// # HTTP IP Source
//
// Resolves the public IPv4 address by asking an IP-echo service (by default
// http://ipv4.icanhazip.com) over plain HTTP.
//
// ## Behavior
//
// - One GET per `current()` call, with a fixed timeout
// - Non-2xx status, transport error or a body that does not look like a
//   dotted quad → `Error::IpSource`
// - No retry and no caching: a failure here is fatal for the run
//
// ## Architecture
//
// The service answers with the caller's address as text, e.g. `203.0.113.7\n`.

use async_trait::async_trait;
use proxy_ddns_core::config::IpSourceConfig;
use proxy_ddns_core::traits::{IpSource, validate_ipv4_shape};
use proxy_ddns_core::{Error, Result};
use std::time::Duration;

/// HTTP-based IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: IP-echo endpoint (e.g., "http://ipv4.icanhazip.com")
    /// - `timeout`: request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create from the `ip_source` configuration section
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.timeout())
    }

    /// Endpoint queried
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<String> {
        tracing::debug!("HTTP GET Request to {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            Error::ip_source(format!("Failed to get current IP address: {}", e))
        })?;

        let status = response.status();
        tracing::debug!("Response Status Code: {}", status);

        if !status.is_success() {
            return Err(Error::ip_source(format!(
                "Failed to get current IP address: HTTP {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::ip_source(format!("Failed to read IP service response: {}", e))
        })?;
        tracing::debug!("Response Body: {}", body.trim());

        validate_ipv4_shape(&body)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
