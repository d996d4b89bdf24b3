//! Cloudflare v4 response envelope
//!
//! Every v4 endpoint answers with the same wrapper:
//!
//! ```json
//! {
//!   "success": true,
//!   "errors": [{ "code": 1004, "message": "DNS Validation Error" }],
//!   "messages": [],
//!   "result": { ... },
//!   "result_info": { "page": 1, "per_page": 100, "total_pages": 3 }
//! }
//! ```

use proxy_ddns_core::traits::ProviderResponse;
use proxy_ddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::PROVIDER_NAME;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

impl ApiMessage {
    fn render(&self) -> String {
        match self.code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    total_pages: Option<u32>,
}

/// Turn an HTTP status and body into a provider answer
///
/// Non-2xx statuses and bodies that are not an envelope are transport
/// failures (`Err`), which the engine retries. A well-formed envelope on a
/// 2xx status is an answer, whatever its `success` flag says.
pub(crate) fn parse<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<ProviderResponse<T>> {
    if !status.is_success() {
        return Err(status_error(status, body));
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
        Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e))
    })?;

    let total_pages = envelope.result_info.and_then(|info| info.total_pages);
    Ok(ProviderResponse {
        success: envelope.success,
        result: envelope.result,
        errors: envelope.errors.iter().map(ApiMessage::render).collect(),
        total_pages,
    })
}

/// Map an unsuccessful HTTP status to an error
fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = error_detail(body);
    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Zone or record not found. Status: {} - {}", status, detail),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error (transient): {} - {}", status, detail),
        _ => format!("Request rejected: {} - {}", status, detail),
    };
    Error::provider(PROVIDER_NAME, message)
}

/// Error messages from an envelope body, or the raw body when it is not one
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .iter()
            .map(ApiMessage::render)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_ddns_core::traits::DnsRecord;

    #[test]
    fn listing_carries_records_and_page_count() {
        let body = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [
                {"id": "r1", "name": "a.example.com", "type": "A", "content": "1.2.3.4", "ttl": 1, "proxied": false}
            ],
            "result_info": {"page": 1, "per_page": 100, "count": 1, "total_count": 1, "total_pages": 4}
        }"#;

        let response: ProviderResponse<Vec<DnsRecord>> = parse(StatusCode::OK, body).unwrap();

        assert!(response.success);
        assert_eq!(response.total_pages, Some(4));
        assert_eq!(
            response.result.unwrap(),
            vec![DnsRecord::new("r1", "a.example.com", "1.2.3.4", "A")]
        );
    }

    #[test]
    fn application_failure_is_an_answer() {
        let body = r#"{"success": false, "errors": [{"code": 81057, "message": "Record already exists."}], "result": null}"#;

        let response: ProviderResponse<DnsRecord> = parse(StatusCode::OK, body).unwrap();

        assert!(!response.success);
        assert!(response.result.is_none());
        assert_eq!(response.errors, vec!["81057: Record already exists.".to_string()]);
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let body = r#"{"success": false, "errors": [{"code": 1004, "message": "DNS Validation Error"}]}"#;

        let err = parse::<DnsRecord>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(err.to_string().contains("1004: DNS Validation Error"));

        let err = parse::<DnsRecord>(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(err.to_string().contains("transient"));
    }

    #[test]
    fn auth_failure_does_not_echo_body() {
        let err = parse::<DnsRecord>(StatusCode::FORBIDDEN, "Bearer secret").unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn garbage_body_is_a_transport_error() {
        assert!(matches!(
            parse::<DnsRecord>(StatusCode::OK, "not json"),
            Err(Error::Provider { .. })
        ));
    }

    #[test]
    fn delete_result_is_kept_as_json() {
        let body = r#"{"success": true, "errors": [], "result": {"id": "r1"}}"#;

        let response: ProviderResponse<serde_json::Value> = parse(StatusCode::OK, body).unwrap();

        assert_eq!(response.result, Some(serde_json::json!({"id": "r1"})));
        assert_eq!(response.total_pages, None);
    }
}
