// # IP Source Trait
//
// Defines the interface for resolving the host's current public IP.
//
// ## Implementations
//
// - HTTP IP-echo service: `proxy-ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use proxy_ddns_core::IpSource;
//
// async fn show(source: &dyn IpSource) -> proxy_ddns_core::Result<()> {
//     let ip = source.current().await?;
//     println!("Current IP: {ip}");
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for IP source implementations
///
/// A single call resolves the IP once. Implementations must not retry: a
/// failure here is fatal for the run, since nothing can be reconciled without
/// a current address.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address as text
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: A dotted-quad shaped address (see [`validate_ipv4_shape`])
    /// - `Err(Error)`: The lookup failed or returned something else
    async fn current(&self) -> Result<String>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Check that `body` looks like a dotted-quad IPv4 address
///
/// The check is intentionally weak: the trimmed text must be non-empty and
/// contain exactly three `.` separators. Octet ranges are not verified.
pub fn validate_ipv4_shape(body: &str) -> Result<String> {
    let candidate = body.trim();
    if candidate.is_empty() || candidate.matches('.').count() != 3 {
        return Err(Error::ip_source(format!(
            "Invalid IP address retrieved: {:?}",
            candidate
        )));
    }
    Ok(candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_quads() {
        assert_eq!(validate_ipv4_shape("1.2.3.4\n").unwrap(), "1.2.3.4");
        assert_eq!(validate_ipv4_shape("  203.0.113.7 ").unwrap(), "203.0.113.7");
    }

    #[test]
    fn validation_is_shape_only() {
        // Out-of-range octets still pass; only the separator count matters.
        assert!(validate_ipv4_shape("999.1.1.1").is_ok());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(validate_ipv4_shape("").is_err());
        assert!(validate_ipv4_shape("1.2.3").is_err());
        assert!(validate_ipv4_shape("1.2.3.4.5").is_err());
        assert!(validate_ipv4_shape("2001:db8::1").is_err());
        assert!(validate_ipv4_shape("<html>error</html>").is_err());
    }
}
