//! Configuration types for proxy-ddns
//!
//! The configuration is a single JSON document loaded once at startup and
//! handed to each component's constructor. Field names follow the layout of
//! the `config.json` files already deployed next to the updater, so existing
//! files load unchanged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default IP-echo endpoint
pub const DEFAULT_IP_SOURCE_URL: &str = "http://ipv4.icanhazip.com";

/// Cloudflare API base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Comment attached to every record this system manages
pub const DEFAULT_RECORD_COMMENT: &str = "Managed by DDNS script";

/// Accepted `log_level` values (case-insensitive)
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error", "critical"];

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Log verbosity
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reverse-proxy database connection
    #[serde(rename = "mysql", default)]
    pub database: DatabaseConfig,

    /// DNS provider settings and managed zones
    #[serde(rename = "cloudflare", default)]
    pub provider: ProviderConfig,

    /// Local file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// IP-echo service
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Provider call retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl DdnsConfig {
    /// Read, parse and validate a configuration file
    ///
    /// Relative paths under `paths` are resolved against the directory that
    /// contains the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_json(&content).map_err(|e| {
            Error::config(format!(
                "Error parsing configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.paths = config.paths.resolve(base);
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration document without touching the filesystem
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.zones.is_empty() {
            return Err(Error::config("No domain configurations found"));
        }

        if self.provider.record_type.trim().is_empty() {
            return Err(Error::config("DNS record type cannot be empty"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level '{}' is not valid. Valid levels: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        if !(5..=5000).contains(&self.provider.per_page) {
            return Err(Error::config(format!(
                "per_page must be between 5 and 5000. Got: {}",
                self.provider.per_page
            )));
        }

        self.ip_source.validate()?;
        self.retry.validate()?;
        validate_url("cloudflare.api_base", &self.provider.api_base)?;

        Ok(())
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
            provider: ProviderConfig::default(),
            paths: PathsConfig::default(),
            ip_source: IpSourceConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{field} must use HTTP or HTTPS scheme. Got: {url}"
        )));
    }
    Ok(())
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// MySQL/MariaDB connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub user: String,
    #[serde(default = "default_db_name")]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_name(),
            password: default_db_name(),
            database: default_db_name(),
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("database", &self.database)
            .finish()
    }
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_name() -> String {
    "npm".to_string()
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The single record type managed per run
    #[serde(rename = "dns_record_type", default = "default_record_type")]
    pub record_type: String,

    /// Comment tag applied to managed records
    #[serde(rename = "cf_comment", default = "default_comment")]
    pub comment: String,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Page size for record listings
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Managed zones
    #[serde(rename = "domains", default)]
    pub zones: Vec<ZoneConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            record_type: default_record_type(),
            comment: default_comment(),
            api_base: default_api_base(),
            per_page: default_per_page(),
            zones: Vec::new(),
        }
    }
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_comment() -> String {
    DEFAULT_RECORD_COMMENT.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_per_page() -> u32 {
    100
}

/// One managed zone
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Apex or suffix owned by this zone (e.g. "example.com")
    #[serde(rename = "name", default)]
    pub domain_name: String,

    /// API token scoped to this zone
    /// ⚠️ NEVER log this value
    #[serde(rename = "cf_token", default)]
    pub api_token: String,

    /// Provider-assigned zone identifier
    #[serde(default)]
    pub zone_id: String,
}

impl ZoneConfig {
    /// Create a new zone configuration
    pub fn new(
        domain_name: impl Into<String>,
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            api_token: api_token.into(),
            zone_id: zone_id.into(),
        }
    }

    /// Whether every field needed to talk to the provider is present
    pub fn is_complete(&self) -> bool {
        !self.domain_name.trim().is_empty()
            && !self.api_token.trim().is_empty()
            && !self.zone_id.trim().is_empty()
    }
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ZoneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneConfig")
            .field("domain_name", &self.domain_name)
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

/// Local file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Last-applied IP marker
    #[serde(rename = "ip_file_path", default = "default_ip_file")]
    pub ip_file: PathBuf,

    /// Log destination
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Run lock
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Previous-hosts marker
    #[serde(default = "default_last_hosts_file")]
    pub last_hosts_file: PathBuf,
}

impl PathsConfig {
    /// Resolve relative paths against `base`; absolute paths are kept
    pub fn resolve(self, base: &Path) -> Self {
        Self {
            ip_file: base.join(self.ip_file),
            log_file: base.join(self.log_file),
            lock_file: base.join(self.lock_file),
            last_hosts_file: base.join(self.last_hosts_file),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ip_file: default_ip_file(),
            log_file: default_log_file(),
            lock_file: default_lock_file(),
            last_hosts_file: default_last_hosts_file(),
        }
    }
}

fn default_ip_file() -> PathBuf {
    PathBuf::from("current_ip.txt")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("ddns_debug.log")
}

fn default_lock_file() -> PathBuf {
    PathBuf::from("/tmp/ddns_update.lock")
}

fn default_last_hosts_file() -> PathBuf {
    PathBuf::from("last_hosts.txt")
}

/// IP-echo service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL returning the caller's public IPv4 as plain text
    #[serde(default = "default_ip_source_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("ip_source.url cannot be empty"));
        }
        validate_url("ip_source.url", &self.url)?;
        if self.timeout_secs == 0 {
            return Err(Error::config("ip_source.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_source_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ip_source_url() -> String {
    DEFAULT_IP_SOURCE_URL.to_string()
}

/// Retry policy for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Fixed delay between attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,

    /// Per-call timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RetryConfig {
    /// Validate the retry configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(Error::config(format!(
                "retry.max_attempts must be between 1 and 10. Got: {}",
                self.max_attempts
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("retry.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Delay between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}
