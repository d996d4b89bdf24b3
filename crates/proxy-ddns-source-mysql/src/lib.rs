// # MySQL Domain Source
//
// Reads the desired hostname set from a reverse-proxy database
// (Nginx Proxy Manager schema, MySQL or MariaDB).
//
// ## Query
//
// ```sql
// SELECT domain_names FROM proxy_host WHERE is_deleted = 0
// ```
//
// `domain_names` holds a JSON array of strings per row, e.g.
// `["example.com","www.example.com"]`. Every name is normalized and the
// union over all rows is returned.
//
// ## Behavior
//
// - One connection per fetch, closed afterwards
// - Connection, query or JSON decoding failure → `Error::DomainSource`
//   (fatal for the run)

use async_trait::async_trait;
use proxy_ddns_core::config::DatabaseConfig;
use proxy_ddns_core::hostname::normalize;
use proxy_ddns_core::traits::DomainSource;
use proxy_ddns_core::{Error, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use std::collections::BTreeSet;
use tokio_stream::StreamExt;

/// Active proxy hosts; the cast makes JSON columns decode as text on both
/// MySQL and MariaDB
const ACTIVE_HOSTS_QUERY: &str =
    "SELECT CAST(domain_names AS CHAR) AS domain_names FROM proxy_host WHERE is_deleted = 0";

/// Domain source backed by the proxy manager's `proxy_host` table
pub struct MySqlDomainSource {
    options: MySqlConnectOptions,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for MySqlDomainSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDomainSource")
            .field("options", &"<REDACTED>")
            .finish()
    }
}

impl MySqlDomainSource {
    /// Create a source; no connection is made until [`DomainSource::fetch`]
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .disable_statement_logging();

        Self { options }
    }

    async fn query_rows(&self) -> std::result::Result<Vec<Option<String>>, sqlx::Error> {
        let mut conn = MySqlConnection::connect_with(&self.options).await?;

        let mut rows = Vec::new();
        {
            let mut stream = sqlx::query_scalar::<_, Option<String>>(ACTIVE_HOSTS_QUERY).fetch(&mut conn);
            while let Some(row) = stream.next().await {
                rows.push(row?);
            }
        }

        conn.close().await?;
        Ok(rows)
    }
}

/// Build the normalized hostname set from raw `domain_names` values
///
/// NULL rows and blank names are skipped; a row that is not a JSON array of
/// strings fails the whole fetch.
pub fn hosts_from_rows<I, S>(rows: I) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut hosts = BTreeSet::new();

    for (index, row) in rows.into_iter().enumerate() {
        let Some(raw) = row else {
            tracing::debug!("Skipping proxy host row {} with NULL domain_names", index);
            continue;
        };

        let names: Vec<String> = serde_json::from_str(raw.as_ref()).map_err(|e| {
            Error::domain_source(format!(
                "Invalid domain_names value in proxy host row {}: {}",
                index, e
            ))
        })?;

        for name in names {
            let normalized = normalize(&name);
            if normalized.is_empty() {
                continue;
            }
            hosts.insert(normalized);
        }
    }

    Ok(hosts)
}

#[async_trait]
impl DomainSource for MySqlDomainSource {
    async fn fetch(&self) -> Result<BTreeSet<String>> {
        let rows = self
            .query_rows()
            .await
            .map_err(|e| Error::domain_source(format!("Error fetching proxy domains: {}", e)))?;

        let hosts = hosts_from_rows(rows)?;

        tracing::info!("Current proxy domains:");
        for host in &hosts {
            tracing::info!(" - {}", host);
        }

        Ok(hosts)
    }

    fn source_name(&self) -> &'static str {
        "mysql"
    }
}
