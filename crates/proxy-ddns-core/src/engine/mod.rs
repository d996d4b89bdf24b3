//! Zone reconciler
//!
//! The Reconciler is responsible for:
//! - Fetching every record of the managed type in each zone
//! - Diffing them against the desired and removed hostname sets
//! - Applying updates, creates and deletes via DnsProvider
//! - Reporting what happened, per zone and per record
//!
//! ## Architecture
//!
//! ```text
//!                  desired / removed hosts, current IP
//!                                 │
//!                                 ▼
//!                        ┌──────────────┐
//!                        │  Reconciler  │
//!                        └──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌──────────────┐       ┌──────────────┐        ┌──────────────┐
//! │ RetryPolicy  │──────▶│ DnsProvider  │        │    Events    │
//! │ (per call)   │       │ (one call)   │        │  (notify)    │
//! └──────────────┘       └──────────────┘        └──────────────┘
//! ```
//!
//! ## Zone Flow
//!
//! 1. Skip the zone if its configuration is incomplete
//! 2. Fetch all pages of records; on failure skip the zone
//! 3. Update pass: desired records whose content is stale
//! 4. Create pass: desired hostnames owned by the zone with no record
//! 5. Delete pass: removed hostnames owned by the zone with a record
//!
//! A failure in one zone or one mutation never stops the others.

mod plan;
mod report;
mod retry;

pub use plan::{ReconciliationPlan, index_records, removed_hosts};
pub use report::{FailedMutation, MutationKind, RunReport, ZoneReport, ZoneStatus};
pub use retry::RetryPolicy;

use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::{DdnsConfig, ZoneConfig};
use crate::traits::{DnsProvider, DnsRecord, ProviderResponse, RecordPayload};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on pages fetched per zone
const MAX_PAGES: u32 = 1000;

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Zone processing started
    ZoneStarted { zone: String },

    /// Zone skipped because its configuration is incomplete
    ZoneSkipped { zone: String, reason: String },

    /// Zone records could not be fetched
    ZoneFetchFailed { zone: String, error: String },

    /// Record already points at the current IP
    RecordUnchanged { zone: String, name: String },

    /// Record content rewritten to the current IP
    RecordUpdated {
        zone: String,
        name: String,
        previous_content: String,
        new_content: String,
    },

    /// Record created
    RecordCreated {
        zone: String,
        name: String,
        id: Option<String>,
    },

    /// Record deleted
    RecordDeleted { zone: String, name: String },

    /// Provider rejected a mutation or never answered
    MutationFailed {
        zone: String,
        name: String,
        kind: MutationKind,
        error: String,
    },

    /// Zone processing finished
    ZoneFinished { zone: String, changed: bool },
}

/// Settings the reconciler applies to every zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Record type managed (A)
    pub record_type: String,
    /// Comment attached to created and updated records
    pub comment: String,
    /// Page size for record listings
    pub per_page: u32,
    /// Retry policy applied to every provider call
    pub retry: RetryPolicy,
    /// Capacity of the event channel
    pub event_channel_capacity: usize,
}

impl ReconcilerSettings {
    pub fn from_config(config: &DdnsConfig) -> Self {
        Self {
            record_type: config.provider.record_type.clone(),
            comment: config.provider.comment.clone(),
            per_page: config.provider.per_page,
            retry: RetryPolicy::from(&config.retry),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from_config(&DdnsConfig::default())
    }
}

/// Zone reconciler
///
/// Holds the provider and the per-run settings. One `reconcile` call is one
/// pass over every configured zone; the reconciler keeps no state between
/// calls.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Call [`Reconciler::reconcile()`] once per run
/// 3. Drain the event receiver if anything is interested
pub struct Reconciler {
    /// DNS provider for reading and mutating records
    provider: Box<dyn DnsProvider>,

    settings: ReconcilerSettings,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        provider: Box<dyn DnsProvider>,
        settings: ReconcilerSettings,
    ) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(settings.event_channel_capacity.max(1));

        let reconciler = Self {
            provider,
            settings,
            event_tx: tx,
        };

        (reconciler, rx)
    }

    /// Settings in effect
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Reconcile every zone
    ///
    /// # Parameters
    ///
    /// - `current_ip`: the IP every desired record should point at
    /// - `desired`: normalized hostnames that should exist
    /// - `previous`: hostnames desired by the previous run
    /// - `zones`: configured zones, in configuration order
    pub async fn reconcile(
        &self,
        current_ip: &str,
        desired: &BTreeSet<String>,
        previous: &BTreeSet<String>,
        zones: &[ZoneConfig],
    ) -> RunReport {
        let started_at = chrono::Utc::now();
        let removed = removed_hosts(previous, desired);
        if !removed.is_empty() {
            debug!("{} host(s) removed since the previous run", removed.len());
        }

        let mut reports = Vec::with_capacity(zones.len());
        for index in 0..zones.len() {
            let report = self
                .reconcile_zone(index, zones, current_ip, desired, &removed)
                .await;
            reports.push(report);
        }

        let report = RunReport {
            started_at,
            finished_at: chrono::Utc::now(),
            zones: reports,
        };
        info!("Reconciliation finished: {}", report);
        report
    }

    /// Reconcile `zones[index]`
    async fn reconcile_zone(
        &self,
        index: usize,
        zones: &[ZoneConfig],
        current_ip: &str,
        desired: &BTreeSet<String>,
        removed: &BTreeSet<String>,
    ) -> ZoneReport {
        let zone = &zones[index];
        let label = zone.domain_name.clone();

        if !zone.is_complete() {
            let reason = "missing name, API token or zone id".to_string();
            error!("Incomplete configuration for domain {:?}: {}", label, reason);
            self.emit_event(ReconcileEvent::ZoneSkipped {
                zone: label.clone(),
                reason: reason.clone(),
            });
            return ZoneReport::new(label, ZoneStatus::Skipped { reason });
        }

        self.emit_event(ReconcileEvent::ZoneStarted { zone: label.clone() });

        let existing = match self.fetch_records(zone).await {
            Ok(existing) => existing,
            Err(error) => {
                error!("Could not retrieve DNS records for domain {}: {}", label, error);
                self.emit_event(ReconcileEvent::ZoneFetchFailed {
                    zone: label.clone(),
                    error: error.clone(),
                });
                return ZoneReport::new(label, ZoneStatus::FetchFailed { error });
            }
        };
        debug!("Fetched {} {} record(s) for {}", existing.len(), self.settings.record_type, label);

        let plan = ReconciliationPlan::build(index, zones, &existing, current_ip, desired, removed);
        let mut report = ZoneReport::new(label.clone(), ZoneStatus::Reconciled);

        for name in &plan.unchanged {
            debug!("DNS record for {} is up to date", name);
            report.unchanged += 1;
            self.emit_event(ReconcileEvent::RecordUnchanged {
                zone: label.clone(),
                name: name.clone(),
            });
        }

        for record in &plan.updates {
            self.apply_update(zone, record, current_ip, &mut report).await;
        }

        for name in &plan.creates {
            self.apply_create(zone, name, current_ip, &mut report).await;
        }

        for name in &plan.already_gone {
            debug!("Removed host {} has no DNS record in {}", name, label);
        }

        for record in &plan.deletes {
            self.apply_delete(zone, record, &mut report).await;
        }

        self.emit_event(ReconcileEvent::ZoneFinished {
            zone: label,
            changed: report.changed(),
        });
        report
    }

    /// Fetch every page of records for `zone`, indexed by normalized name
    async fn fetch_records(&self, zone: &ZoneConfig) -> Result<BTreeMap<String, DnsRecord>, String> {
        let record_type = self.settings.record_type.as_str();
        let per_page = self.settings.per_page;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let operation = format!(
                "list {} records for {} (page {})",
                record_type, zone.domain_name, page
            );
            let response = self
                .settings
                .retry
                .call(&operation, || {
                    self.provider.list_records(zone, record_type, page, per_page)
                })
                .await;

            let total_pages = match response {
                Some(response) if response.success => {
                    let total = response.total_pages.unwrap_or(1);
                    records.extend(response.result.unwrap_or_default());
                    total
                }
                Some(response) => return Err(response.error_summary()),
                None => return Err("no response from provider".to_string()),
            };

            if page >= total_pages.min(MAX_PAGES) {
                break;
            }
            page += 1;
        }

        Ok(index_records(records))
    }

    async fn apply_update(
        &self,
        zone: &ZoneConfig,
        record: &DnsRecord,
        current_ip: &str,
        report: &mut ZoneReport,
    ) {
        let payload = self.payload(&record.name, current_ip);
        let operation = format!("update of {}", record.name);
        let response = self
            .settings
            .retry
            .call(&operation, || {
                self.provider.update_record(zone, &record.id, &payload)
            })
            .await;

        match outcome(response) {
            Ok(_) => {
                info!("Updated DNS record: {} -> {}", record.name, current_ip);
                report.updated.push(record.name.clone());
                self.emit_event(ReconcileEvent::RecordUpdated {
                    zone: zone.domain_name.clone(),
                    name: record.name.clone(),
                    previous_content: record.content.clone(),
                    new_content: current_ip.to_string(),
                });
            }
            Err(reason) => {
                error!("Failed to update DNS record for {}: {}", record.name, reason);
                self.record_failure(zone, MutationKind::Update, &record.name, reason, report);
            }
        }
    }

    async fn apply_create(
        &self,
        zone: &ZoneConfig,
        name: &str,
        current_ip: &str,
        report: &mut ZoneReport,
    ) {
        let payload = self.payload(name, current_ip);
        let operation = format!("creation of {}", name);
        let response = self
            .settings
            .retry
            .call(&operation, || self.provider.create_record(zone, &payload))
            .await;

        match outcome(response) {
            Ok(created) => {
                let id = created.map(|record| record.id);
                info!(
                    "Created DNS record: {} -> {} (ID: {})",
                    name,
                    current_ip,
                    id.as_deref().unwrap_or("unknown")
                );
                report.created.push(name.to_string());
                self.emit_event(ReconcileEvent::RecordCreated {
                    zone: zone.domain_name.clone(),
                    name: name.to_string(),
                    id,
                });
            }
            Err(reason) => {
                error!("Failed to create DNS record for {}: {}", name, reason);
                self.record_failure(zone, MutationKind::Create, name, reason, report);
            }
        }
    }

    async fn apply_delete(&self, zone: &ZoneConfig, record: &DnsRecord, report: &mut ZoneReport) {
        let operation = format!("deletion of {}", record.name);
        let response = self
            .settings
            .retry
            .call(&operation, || self.provider.delete_record(zone, &record.id))
            .await;

        match outcome(response) {
            Ok(_) => {
                info!("Deleted DNS record: {}", record.name);
                report.deleted.push(record.name.clone());
                self.emit_event(ReconcileEvent::RecordDeleted {
                    zone: zone.domain_name.clone(),
                    name: record.name.clone(),
                });
            }
            Err(reason) => {
                error!("Failed to delete DNS record for {}: {}", record.name, reason);
                self.record_failure(zone, MutationKind::Delete, &record.name, reason, report);
            }
        }
    }

    fn record_failure(
        &self,
        zone: &ZoneConfig,
        kind: MutationKind,
        name: &str,
        reason: String,
        report: &mut ZoneReport,
    ) {
        self.emit_event(ReconcileEvent::MutationFailed {
            zone: zone.domain_name.clone(),
            name: name.to_string(),
            kind,
            error: reason.clone(),
        });
        report.failed.push(FailedMutation {
            kind,
            hostname: name.to_string(),
            reason,
        });
    }

    fn payload(&self, name: &str, content: &str) -> RecordPayload {
        RecordPayload::managed(
            self.settings.record_type.as_str(),
            name,
            content,
            self.settings.comment.as_str(),
        )
    }

    /// Emit a reconcile event
    ///
    /// Events are dropped (with a warning) when the channel is full. A closed
    /// channel means nobody is listening, which is fine.
    fn emit_event(&self, event: ReconcileEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping reconcile event");
        }
    }
}

/// Collapse a retried call into applied / failed
fn outcome<T>(response: Option<ProviderResponse<T>>) -> Result<Option<T>, String> {
    match response {
        Some(response) if response.success => Ok(response.result),
        Some(response) => Err(response.error_summary()),
        None => Err("no response from provider".to_string()),
    }
}
