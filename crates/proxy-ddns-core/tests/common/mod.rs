//! Test doubles and common utilities for reconciler contract tests
//!
//! The mock provider keeps real per-zone record lists so that mutations are
//! visible to later listings, which is what idempotency tests need.

#![allow(dead_code)]

use proxy_ddns_core::engine::{ReconcileEvent, Reconciler, ReconcilerSettings};
use proxy_ddns_core::error::{Error, Result};
use proxy_ddns_core::traits::{
    DnsProvider, DnsRecord, DomainSource, IpSource, ProviderResponse, RecordPayload,
};
use proxy_ddns_core::ZoneConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One call observed by the mock provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { zone_id: String, page: u32 },
    Create { zone_id: String, payload: RecordPayload },
    Update { zone_id: String, id: String, payload: RecordPayload },
    Delete { zone_id: String, id: String },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::List { .. })
    }

    pub fn zone_id(&self) -> &str {
        match self {
            Call::List { zone_id, .. }
            | Call::Create { zone_id, .. }
            | Call::Update { zone_id, .. }
            | Call::Delete { zone_id, .. } => zone_id,
        }
    }

    /// Hostname a create or update targets
    pub fn payload_name(&self) -> Option<&str> {
        match self {
            Call::Create { payload, .. } | Call::Update { payload, .. } => Some(&payload.name),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    records: BTreeMap<String, Vec<DnsRecord>>,
    calls: Vec<Call>,
    next_id: usize,
    /// Hostnames whose mutations fail at the transport level
    unreachable_hosts: BTreeSet<String>,
    /// Hostnames whose mutations the provider rejects
    rejected_hosts: BTreeSet<String>,
    /// Zone ids whose listings fail at the transport level
    unreachable_zones: BTreeSet<String>,
    /// Zone ids whose listings the provider rejects
    rejected_zones: BTreeSet<String>,
    /// Overrides the requested page size
    page_size: Option<usize>,
}

/// A mock DnsProvider with in-memory zones that tracks calls
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// Create a MockDnsProvider that shares zones and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
        }
    }

    /// Seed a record into `zone_id`
    pub fn with_record(self, zone_id: &str, id: &str, name: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .records
            .entry(zone_id.to_string())
            .or_default()
            .push(DnsRecord::new(id, name, content, "A"));
        self
    }

    pub fn unreachable_for_host(self, name: &str) -> Self {
        self.state.lock().unwrap().unreachable_hosts.insert(name.to_string());
        self
    }

    pub fn rejecting_host(self, name: &str) -> Self {
        self.state.lock().unwrap().rejected_hosts.insert(name.to_string());
        self
    }

    pub fn unreachable_zone(self, zone_id: &str) -> Self {
        self.state.lock().unwrap().unreachable_zones.insert(zone_id.to_string());
        self
    }

    pub fn rejecting_zone(self, zone_id: &str) -> Self {
        self.state.lock().unwrap().rejected_zones.insert(zone_id.to_string());
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().unwrap().page_size = Some(page_size);
        self
    }

    /// Current records of `zone_id`, sorted by name
    pub fn records(&self, zone_id: &str) -> Vec<DnsRecord> {
        let mut records = self
            .state
            .lock()
            .unwrap()
            .records
            .get(zone_id)
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn list_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| !c.is_mutation()).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn mutation_gate<T>(state: &ProviderState, name: &str) -> Option<Result<ProviderResponse<T>>> {
        if state.unreachable_hosts.contains(name) {
            return Some(Err(Error::http(format!("connection reset while mutating {name}"))));
        }
        if state.rejected_hosts.contains(name) {
            return Some(Ok(ProviderResponse::rejected(vec![format!(
                "1004: DNS Validation Error for {name}"
            )])));
        }
        None
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(
        &self,
        zone: &ZoneConfig,
        record_type: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ProviderResponse<Vec<DnsRecord>>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List {
            zone_id: zone.zone_id.clone(),
            page,
        });

        if state.unreachable_zones.contains(&zone.zone_id) {
            return Err(Error::http("operation timed out"));
        }
        if state.rejected_zones.contains(&zone.zone_id) {
            return Ok(ProviderResponse::rejected(vec!["10000: Authentication error".to_string()]));
        }

        let size = state.page_size.unwrap_or(per_page as usize).max(1);
        let matching: Vec<DnsRecord> = state
            .records
            .get(&zone.zone_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.record_type == record_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let total_pages = matching.len().div_ceil(size).max(1) as u32;
        let page_records = matching
            .chunks(size)
            .nth(page.saturating_sub(1) as usize)
            .map(<[DnsRecord]>::to_vec)
            .unwrap_or_default();

        Ok(ProviderResponse::ok(page_records).with_total_pages(total_pages))
    }

    async fn create_record(
        &self,
        zone: &ZoneConfig,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            zone_id: zone.zone_id.clone(),
            payload: payload.clone(),
        });

        if let Some(gated) = Self::mutation_gate(&state, &payload.name) {
            return gated;
        }

        state.next_id += 1;
        let record = DnsRecord::new(
            format!("new-{}", state.next_id),
            payload.name.clone(),
            payload.content.clone(),
            payload.record_type.clone(),
        );
        state
            .records
            .entry(zone.zone_id.clone())
            .or_default()
            .push(record.clone());

        Ok(ProviderResponse::ok(record))
    }

    async fn update_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            zone_id: zone.zone_id.clone(),
            id: record_id.to_string(),
            payload: payload.clone(),
        });

        if let Some(gated) = Self::mutation_gate(&state, &payload.name) {
            return gated;
        }

        let record = state
            .records
            .get_mut(&zone.zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id));
        match record {
            Some(record) => {
                record.content = payload.content.clone();
                Ok(ProviderResponse::ok(record.clone()))
            }
            None => Ok(ProviderResponse::rejected(vec!["81044: Record does not exist".to_string()])),
        }
    }

    async fn delete_record(
        &self,
        zone: &ZoneConfig,
        record_id: &str,
    ) -> Result<ProviderResponse<serde_json::Value>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            zone_id: zone.zone_id.clone(),
            id: record_id.to_string(),
        });

        let name = state
            .records
            .get(&zone.zone_id)
            .and_then(|records| records.iter().find(|r| r.id == record_id))
            .map(|r| r.name.to_lowercase());
        if let Some(name) = &name
            && let Some(gated) = Self::mutation_gate(&state, name)
        {
            return gated;
        }

        let records = state.records.entry(zone.zone_id.clone()).or_default();
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Ok(ProviderResponse::rejected(vec!["81044: Record does not exist".to_string()]));
        }

        Ok(ProviderResponse::ok(serde_json::json!({ "id": record_id })))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An IpSource returning a fixed answer
pub struct StaticIpSource {
    ip: Option<String>,
    never_answers: bool,
    call_count: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            ip: Some(ip.to_string()),
            never_answers: false,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose lookup always fails
    pub fn unreachable() -> Self {
        Self {
            ip: None,
            never_answers: false,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose lookup never completes
    pub fn pending() -> Self {
        Self {
            ip: None,
            never_answers: true,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ip: other.ip.clone(),
            never_answers: other.never_answers,
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.never_answers {
            std::future::pending::<()>().await;
        }
        self.ip
            .clone()
            .ok_or_else(|| Error::ip_source("Failed to get current IP"))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A DomainSource returning a fixed hostname set
pub struct StaticDomainSource {
    hosts: Option<BTreeSet<String>>,
    call_count: Arc<AtomicUsize>,
}

impl StaticDomainSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            hosts: Some(hosts(names)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose query always fails
    pub fn unreachable() -> Self {
        Self {
            hosts: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            hosts: other.hosts.clone(),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl DomainSource for StaticDomainSource {
    async fn fetch(&self) -> std::result::Result<BTreeSet<String>, Error> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.hosts
            .clone()
            .ok_or_else(|| Error::domain_source("Can't connect to MySQL server"))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// Build a hostname set
pub fn hosts(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// A complete zone whose token is derived from its id
pub fn zone(domain_name: &str, zone_id: &str) -> ZoneConfig {
    ZoneConfig::new(domain_name, format!("token-{zone_id}"), zone_id)
}

/// Reconciler over a provider sharing state with `provider`
pub fn reconciler_for(provider: &MockDnsProvider) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    Reconciler::new(
        Box::new(MockDnsProvider::sharing_counters_with(provider)),
        ReconcilerSettings::default(),
    )
}

/// Collect every event currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
