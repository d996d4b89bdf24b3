//! Run and zone reports

use chrono::{DateTime, Utc};
use std::fmt;

/// Kind of provider mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Create,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Update => write!(f, "update"),
            MutationKind::Create => write!(f, "create"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// A mutation the provider did not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedMutation {
    pub kind: MutationKind,
    pub hostname: String,
    pub reason: String,
}

/// How far a zone got
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneStatus {
    /// Records were fetched and every pass ran
    Reconciled,
    /// Zone configuration is incomplete; nothing was attempted
    Skipped { reason: String },
    /// Records could not be fetched; no mutation was attempted
    FetchFailed { error: String },
}

/// Outcome for a single zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneReport {
    pub zone: String,
    pub status: ZoneStatus,
    pub updated: Vec<String>,
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
    pub failed: Vec<FailedMutation>,
}

impl ZoneReport {
    pub(crate) fn new(zone: impl Into<String>, status: ZoneStatus) -> Self {
        Self {
            zone: zone.into(),
            status,
            updated: Vec::new(),
            created: Vec::new(),
            deleted: Vec::new(),
            unchanged: 0,
            failed: Vec::new(),
        }
    }

    /// Whether any mutation was applied in this zone
    pub fn changed(&self) -> bool {
        !(self.updated.is_empty() && self.created.is_empty() && self.deleted.is_empty())
    }

    /// Number of failures (a failed fetch counts as one)
    pub fn failure_count(&self) -> usize {
        let fetch = usize::from(matches!(self.status, ZoneStatus::FetchFailed { .. }));
        fetch + self.failed.len()
    }
}

/// Outcome of one reconciliation pass over all zones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub zones: Vec<ZoneReport>,
}

impl RunReport {
    /// Whether any zone applied a mutation
    pub fn changed(&self) -> bool {
        self.zones.iter().any(ZoneReport::changed)
    }

    /// Total failures across zones
    pub fn failure_count(&self) -> usize {
        self.zones.iter().map(ZoneReport::failure_count).sum()
    }

    pub fn updated_count(&self) -> usize {
        self.zones.iter().map(|z| z.updated.len()).sum()
    }

    pub fn created_count(&self) -> usize {
        self.zones.iter().map(|z| z.created.len()).sum()
    }

    pub fn deleted_count(&self) -> usize {
        self.zones.iter().map(|z| z.deleted.len()).sum()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} zone(s): {} updated, {} created, {} deleted, {} failure(s) in {}ms",
            self.zones.len(),
            self.updated_count(),
            self.created_count(),
            self.deleted_count(),
            self.failure_count(),
            self.duration().num_milliseconds()
        )
    }
}
