//! Per-zone reconciliation plan
//!
//! Pure diffing: given what the provider has, what is desired now and what
//! was desired last run, decide which records to update, create and delete.
//! No I/O happens here.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ZoneConfig;
use crate::hostname::{normalize, owning_zone};
use crate::traits::DnsRecord;

/// Hostnames desired last run but not any more
pub fn removed_hosts(previous: &BTreeSet<String>, desired: &BTreeSet<String>) -> BTreeSet<String> {
    previous.difference(desired).cloned().collect()
}

/// Index provider records by normalized name
///
/// Each record's `name` is rewritten to its normalized form. When the
/// provider returns several records with the same name the last one wins.
pub fn index_records<I>(records: I) -> BTreeMap<String, DnsRecord>
where
    I: IntoIterator<Item = DnsRecord>,
{
    let mut existing = BTreeMap::new();
    for mut record in records {
        record.name = normalize(&record.name);
        if let Some(shadowed) = existing.insert(record.name.clone(), record) {
            tracing::debug!(
                "Duplicate record for {} (id {}), keeping the later one",
                shadowed.name,
                shadowed.id
            );
        }
    }
    existing
}

/// Corrective actions for one zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Existing records whose content must change to the current IP
    pub updates: Vec<DnsRecord>,
    /// Desired hostnames owned by the zone with no record yet
    pub creates: Vec<String>,
    /// Live records for hostnames removed since the previous run
    pub deletes: Vec<DnsRecord>,
    /// Desired records already pointing at the current IP
    pub unchanged: Vec<String>,
    /// Removed hostnames owned by the zone that have no live record
    pub already_gone: Vec<String>,
}

impl ReconciliationPlan {
    /// Build the plan for `zones[zone_index]`
    ///
    /// - update: every existing record whose name is desired and whose
    ///   content differs from `current_ip`
    /// - create: every desired hostname owned by this zone without a record
    /// - delete: every removed hostname owned by this zone with a record
    pub fn build(
        zone_index: usize,
        zones: &[ZoneConfig],
        existing: &BTreeMap<String, DnsRecord>,
        current_ip: &str,
        desired: &BTreeSet<String>,
        removed: &BTreeSet<String>,
    ) -> Self {
        let mut plan = Self::default();
        let owned = |host: &str| owning_zone(host, zones) == Some(zone_index);

        for (name, record) in existing {
            if !desired.contains(name) {
                continue;
            }
            if record.content == current_ip {
                plan.unchanged.push(name.clone());
            } else {
                plan.updates.push(record.clone());
            }
        }

        for host in desired {
            if owned(host) && !existing.contains_key(host) {
                plan.creates.push(host.clone());
            }
        }

        for host in removed {
            if !owned(host) {
                continue;
            }
            match existing.get(host) {
                Some(record) => plan.deletes.push(record.clone()),
                None => plan.already_gone.push(host.clone()),
            }
        }

        plan
    }

    /// Number of provider mutations the plan calls for
    pub fn mutation_count(&self) -> usize {
        self.updates.len() + self.creates.len() + self.deletes.len()
    }

    /// Whether the zone is already settled
    pub fn is_empty(&self) -> bool {
        self.mutation_count() == 0
    }
}
