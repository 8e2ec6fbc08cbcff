//! Transparency ledger
//!
//! Every complaint carries a SHA-256 hash chain: the record hash commits to the
//! fields fixed at submission, and each status entry hashes its own canonical
//! fields together with the previous link. Anyone holding the complaint JSON
//! can recompute the chain and detect rewritten history.

use crate::models::{Complaint, ComplaintId, ComplaintStatus, StatusUpdate};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Incremental hasher writing length-prefixed fields so that adjacent
/// values cannot be shifted into one another.
struct Canonical(Sha256);

impl Canonical {
    fn new(domain: &str) -> Self {
        let mut this = Self(Sha256::new());
        this.field(domain);
        this
    }

    fn field(&mut self, value: &str) -> &mut Self {
        self.0.update((value.len() as u64).to_be_bytes());
        self.0.update(value.as_bytes());
        self
    }

    fn finish(self) -> String {
        hex::encode(self.0.finalize())
    }
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Hash of the immutable complaint record
pub fn record_hash(complaint: &Complaint) -> String {
    let mut hasher = Canonical::new("civic-complaint/record/v1");
    hasher
        .field(complaint.id.as_str())
        .field(&complaint.description)
        .field(complaint.category.as_str())
        .field(&complaint.location)
        .field(
            &complaint
                .coordinates
                .map(|c| format!("{},{}", c.latitude, c.longitude))
                .unwrap_or_default(),
        )
        .field(&complaint.attachments.join("\n"))
        .field(complaint.priority.as_str())
        .field(&complaint.submitted_by)
        .field(&timestamp(&complaint.submitted_at));
    hasher.finish()
}

/// Hash of one status entry chained onto `prev`
pub fn entry_hash(prev: &str, id: &ComplaintId, entry: &StatusUpdate) -> String {
    let mut hasher = Canonical::new("civic-complaint/entry/v1");
    hasher
        .field(prev)
        .field(id.as_str())
        .field(&timestamp(&entry.timestamp))
        .field(entry.status.as_str())
        .field(&entry.description)
        .field(&entry.department)
        .field(&entry.progress.map(|p| p.to_string()).unwrap_or_default());
    hasher.finish()
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub sequence: usize,
    pub timestamp: DateTime<Utc>,
    pub status: ComplaintStatus,
    pub department: String,
    pub description: String,
    pub prev_hash: String,
    pub hash: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerView {
    pub complaint_id: ComplaintId,
    pub record_hash: String,
    pub head_hash: Option<String>,
    pub verified: bool,
    pub entries: Vec<LedgerEntry>,
}

/// Recompute the chain for a complaint. A link stays invalid once any
/// earlier link fails, since its predecessor can no longer be trusted.
pub fn ledger_view(complaint: &Complaint) -> LedgerView {
    let record = record_hash(complaint);
    let mut prev = record.clone();
    let mut chain_intact = true;
    let mut entries = Vec::with_capacity(complaint.updates.len());

    for (sequence, update) in complaint.updates.iter().enumerate() {
        let expected = entry_hash(&prev, &complaint.id, update);
        chain_intact = chain_intact && expected == update.hash;

        entries.push(LedgerEntry {
            sequence,
            timestamp: update.timestamp,
            status: update.status,
            department: update.department.clone(),
            description: update.description.clone(),
            prev_hash: prev,
            hash: update.hash.clone(),
            valid: chain_intact,
        });
        prev = update.hash.clone();
    }

    LedgerView {
        complaint_id: complaint.id.clone(),
        record_hash: record,
        head_hash: complaint.updates.last().map(|u| u.hash.clone()),
        verified: chain_intact && !complaint.updates.is_empty(),
        entries,
    }
}

pub fn verify(complaint: &Complaint) -> bool {
    ledger_view(complaint).verified
}
