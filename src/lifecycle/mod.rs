//! Complaint lifecycle
//!
//! Canonical stages run `submitted -> assigned -> in_progress -> resolved`.
//! `update` entries are informational and leave the stage untouched;
//! `rejected` is a second terminal state reachable only from `submitted`.
//!
//! Complaints change exclusively by appending [`StatusUpdate`] entries, and the
//! complaint `status` always mirrors the newest entry.

use crate::ledger;
use crate::models::{
    Complaint, ComplaintId, ComplaintStatus, NewComplaint, StatusChange, StatusUpdate,
};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use thiserror::Error;

/// Department recorded on entries written by the service itself
pub const SYSTEM_DEPARTMENT: &str = "System";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Cannot move complaint from '{from}' to '{to}'")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Complaint {id} has an inconsistent history: {reason}")]
    MalformedRecord { id: ComplaintId, reason: String },
}

// =============================================================================
// Transition rules
// =============================================================================

/// Check whether `requested` may be appended while the complaint sits in `stage`
pub fn check_transition(
    stage: ComplaintStatus,
    requested: ComplaintStatus,
) -> Result<(), LifecycleError> {
    use ComplaintStatus::*;

    let allowed = match (stage, requested) {
        (Submitted, Assigned) | (Assigned, InProgress) | (InProgress, Resolved) => true,
        (Submitted, Rejected) => true,
        (Assigned, Update) | (InProgress, Update) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            from: stage,
            to: requested,
        })
    }
}

/// Completion percentage at which a stage starts
pub fn progress_floor(stage: ComplaintStatus) -> u8 {
    match stage {
        ComplaintStatus::Submitted | ComplaintStatus::Update => 0,
        ComplaintStatus::Assigned => 25,
        ComplaintStatus::InProgress => 65,
        ComplaintStatus::Resolved | ComplaintStatus::Rejected => 100,
    }
}

/// Clamp an explicit percentage into `[floor(stage), floor(next stage))`
pub fn clamp_progress(stage: ComplaintStatus, requested: u8) -> u8 {
    let floor = progress_floor(stage);
    let ceiling = match stage {
        ComplaintStatus::Assigned => progress_floor(ComplaintStatus::InProgress) - 1,
        ComplaintStatus::InProgress => progress_floor(ComplaintStatus::Resolved) - 1,
        _ => floor,
    };
    requested.clamp(floor, ceiling)
}

/// Timestamp for a new entry: now at microsecond resolution, strictly after `last`
pub fn next_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

// =============================================================================
// Complaint operations
// =============================================================================

impl Complaint {
    /// Canonical stage: status of the newest entry that is not an `update`
    pub fn stage(&self) -> ComplaintStatus {
        self.updates
            .iter()
            .rev()
            .map(|u| u.status)
            .find(|s| *s != ComplaintStatus::Update)
            .unwrap_or(ComplaintStatus::Submitted)
    }

    /// Displayed completion percentage
    pub fn progress(&self) -> u8 {
        let mut stage = ComplaintStatus::Submitted;
        let mut progress = 0;

        for update in &self.updates {
            match update.status {
                ComplaintStatus::Update => {
                    if let Some(explicit) = update.progress {
                        progress = clamp_progress(stage, explicit);
                    }
                }
                status => {
                    stage = status;
                    progress = progress_floor(status);
                }
            }
        }

        progress
    }

    pub fn last_update(&self) -> Option<&StatusUpdate> {
        self.updates.last()
    }

    pub fn is_closed(&self) -> bool {
        self.stage().is_terminal()
    }
}

/// Create a complaint in the `submitted` state with its initial entry
pub fn open_complaint(
    id: ComplaintId,
    new: NewComplaint,
    submitted_at: DateTime<Utc>,
    note: &str,
) -> Complaint {
    let submitted_at = submitted_at.trunc_subsecs(6);

    let mut complaint = Complaint {
        id,
        description: new.description,
        category: new.category,
        location: new.location,
        coordinates: new.coordinates,
        attachments: new.attachments,
        priority: new.priority,
        status: ComplaintStatus::Submitted,
        submitted_by: new.submitted_by,
        submitted_at,
        routed_to: new.routed_to,
        assigned_to: None,
        updates: Vec::with_capacity(4),
    };

    let entry = StatusUpdate {
        timestamp: submitted_at,
        status: ComplaintStatus::Submitted,
        description: note.to_string(),
        department: SYSTEM_DEPARTMENT.to_string(),
        progress: None,
        hash: String::new(),
    };
    push_entry(&mut complaint, entry);

    complaint
}

/// Validate `change` against the complaint's current stage and append it
pub fn apply_change(
    complaint: &mut Complaint,
    change: StatusChange,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let stage = complaint.stage();
    check_transition(stage, change.status)?;

    let timestamp = next_timestamp(complaint.last_update().map(|u| u.timestamp), now);
    let progress = match change.status {
        ComplaintStatus::Update => change.progress.map(|p| clamp_progress(stage, p)),
        _ => None,
    };

    if change.status == ComplaintStatus::Assigned {
        complaint.assigned_to = change
            .assigned_to
            .clone()
            .or_else(|| complaint.routed_to.clone())
            .or_else(|| Some(change.department.clone()));
    }

    let entry = StatusUpdate {
        timestamp,
        status: change.status,
        description: change.description,
        department: change.department,
        progress,
        hash: String::new(),
    };
    push_entry(complaint, entry);

    tracing::debug!(
        "Complaint {} moved {} -> {}",
        complaint.id,
        stage,
        complaint.status
    );

    Ok(())
}

/// Check a complete record against the history invariants: a leading
/// `submitted` entry, legal transitions, strictly increasing timestamps and
/// `status` equal to the newest entry.
pub fn check_record(complaint: &Complaint) -> Result<(), LifecycleError> {
    let malformed = |reason: String| LifecycleError::MalformedRecord {
        id: complaint.id.clone(),
        reason,
    };

    let Some((first, rest)) = complaint.updates.split_first() else {
        return Err(malformed("no status updates".to_string()));
    };
    if first.status != ComplaintStatus::Submitted {
        return Err(malformed(format!("first entry is '{}'", first.status)));
    }

    let mut stage = ComplaintStatus::Submitted;
    let mut last = first.timestamp;
    for (position, update) in rest.iter().enumerate() {
        if update.timestamp <= last {
            return Err(malformed(format!(
                "entry {} is not after its predecessor",
                position + 1
            )));
        }
        check_transition(stage, update.status)?;
        if update.status != ComplaintStatus::Update {
            stage = update.status;
        }
        last = update.timestamp;
    }

    let newest = complaint.updates.last().map_or(first.status, |u| u.status);
    if complaint.status != newest {
        return Err(malformed(format!(
            "status '{}' does not match newest entry '{}'",
            complaint.status, newest
        )));
    }

    Ok(())
}

fn push_entry(complaint: &mut Complaint, mut entry: StatusUpdate) {
    let prev = match complaint.last_update() {
        Some(last) => last.hash.clone(),
        None => ledger::record_hash(complaint),
    };
    entry.hash = ledger::entry_hash(&prev, &complaint.id, &entry);
    complaint.status = entry.status;
    complaint.updates.push(entry);
}
