//! Admin list view: filtering, priority ordering and dashboard counts

use crate::models::{Complaint, ComplaintStatus, Priority};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Raw query string for the admin list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintFilter {
    /// Lowercased search text; empty matches everything
    pub search: String,
    pub status: Option<ComplaintStatus>,
    pub priority: Option<Priority>,
}

impl ComplaintFilter {
    /// `"all"` and blank values mean no restriction
    pub fn from_query(query: &ListQuery) -> Result<Self, ValidationError> {
        Ok(Self {
            search: query
                .search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default(),
            status: choice(query.status.as_deref())
                .map(str::parse::<ComplaintStatus>)
                .transpose()?,
            priority: choice(query.priority.as_deref())
                .map(str::parse::<Priority>)
                .transpose()?,
        })
    }

    pub fn matches(&self, complaint: &Complaint) -> bool {
        let search_ok = self.search.is_empty()
            || complaint.id.as_str().to_lowercase().contains(&self.search)
            || complaint.description.to_lowercase().contains(&self.search)
            || complaint.location.to_lowercase().contains(&self.search);

        search_ok
            && self.status.map_or(true, |s| status_matches(complaint, s))
            && self.priority.map_or(true, |p| complaint.priority == p)
    }
}

/// Canonical statuses match the complaint's stage, so a complaint with a
/// trailing `update` entry is still listed under the stage it is in.
/// `update` itself matches complaints whose newest entry is an update.
fn status_matches(complaint: &Complaint, wanted: ComplaintStatus) -> bool {
    match wanted {
        ComplaintStatus::Update => complaint.status == ComplaintStatus::Update,
        stage => complaint.stage() == stage,
    }
}

fn choice(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Keep matching complaints, highest priority first. Equal priorities keep
/// their input order.
pub fn filter_and_sort(complaints: Vec<Complaint>, filter: &ComplaintFilter) -> Vec<Complaint> {
    let mut matching: Vec<Complaint> = complaints
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    matching.sort_by(|a, b| b.priority.cmp(&a.priority));
    matching
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplaintStats {
    pub total: usize,
    pub submitted: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub rejected: usize,
}

/// Count complaints per canonical stage
pub fn stats(complaints: &[Complaint]) -> ComplaintStats {
    let mut stats = ComplaintStats {
        total: complaints.len(),
        ..Default::default()
    };

    for complaint in complaints {
        match complaint.stage() {
            ComplaintStatus::Submitted | ComplaintStatus::Update => stats.submitted += 1,
            ComplaintStatus::Assigned => stats.assigned += 1,
            ComplaintStatus::InProgress => stats.in_progress += 1,
            ComplaintStatus::Resolved => stats.resolved += 1,
            ComplaintStatus::Rejected => stats.rejected += 1,
        }
    }

    stats
}
