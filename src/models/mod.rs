//! Data models for the application

use crate::validation::{validate_complaint_id, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Submitted,
    Assigned,
    InProgress,
    /// Informational entry; does not move the complaint to another stage.
    Update,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 6] = [
        ComplaintStatus::Submitted,
        ComplaintStatus::Assigned,
        ComplaintStatus::InProgress,
        ComplaintStatus::Update,
        ComplaintStatus::Resolved,
        ComplaintStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "submitted",
            ComplaintStatus::Assigned => "assigned",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Update => "update",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Rejected)
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: "status".to_string(),
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "complaint_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Road,
    Garbage,
    Streetlight,
    Water,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Road,
        Category::Garbage,
        Category::Streetlight,
        Category::Water,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Road => "road",
            Category::Garbage => "garbage",
            Category::Streetlight => "streetlight",
            Category::Water => "water",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: "category".to_string(),
                value: s.to_string(),
            })
    }
}

/// Variant order matters: sorting relies on `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "complaint_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ValidationError::InvalidChoice {
                field: "priority".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Complaint
// =============================================================================

/// Public complaint identifier, `CIV-` followed by six decimal digits.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ComplaintId(String);

impl ComplaintId {
    pub const PREFIX: &'static str = "CIV-";

    /// Build an identifier from the low six decimal digits of `n`.
    pub fn from_number(n: u64) -> Self {
        Self(format!("{}{:06}", Self::PREFIX, n % 1_000_000))
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        validate_complaint_id(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComplaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub timestamp: DateTime<Utc>,
    pub status: ComplaintStatus,
    pub description: String,
    pub department: String,
    /// Explicit completion percentage, only ever present on `update` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Ledger hash chaining this entry to its predecessor.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub attachments: Vec<String>,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    /// Department suggested by classification
    pub routed_to: Option<String>,
    pub assigned_to: Option<String>,
    pub updates: Vec<StatusUpdate>,
}

/// Fields fixed at intake and classification, before the first entry exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComplaint {
    pub description: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub attachments: Vec<String>,
    pub priority: Priority,
    pub submitted_by: String,
    pub routed_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintResponse {
    pub id: ComplaintId,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub attachments: Vec<String>,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub stage: ComplaintStatus,
    pub progress: u8,
    pub closed: bool,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub routed_to: Option<String>,
    pub assigned_to: Option<String>,
    pub updates: Vec<StatusUpdate>,
}

impl From<Complaint> for ComplaintResponse {
    fn from(complaint: Complaint) -> Self {
        let stage = complaint.stage();
        let progress = complaint.progress();
        let closed = complaint.is_closed();
        Self {
            id: complaint.id,
            description: complaint.description,
            category: complaint.category,
            location: complaint.location,
            coordinates: complaint.coordinates,
            attachments: complaint.attachments,
            priority: complaint.priority,
            status: complaint.status,
            stage,
            progress,
            closed,
            submitted_by: complaint.submitted_by,
            submitted_at: complaint.submitted_at,
            routed_to: complaint.routed_to,
            assigned_to: complaint.assigned_to,
            updates: complaint.updates,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Complaint submission form. Choice fields arrive as strings so that a bad
/// value is reported against its field instead of as a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateComplaint {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub location: String,
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[validate(length(max = 255))]
    pub submitted_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub department: String,
    pub progress: Option<u8>,
    #[validate(length(max = 255))]
    pub assigned_to: Option<String>,
}

/// A validated status change, ready for the lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: ComplaintStatus,
    pub description: String,
    pub department: String,
    pub progress: Option<u8>,
    pub assigned_to: Option<String>,
}

impl StatusChange {
    pub fn new(
        status: ComplaintStatus,
        description: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            status,
            description: description.into(),
            department: department.into(),
            progress: None,
            assigned_to: None,
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn assigned_to(mut self, department: impl Into<String>) -> Self {
        self.assigned_to = Some(department.into());
        self
    }
}

// =============================================================================
// Submission receipt
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcomeKind {
    Accepted,
    RejectedByValidation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub id: ComplaintId,
    pub outcome: SubmissionOutcomeKind,
    pub status: ComplaintStatus,
    pub priority: Priority,
    pub routed_to: Option<String>,
    pub reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// =============================================================================
// API Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_accepts_display_forms() {
        assert_eq!(
            "In Progress".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::InProgress
        );
        assert_eq!(
            "in_progress".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::InProgress
        );
        assert_eq!(
            "Resolved".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::Resolved
        );
        assert!(matches!(
            "closed".parse::<ComplaintStatus>(),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_complaint_id_from_number_pads_and_wraps() {
        assert_eq!(ComplaintId::from_number(42).as_str(), "CIV-000042");
        assert_eq!(ComplaintId::from_number(1_736_937_001_234).as_str(), "CIV-001234");
    }

    #[test]
    fn test_complaint_id_parse() {
        assert!(ComplaintId::parse("CIV-001234").is_ok());
        assert!(ComplaintId::parse(" CIV-001234 ").is_ok());
        assert!(ComplaintId::parse("CIV-1234").is_err());
        assert!(ComplaintId::parse("civ-001234").is_err());
    }
}
