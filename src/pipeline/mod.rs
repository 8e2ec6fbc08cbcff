//! Submission pipeline
//!
//! 1. Intake: validate the form. Nothing is allocated on failure.
//! 2. Classification: ask the [`Classifier`] for a priority and department,
//!    bounded by a timeout.
//! 3. Allocation: pick a `CIV-######` ID and insert, retrying on collision.
//!
//! The complaint is only inserted after classification returns, so dropping
//! the `submit` future before that point leaves no partial record.

use crate::lifecycle::{apply_change, open_complaint, SYSTEM_DEPARTMENT};
use crate::models::{
    Category, Complaint, ComplaintId, ComplaintStatus, Coordinates, CreateComplaint,
    NewComplaint, Priority, StatusChange, SubmissionOutcomeKind, SubmissionReceipt,
};
use crate::repository::{ComplaintRepository, RepositoryError};
use crate::validation::{validate_create_complaint, ValidationError};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on ID candidates tried before giving up
pub const MAX_ID_ATTEMPTS: u32 = 10;

const ACCEPTED_NOTE: &str = "Complaint submitted and validated by classification service";
const RECEIVED_NOTE: &str = "Complaint submitted";

// =============================================================================
// Intake
// =============================================================================

/// A submission that passed intake validation
#[derive(Debug, Clone, PartialEq)]
pub struct Intake {
    pub description: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub attachments: Vec<String>,
    pub submitted_by: String,
}

impl Intake {
    pub fn from_form(input: CreateComplaint) -> Result<Self, ValidationError> {
        validate_create_complaint(&input)?;

        let submitted_by = input
            .submitted_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Anonymous")
            .to_string();

        Ok(Self {
            description: input.description.trim().to_string(),
            category: input.category.parse()?,
            location: input.location.trim().to_string(),
            coordinates: input.coordinates,
            attachments: input
                .attachments
                .iter()
                .map(|a| a.trim().to_string())
                .collect(),
            submitted_by,
        })
    }
}

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Accepted { priority: Priority, department: String },
    Rejected { reason: String },
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Raised by a remote classification client that cannot be reached
    #[error("Classification service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, intake: &Intake) -> Result<Classification, ClassifierError>;
}

/// Keyword hints that raise a complaint to high priority
const URGENT_KEYWORDS: &[&str] = &[
    "safety",
    "danger",
    "hazard",
    "urgent",
    "emergency",
    "injur",
    "flood",
    "leak",
    "outage",
    "disruption",
    "not collected",
];

/// Deterministic stand-in for the analysis service: routes by category and
/// raises priority on urgency keywords, after an optional simulated delay.
pub struct RuleClassifier {
    latency: Duration,
}

impl RuleClassifier {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn department_for(category: Category) -> &'static str {
        match category {
            Category::Road => "Road Maintenance",
            Category::Garbage => "Sanitation Department",
            Category::Streetlight => "Public Works Department",
            Category::Water => "Water Authority",
            Category::Other => "Environmental Dept",
        }
    }

    pub fn priority_for(intake: &Intake) -> Priority {
        let text = intake.description.to_lowercase();
        if URGENT_KEYWORDS.iter().any(|k| text.contains(k)) {
            return Priority::High;
        }
        match intake.category {
            Category::Other => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, intake: &Intake) -> Result<Classification, ClassifierError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if !intake.description.chars().any(char::is_alphabetic) {
            return Ok(Classification::Rejected {
                reason: "Description does not describe an issue".to_string(),
            });
        }

        Ok(Classification::Accepted {
            priority: Self::priority_for(intake),
            department: Self::department_for(intake.category).to_string(),
        })
    }
}

// =============================================================================
// Identifier allocation
// =============================================================================

pub trait IdSource: Send + Sync {
    /// Candidate ID for the given attempt (0-based)
    fn candidate(&self, attempt: u32) -> ComplaintId;
}

/// First candidate from the clock's last six millisecond digits, then random
pub struct ClockIdSource;

impl IdSource for ClockIdSource {
    fn candidate(&self, attempt: u32) -> ComplaintId {
        if attempt == 0 {
            let millis = Utc::now().timestamp_millis().unsigned_abs();
            ComplaintId::from_number(millis)
        } else {
            ComplaintId::from_number(rand::thread_rng().gen_range(0..1_000_000))
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Classification did not finish within {0:?}")]
    ClassificationTimeout(Duration),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Could not allocate a unique complaint ID after {0} attempts")]
    IdSpaceExhausted(u32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Accepted(Complaint),
    /// Stored with a terminal `rejected` entry for the audit trail
    RejectedByValidation { complaint: Complaint, reason: String },
}

impl SubmissionOutcome {
    pub fn complaint(&self) -> &Complaint {
        match self {
            SubmissionOutcome::Accepted(complaint) => complaint,
            SubmissionOutcome::RejectedByValidation { complaint, .. } => complaint,
        }
    }

    pub fn receipt(&self) -> SubmissionReceipt {
        let complaint = self.complaint();
        let (outcome, reason) = match self {
            SubmissionOutcome::Accepted(_) => (SubmissionOutcomeKind::Accepted, None),
            SubmissionOutcome::RejectedByValidation { reason, .. } => (
                SubmissionOutcomeKind::RejectedByValidation,
                Some(reason.clone()),
            ),
        };

        SubmissionReceipt {
            id: complaint.id.clone(),
            outcome,
            status: complaint.status,
            priority: complaint.priority,
            routed_to: complaint.routed_to.clone(),
            reason,
            submitted_at: complaint.submitted_at,
        }
    }
}

pub struct SubmissionPipeline {
    repo: Arc<dyn ComplaintRepository>,
    classifier: Arc<dyn Classifier>,
    ids: Arc<dyn IdSource>,
    classification_timeout: Duration,
}

impl SubmissionPipeline {
    pub fn new(
        repo: Arc<dyn ComplaintRepository>,
        classifier: Arc<dyn Classifier>,
        classification_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            classifier,
            ids: Arc::new(ClockIdSource),
            classification_timeout,
        }
    }

    #[cfg(test)]
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub async fn submit(&self, input: CreateComplaint) -> Result<SubmissionOutcome, PipelineError> {
        let intake = Intake::from_form(input)?;
        let submitted_at = Utc::now();

        let classification = tokio::time::timeout(
            self.classification_timeout,
            self.classifier.classify(&intake),
        )
        .await
        .map_err(|_| PipelineError::ClassificationTimeout(self.classification_timeout))??;

        let (priority, routed_to, rejection) = match classification {
            Classification::Accepted {
                priority,
                department,
            } => (priority, Some(department), None),
            Classification::Rejected { reason } => (Priority::Low, None, Some(reason)),
        };

        let new = NewComplaint {
            description: intake.description,
            category: intake.category,
            location: intake.location,
            coordinates: intake.coordinates,
            attachments: intake.attachments,
            priority,
            submitted_by: intake.submitted_by,
            routed_to,
        };

        for attempt in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.candidate(attempt);
            let complaint = build_record(id, new.clone(), submitted_at, rejection.as_deref())?;

            match self.repo.insert(complaint.clone()).await {
                Ok(id) => {
                    tracing::info!(
                        "Complaint {} stored ({}, priority {})",
                        id,
                        complaint.status,
                        complaint.priority
                    );
                    return Ok(match rejection {
                        None => SubmissionOutcome::Accepted(complaint),
                        Some(reason) => SubmissionOutcome::RejectedByValidation {
                            complaint,
                            reason,
                        },
                    });
                }
                Err(RepositoryError::DuplicateId(id)) => {
                    tracing::warn!("Complaint ID {} already taken, retrying", id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            "Gave up allocating a complaint ID after {} attempts",
            MAX_ID_ATTEMPTS
        );
        Err(PipelineError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }
}

fn build_record(
    id: ComplaintId,
    new: NewComplaint,
    submitted_at: chrono::DateTime<Utc>,
    rejection: Option<&str>,
) -> Result<Complaint, RepositoryError> {
    let Some(reason) = rejection else {
        return Ok(open_complaint(id, new, submitted_at, ACCEPTED_NOTE));
    };

    let mut complaint = open_complaint(id, new, submitted_at, RECEIVED_NOTE);
    apply_change(
        &mut complaint,
        StatusChange::new(
            ComplaintStatus::Rejected,
            format!("Rejected by classification: {}", reason),
            SYSTEM_DEPARTMENT,
        ),
        Utc::now(),
    )?;
    Ok(complaint)
}
