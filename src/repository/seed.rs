//! Demo complaints for development runs
//!
//! Every record is built through the lifecycle so histories, hashes and
//! derived progress are identical to complaints created through the API.

use super::{ComplaintRepository, RepositoryError};
use crate::lifecycle::{apply_change, open_complaint};
use crate::models::{
    Category, ComplaintId, ComplaintStatus, Coordinates, NewComplaint, Priority, StatusChange,
};
use chrono::{DateTime, Utc};

struct DemoComplaint {
    id: u64,
    description: &'static str,
    category: Category,
    location: &'static str,
    coordinates: Option<(f64, f64)>,
    priority: Priority,
    submitted_by: &'static str,
    submitted_at: &'static str,
    department: &'static str,
    /// (status, timestamp, description, department)
    history: &'static [(ComplaintStatus, &'static str, &'static str, &'static str)],
}

const SUBMITTED_NOTE: &str = "Complaint submitted and validated by classification service";

const DEMO_COMPLAINTS: &[DemoComplaint] = &[
    DemoComplaint {
        id: 1234,
        description: "Broken streetlight on Main Street causing safety concerns",
        category: Category::Streetlight,
        location: "Main Street, Block A",
        coordinates: Some((40.7128, -74.0060)),
        priority: Priority::High,
        submitted_by: "John Doe",
        submitted_at: "2025-01-15T10:30:00Z",
        department: "Public Works Department",
        history: &[
            (
                ComplaintStatus::Assigned,
                "2025-01-15T14:20:00Z",
                "Complaint assigned to Public Works Department",
                "Admin",
            ),
            (
                ComplaintStatus::InProgress,
                "2025-01-16T09:15:00Z",
                "Field inspection completed. Replacement parts ordered.",
                "Public Works",
            ),
            (
                ComplaintStatus::Update,
                "2025-01-17T11:30:00Z",
                "Parts received. Repair scheduled for January 19th.",
                "Public Works",
            ),
        ],
    },
    DemoComplaint {
        id: 1235,
        description: "Garbage not collected for 3 days in residential area",
        category: Category::Garbage,
        location: "Green Valley, Sector 12",
        coordinates: Some((40.7589, -73.9851)),
        priority: Priority::High,
        submitted_by: "Sarah Wilson",
        submitted_at: "2025-01-14T14:20:00Z",
        department: "Sanitation Department",
        history: &[
            (
                ComplaintStatus::Assigned,
                "2025-01-14T16:45:00Z",
                "Urgent complaint assigned to Sanitation Department",
                "Admin",
            ),
            (
                ComplaintStatus::InProgress,
                "2025-01-15T08:30:00Z",
                "Collection truck dispatched to location",
                "Sanitation",
            ),
            (
                ComplaintStatus::Resolved,
                "2025-01-15T11:15:00Z",
                "Garbage collected. Regular schedule resumed.",
                "Sanitation",
            ),
        ],
    },
    DemoComplaint {
        id: 1236,
        description: "Pothole on highway causing vehicle damage",
        category: Category::Road,
        location: "Highway 101, Mile 15",
        coordinates: None,
        priority: Priority::Medium,
        submitted_by: "Mike Johnson",
        submitted_at: "2025-01-14T09:15:00Z",
        department: "Road Maintenance",
        history: &[
            (
                ComplaintStatus::Assigned,
                "2025-01-14T11:00:00Z",
                "Complaint assigned to Road Maintenance",
                "Admin",
            ),
            (
                ComplaintStatus::InProgress,
                "2025-01-15T07:45:00Z",
                "Repair crew scheduled",
                "Road Maintenance",
            ),
        ],
    },
    DemoComplaint {
        id: 1237,
        description: "Water supply disruption in apartment complex",
        category: Category::Water,
        location: "Sunrise Apartments, Unit 45",
        coordinates: None,
        priority: Priority::High,
        submitted_by: "Lisa Chen",
        submitted_at: "2025-01-13T16:45:00Z",
        department: "Water Authority",
        history: &[
            (
                ComplaintStatus::Assigned,
                "2025-01-13T17:30:00Z",
                "Complaint assigned to Water Authority",
                "Admin",
            ),
            (
                ComplaintStatus::InProgress,
                "2025-01-13T19:00:00Z",
                "Technicians dispatched to the building",
                "Water Authority",
            ),
            (
                ComplaintStatus::Resolved,
                "2025-01-14T10:00:00Z",
                "Main valve repaired. Supply restored.",
                "Water Authority",
            ),
        ],
    },
    DemoComplaint {
        id: 1238,
        description: "Noise pollution from construction site after hours",
        category: Category::Other,
        location: "Downtown Plaza",
        coordinates: None,
        priority: Priority::Low,
        submitted_by: "Robert Brown",
        submitted_at: "2025-01-13T11:30:00Z",
        department: "Environmental Dept",
        history: &[],
    },
    DemoComplaint {
        id: 1239,
        description: "Damaged sidewalk creating accessibility issues",
        category: Category::Road,
        location: "Park Avenue, Near School",
        coordinates: None,
        priority: Priority::Medium,
        submitted_by: "Emma Davis",
        submitted_at: "2025-01-12T13:20:00Z",
        department: "Public Works Dept",
        history: &[
            (
                ComplaintStatus::Assigned,
                "2025-01-12T15:00:00Z",
                "Complaint assigned to Public Works Dept",
                "Admin",
            ),
            (
                ComplaintStatus::InProgress,
                "2025-01-13T09:00:00Z",
                "Sidewalk section cordoned off for repair",
                "Public Works",
            ),
            (
                ComplaintStatus::Resolved,
                "2025-01-14T16:00:00Z",
                "Sidewalk repaved and ramp restored",
                "Public Works",
            ),
        ],
    },
];

/// Insert the demo complaints, skipping IDs that already exist.
/// Returns the number of complaints inserted.
pub async fn seed_demo_data(repo: &dyn ComplaintRepository) -> Result<usize, RepositoryError> {
    let mut inserted = 0;

    for demo in DEMO_COMPLAINTS {
        let id = ComplaintId::from_number(demo.id);
        let submitted_at = parse_time(&id, demo.submitted_at)?;

        let mut complaint = open_complaint(
            id.clone(),
            NewComplaint {
                description: demo.description.to_string(),
                category: demo.category,
                location: demo.location.to_string(),
                coordinates: demo.coordinates.map(|(latitude, longitude)| Coordinates {
                    latitude,
                    longitude,
                }),
                attachments: Vec::new(),
                priority: demo.priority,
                submitted_by: demo.submitted_by.to_string(),
                routed_to: Some(demo.department.to_string()),
            },
            submitted_at,
            SUBMITTED_NOTE,
        );

        for (status, at, description, department) in demo.history {
            let at = parse_time(&id, at)?;
            apply_change(
                &mut complaint,
                StatusChange::new(*status, *description, *department),
                at,
            )?;
        }

        match repo.insert(complaint).await {
            Ok(_) => inserted += 1,
            Err(RepositoryError::DuplicateId(id)) => {
                tracing::debug!("Demo complaint {} already present, skipping", id);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Seeded {} demo complaints", inserted);
    Ok(inserted)
}

fn parse_time(id: &ComplaintId, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    value
        .parse::<DateTime<Utc>>()
        .map_err(|e| RepositoryError::Corrupt {
            id: id.clone(),
            reason: format!("bad demo timestamp {}: {}", value, e),
        })
}
