//! Input validation module

use crate::models::{ComplaintStatus, CreateComplaint, StatusChange, UpdateStatusRequest};
use thiserror::Error;
use validator::Validate;

/// Maximum number of media references attached to one complaint
pub const MAX_ATTACHMENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' has too many entries (max {max})")]
    TooMany { field: String, max: usize },

    #[error("Field '{field}' has an unsupported value '{value}'")]
    InvalidChoice { field: String, value: String },

    #[error("Field '{field}' must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    #[error("Invalid complaint ID format (expected CIV- followed by six digits)")]
    InvalidComplaintId,

    #[error("Invalid attachment '{name}': {reason}")]
    InvalidAttachment { name: String, reason: String },

    #[error("Field 'progress' is only accepted together with status 'update'")]
    ProgressNotAllowed,
}

/// Validate a complaint submission form
pub fn validate_create_complaint(input: &CreateComplaint) -> Result<(), ValidationError> {
    check_lengths(input)?;

    if input.attachments.len() > MAX_ATTACHMENTS {
        return Err(ValidationError::TooMany {
            field: "attachments".to_string(),
            max: MAX_ATTACHMENTS,
        });
    }

    // Description
    if input.description.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    // Category
    if input.category.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "category".to_string(),
        });
    }
    input.category.parse::<crate::models::Category>()?;

    // Coordinates (optional but must be on the globe if provided)
    if let Some(coords) = input.coordinates {
        check_range("coordinates.latitude", coords.latitude, -90.0, 90.0)?;
        check_range("coordinates.longitude", coords.longitude, -180.0, 180.0)?;
    }

    // Reporter (optional)
    if let Some(ref name) = input.submitted_by {
        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidChoice {
                field: "submitted_by".to_string(),
                value: name.escape_debug().to_string(),
            });
        }
    }

    for attachment in &input.attachments {
        validate_attachment(attachment)?;
    }

    Ok(())
}

/// Validate an admin status change and convert it into a [`StatusChange`]
pub fn validate_status_change(input: &UpdateStatusRequest) -> Result<StatusChange, ValidationError> {
    check_lengths(input)?;

    if input.status.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "status".to_string(),
        });
    }
    let status: ComplaintStatus = input.status.parse()?;

    if input.description.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }
    if input.department.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "department".to_string(),
        });
    }

    if let Some(progress) = input.progress {
        if status != ComplaintStatus::Update {
            return Err(ValidationError::ProgressNotAllowed);
        }
        check_range("progress", f64::from(progress), 0.0, 100.0)?;
    }

    let mut change = StatusChange::new(
        status,
        input.description.trim(),
        input.department.trim(),
    );
    if let Some(progress) = input.progress {
        change = change.with_progress(progress);
    }
    if let Some(assignee) = input
        .assigned_to
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        change = change.assigned_to(assignee);
    }

    Ok(change)
}

/// Validate complaint ID format
pub fn validate_complaint_id(id: &str) -> Result<(), ValidationError> {
    let digits = id
        .strip_prefix(crate::models::ComplaintId::PREFIX)
        .ok_or(ValidationError::InvalidComplaintId)?;

    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidComplaintId);
    }

    Ok(())
}

/// Media types the complaint form accepts (`image/*` and `video/*`)
const MEDIA_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".heic", ".heif", ".bmp", ".mp4", ".mov", ".webm",
    ".m4v", ".avi", ".3gp",
];

/// Dangerous file extensions that could be executed if misconfigured
const DANGEROUS_EXTENSIONS: &[&str] = &[
    // Server-side scripting
    ".php", ".phtml", ".asp", ".aspx", ".jsp", ".cgi", ".pl", ".py", ".rb",
    // Executables
    ".exe", ".bat", ".cmd", ".com", ".msi", ".dll", ".sh", ".bash",
    // Scripts and markup
    ".js", ".mjs", ".html", ".htm", ".svg",
    // Java
    ".jar", ".class",
];

/// Validate a media reference attached to a complaint
///
/// The final extension must be an image or video type, and no dangerous
/// extension may be hidden earlier in the name (e.g. "photo.php.jpg").
pub fn validate_attachment(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "attachments".to_string(),
        });
    }
    if trimmed.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "attachments".to_string(),
            max: 255,
        });
    }
    if trimmed.contains(['/', '\\']) || trimmed.contains("..") {
        return Err(ValidationError::InvalidAttachment {
            name: trimmed.to_string(),
            reason: "path components are not allowed".to_string(),
        });
    }

    let lower = trimmed.to_lowercase();

    for ext in DANGEROUS_EXTENSIONS {
        if lower.ends_with(ext) || lower.contains(&format!("{}.", ext)) {
            return Err(ValidationError::InvalidAttachment {
                name: trimmed.to_string(),
                reason: format!("dangerous extension {}", ext),
            });
        }
    }

    if !MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Err(ValidationError::InvalidAttachment {
            name: trimmed.to_string(),
            reason: "only image and video files are accepted".to_string(),
        });
    }

    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Map `validator` length violations onto our error type, first field by name
fn check_lengths<T: Validate>(input: &T) -> Result<(), ValidationError> {
    let Err(errors) = input.validate() else {
        return Ok(());
    };

    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let Some((field, errs)) = fields.first() else {
        return Ok(());
    };
    let max = errs
        .iter()
        .find_map(|e| e.params.get("max").and_then(|v| v.as_u64()))
        .unwrap_or_default() as usize;

    Err(ValidationError::TooLong {
        field: field.to_string(),
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn valid_input() -> CreateComplaint {
        CreateComplaint {
            description: "Pothole on highway causing vehicle damage".to_string(),
            category: "road".to_string(),
            location: "Highway 101, Mile 15".to_string(),
            coordinates: Some(Coordinates {
                latitude: 40.7128,
                longitude: -74.006,
            }),
            attachments: vec!["pothole.jpg".to_string(), "clip.mp4".to_string()],
            submitted_by: Some("Mike Johnson".to_string()),
        }
    }

    #[test]
    fn test_complaint_id_validation() {
        assert!(validate_complaint_id("CIV-001234").is_ok());
        assert!(validate_complaint_id("CIV-000000").is_ok());
        assert!(validate_complaint_id("CIV-12345").is_err());
        assert!(validate_complaint_id("CIV-1234567").is_err());
        assert!(validate_complaint_id("CIV-12a456").is_err());
        assert!(validate_complaint_id("ABC-123456").is_err());
        assert!(validate_complaint_id("").is_err());
    }

    #[test]
    fn test_validate_create_complaint_valid() {
        assert!(validate_create_complaint(&valid_input()).is_ok());
    }

    #[test]
    fn test_validate_create_complaint_empty_description() {
        let input = CreateComplaint {
            description: "   ".to_string(),
            ..valid_input()
        };
        assert_eq!(
            validate_create_complaint(&input),
            Err(ValidationError::Required {
                field: "description".to_string()
            })
        );
    }

    #[test]
    fn test_validate_create_complaint_missing_category() {
        let input = CreateComplaint {
            category: String::new(),
            ..valid_input()
        };
        assert_eq!(
            validate_create_complaint(&input),
            Err(ValidationError::Required {
                field: "category".to_string()
            })
        );
    }

    #[test]
    fn test_validate_create_complaint_unknown_category() {
        let input = CreateComplaint {
            category: "noise".to_string(),
            ..valid_input()
        };
        assert!(matches!(
            validate_create_complaint(&input),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_validate_create_complaint_location_optional() {
        let input = CreateComplaint {
            location: String::new(),
            coordinates: None,
            ..valid_input()
        };
        assert!(validate_create_complaint(&input).is_ok());
    }

    #[test]
    fn test_validate_create_complaint_description_too_long() {
        let input = CreateComplaint {
            description: "x".repeat(5001),
            ..valid_input()
        };
        assert_eq!(
            validate_create_complaint(&input),
            Err(ValidationError::TooLong {
                field: "description".to_string(),
                max: 5000
            })
        );
    }

    #[test]
    fn test_validate_create_complaint_too_many_attachments() {
        let photos = |n: usize| -> Vec<String> {
            (0..n).map(|i| format!("photo{}.jpg", i)).collect()
        };

        let at_limit = CreateComplaint {
            attachments: photos(MAX_ATTACHMENTS),
            ..valid_input()
        };
        assert_eq!(validate_create_complaint(&at_limit), Ok(()));

        let input = CreateComplaint {
            attachments: photos(MAX_ATTACHMENTS + 1),
            ..valid_input()
        };
        assert_eq!(
            validate_create_complaint(&input),
            Err(ValidationError::TooMany {
                field: "attachments".to_string(),
                max: MAX_ATTACHMENTS
            })
        );
    }

    #[test]
    fn test_validate_create_complaint_bad_coordinates() {
        let input = CreateComplaint {
            coordinates: Some(Coordinates {
                latitude: 91.0,
                longitude: 0.0,
            }),
            ..valid_input()
        };
        assert!(matches!(
            validate_create_complaint(&input),
            Err(ValidationError::OutOfRange { .. })
        ));

        let input = CreateComplaint {
            coordinates: Some(Coordinates {
                latitude: 0.0,
                longitude: f64::NAN,
            }),
            ..valid_input()
        };
        assert!(validate_create_complaint(&input).is_err());
    }

    #[test]
    fn test_validate_attachment_media_only() {
        assert!(validate_attachment("photo.JPG").is_ok());
        assert!(validate_attachment("video.mov").is_ok());
        assert!(validate_attachment("report.pdf").is_err());
        assert!(validate_attachment("noextension").is_err());
    }

    #[test]
    fn test_validate_attachment_dangerous() {
        assert!(validate_attachment("shell.sh").is_err());
        assert!(validate_attachment("photo.php.jpg").is_err());
        assert!(validate_attachment("IMAGE.EXE.PNG").is_err());
        assert!(validate_attachment("../etc/passwd.jpg").is_err());
        assert!(validate_attachment("dir/photo.jpg").is_err());
    }

    #[test]
    fn test_validate_status_change() {
        let input = UpdateStatusRequest {
            status: "In Progress".to_string(),
            description: " Field inspection completed ".to_string(),
            department: "Public Works".to_string(),
            progress: None,
            assigned_to: Some("  ".to_string()),
        };
        let change = validate_status_change(&input).unwrap();
        assert_eq!(change.status, ComplaintStatus::InProgress);
        assert_eq!(change.description, "Field inspection completed");
        assert_eq!(change.assigned_to, None);
    }

    #[test]
    fn test_validate_status_change_requires_fields() {
        let input = UpdateStatusRequest {
            status: "assigned".to_string(),
            description: String::new(),
            department: "Admin".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_status_change(&input),
            Err(ValidationError::Required {
                field: "description".to_string()
            })
        );

        let input = UpdateStatusRequest {
            status: "archived".to_string(),
            description: "x".to_string(),
            department: "Admin".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_status_change(&input),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_validate_status_change_progress_only_on_update() {
        let input = UpdateStatusRequest {
            status: "resolved".to_string(),
            description: "Done".to_string(),
            department: "Public Works".to_string(),
            progress: Some(80),
            assigned_to: None,
        };
        assert_eq!(
            validate_status_change(&input),
            Err(ValidationError::ProgressNotAllowed)
        );

        let input = UpdateStatusRequest {
            status: "update".to_string(),
            progress: Some(101),
            ..input
        };
        assert!(matches!(
            validate_status_change(&input),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
