//! PostgreSQL complaint store

use super::{check_insertable, ComplaintRepository, RepositoryError};
use crate::ledger;
use crate::lifecycle::apply_change;
use crate::models::{
    Category, Complaint, ComplaintId, ComplaintStatus, Coordinates, Priority, StatusChange,
    StatusUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;

const COMPLAINT_COLUMNS: &str = r#"
    id, description, category, location, latitude, longitude, attachments,
    priority, status, submitted_by, submitted_at, routed_to, assigned_to
"#;

const UPDATE_COLUMNS: &str = r#"
    complaint_id, position, recorded_at, status, description, department, progress, hash
"#;

#[derive(Debug, FromRow)]
struct ComplaintRow {
    id: ComplaintId,
    description: String,
    category: Category,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    attachments: Vec<String>,
    priority: Priority,
    status: ComplaintStatus,
    submitted_by: String,
    submitted_at: DateTime<Utc>,
    routed_to: Option<String>,
    assigned_to: Option<String>,
}

#[derive(Debug, FromRow)]
struct UpdateRow {
    complaint_id: ComplaintId,
    #[allow(dead_code)]
    position: i32,
    recorded_at: DateTime<Utc>,
    status: ComplaintStatus,
    description: String,
    department: String,
    progress: Option<i16>,
    hash: String,
}

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintRepository for PgRepository {
    async fn find(&self, id: &ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE id = $1",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let updates = fetch_updates(&self.pool, id).await?;
        assemble(row, updates).map(Some)
    }

    async fn insert(&self, complaint: Complaint) -> Result<ComplaintId, RepositoryError> {
        check_insertable(&complaint)?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO complaints (
                id, description, category, location, latitude, longitude, attachments,
                priority, status, submitted_by, submitted_at, routed_to, assigned_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&complaint.id)
        .bind(&complaint.description)
        .bind(complaint.category)
        .bind(&complaint.location)
        .bind(complaint.coordinates.map(|c| c.latitude))
        .bind(complaint.coordinates.map(|c| c.longitude))
        .bind(&complaint.attachments)
        .bind(complaint.priority)
        .bind(complaint.status)
        .bind(&complaint.submitted_by)
        .bind(complaint.submitted_at)
        .bind(&complaint.routed_to)
        .bind(&complaint.assigned_to)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(RepositoryError::DuplicateId(complaint.id));
        }

        for (position, update) in complaint.updates.iter().enumerate() {
            insert_update(&mut tx, &complaint.id, position, update).await?;
        }

        tx.commit().await?;
        Ok(complaint.id)
    }

    async fn append_update(
        &self,
        id: &ComplaintId,
        change: StatusChange,
    ) -> Result<Complaint, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent appends for this complaint
        let row = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints WHERE id = $1 FOR UPDATE",
            COMPLAINT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        let updates = fetch_updates(&mut *tx, id).await?;
        let mut complaint = assemble(row, updates)?;

        apply_change(&mut complaint, change, Utc::now())?;

        let position = complaint.updates.len() - 1;
        if let Some(entry) = complaint.updates.last() {
            insert_update(&mut tx, &complaint.id, position, entry).await?;
        }

        sqlx::query("UPDATE complaints SET status = $1, assigned_to = $2 WHERE id = $3")
            .bind(complaint.status)
            .bind(&complaint.assigned_to)
            .bind(&complaint.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(complaint)
    }

    async fn list(&self) -> Result<Vec<Complaint>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {} FROM complaints ORDER BY seq",
            COMPLAINT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        // Batch fetch updates for all complaints (avoid N+1 query)
        let all_updates = sqlx::query_as::<_, UpdateRow>(&format!(
            "SELECT {} FROM complaint_updates ORDER BY complaint_id, position",
            UPDATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut updates_by_complaint: HashMap<ComplaintId, Vec<UpdateRow>> = HashMap::new();
        for update in all_updates {
            updates_by_complaint
                .entry(update.complaint_id.clone())
                .or_default()
                .push(update);
        }

        rows.into_iter()
            .map(|row| {
                let updates = updates_by_complaint.remove(&row.id).unwrap_or_default();
                assemble(row, updates)
            })
            .collect()
    }
}

async fn fetch_updates<'e, E>(executor: E, id: &ComplaintId) -> Result<Vec<UpdateRow>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as::<_, UpdateRow>(&format!(
        "SELECT {} FROM complaint_updates WHERE complaint_id = $1 ORDER BY position",
        UPDATE_COLUMNS
    ))
    .bind(id)
    .fetch_all(executor)
    .await
}

async fn insert_update(
    conn: &mut PgConnection,
    id: &ComplaintId,
    position: usize,
    update: &StatusUpdate,
) -> Result<(), RepositoryError> {
    let position = i32::try_from(position).map_err(|_| RepositoryError::Corrupt {
        id: id.clone(),
        reason: "too many status updates".to_string(),
    })?;

    sqlx::query(
        r#"
        INSERT INTO complaint_updates (
            complaint_id, position, recorded_at, status, description, department, progress, hash
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(position)
    .bind(update.timestamp)
    .bind(update.status)
    .bind(&update.description)
    .bind(&update.department)
    .bind(update.progress.map(i16::from))
    .bind(&update.hash)
    .execute(conn)
    .await?;

    Ok(())
}

fn assemble(row: ComplaintRow, updates: Vec<UpdateRow>) -> Result<Complaint, RepositoryError> {
    if updates.is_empty() {
        return Err(RepositoryError::Corrupt {
            id: row.id,
            reason: "no status updates recorded".to_string(),
        });
    }

    let updates = updates
        .into_iter()
        .map(|u| {
            let progress = u
                .progress
                .map(u8::try_from)
                .transpose()
                .map_err(|_| RepositoryError::Corrupt {
                    id: row.id.clone(),
                    reason: format!("progress {:?} out of range", u.progress),
                })?;
            Ok(StatusUpdate {
                timestamp: u.recorded_at,
                status: u.status,
                description: u.description,
                department: u.department,
                progress,
                hash: u.hash,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let coordinates = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    let complaint = Complaint {
        id: row.id,
        description: row.description,
        category: row.category,
        location: row.location,
        coordinates,
        attachments: row.attachments,
        priority: row.priority,
        status: row.status,
        submitted_by: row.submitted_by,
        submitted_at: row.submitted_at,
        routed_to: row.routed_to,
        assigned_to: row.assigned_to,
        updates,
    };

    if !ledger::verify(&complaint) {
        tracing::warn!(
            "Stored history of complaint {} does not match its ledger hashes",
            complaint.id
        );
    }

    Ok(complaint)
}
