//! Complaint repository
//!
//! The single mutation path for stored complaints. Backings:
//! - [`MemoryRepository`]: process-local map, used for tests and demo runs
//! - [`PgRepository`]: PostgreSQL via sqlx

mod memory;
mod postgres;
pub mod seed;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use crate::lifecycle::{check_record, LifecycleError};
use crate::models::{Complaint, ComplaintId, StatusChange};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Complaint {0} not found")]
    NotFound(ComplaintId),

    #[error("Complaint ID {0} is already in use")]
    DuplicateId(ComplaintId),

    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),

    #[error("Refusing to store complaint: {0}")]
    MalformedRecord(LifecycleError),

    #[error("Stored complaint {id} is inconsistent: {reason}")]
    Corrupt { id: ComplaintId, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Gate for `insert`: only records with a consistent history are stored
fn check_insertable(complaint: &Complaint) -> Result<(), RepositoryError> {
    check_record(complaint).map_err(RepositoryError::MalformedRecord)
}

#[async_trait]
pub trait ComplaintRepository: Send + Sync {
    /// Side-effect free lookup
    async fn find(&self, id: &ComplaintId) -> Result<Option<Complaint>, RepositoryError>;

    /// Store a new complaint; fails with `MalformedRecord` if its history is
    /// inconsistent and `DuplicateId` if the ID exists
    async fn insert(&self, complaint: Complaint) -> Result<ComplaintId, RepositoryError>;

    /// Validate `change` against the complaint's current state and append it.
    /// Calls for the same complaint are serialized.
    async fn append_update(
        &self,
        id: &ComplaintId,
        change: StatusChange,
    ) -> Result<Complaint, RepositoryError>;

    /// All complaints in insertion order
    async fn list(&self) -> Result<Vec<Complaint>, RepositoryError>;
}
