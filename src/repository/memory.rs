//! In-memory complaint store

use super::{check_insertable, ComplaintRepository, RepositoryError};
use crate::lifecycle::apply_change;
use crate::models::{Complaint, ComplaintId, StatusChange};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    complaints: HashMap<ComplaintId, Complaint>,
    order: Vec<ComplaintId>,
}

#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.store.read().await.order.len()
    }
}

#[async_trait]
impl ComplaintRepository for MemoryRepository {
    async fn find(&self, id: &ComplaintId) -> Result<Option<Complaint>, RepositoryError> {
        Ok(self.store.read().await.complaints.get(id).cloned())
    }

    async fn insert(&self, complaint: Complaint) -> Result<ComplaintId, RepositoryError> {
        check_insertable(&complaint)?;

        let mut store = self.store.write().await;
        if store.complaints.contains_key(&complaint.id) {
            return Err(RepositoryError::DuplicateId(complaint.id));
        }

        let id = complaint.id.clone();
        store.order.push(id.clone());
        store.complaints.insert(id.clone(), complaint);
        Ok(id)
    }

    async fn append_update(
        &self,
        id: &ComplaintId,
        change: StatusChange,
    ) -> Result<Complaint, RepositoryError> {
        // The write guard is held across validation and append
        let mut store = self.store.write().await;
        let complaint = store
            .complaints
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        // Work on a copy so a rejected change leaves no trace
        let mut updated = complaint.clone();
        apply_change(&mut updated, change, Utc::now())?;
        *complaint = updated.clone();

        Ok(updated)
    }

    async fn list(&self) -> Result<Vec<Complaint>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .order
            .iter()
            .filter_map(|id| store.complaints.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::sample_complaint;
    use crate::models::ComplaintStatus;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_insert_then_find() {
        let repo = MemoryRepository::new();
        let complaint = sample_complaint(1234);
        let id = assert_ok!(repo.insert(complaint.clone()).await);

        assert_eq!(id.as_str(), "CIV-001234");
        assert_eq!(repo.find(&id).await.unwrap(), Some(complaint));
    }

    #[tokio::test]
    async fn test_find_unknown_returns_none() {
        let repo = MemoryRepository::new();
        let id = ComplaintId::from_number(999_999);
        assert_eq!(repo.find(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let repo = MemoryRepository::new();
        assert_ok!(repo.insert(sample_complaint(7)).await);

        let result = repo.insert(sample_complaint(7)).await;
        assert!(matches!(result, Err(RepositoryError::DuplicateId(_))));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_record_without_history() {
        let repo = MemoryRepository::new();
        let mut complaint = sample_complaint(77);
        complaint.updates.clear();

        let result = repo.insert(complaint).await;
        assert!(matches!(result, Err(RepositoryError::MalformedRecord(_))));
        assert_eq!(repo.len().await, 0);
        assert_eq!(repo.find(&ComplaintId::from_number(77)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_rejects_status_out_of_step_with_history() {
        let repo = MemoryRepository::new();
        let mut complaint = sample_complaint(78);
        complaint.status = ComplaintStatus::Resolved;

        assert_err!(repo.insert(complaint).await);
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let repo = MemoryRepository::new();
        for n in [30, 10, 20] {
            repo.insert(sample_complaint(n)).await.unwrap();
        }
        let ids: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, vec!["CIV-000030", "CIV-000010", "CIV-000020"]);
    }

    #[tokio::test]
    async fn test_append_update_unknown_id() {
        let repo = MemoryRepository::new();
        let result = repo
            .append_update(
                &ComplaintId::from_number(1),
                StatusChange::new(ComplaintStatus::Assigned, "x", "Admin"),
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_append_update_rejects_invalid_transition_without_mutation() {
        let repo = MemoryRepository::new();
        let id = repo.insert(sample_complaint(1)).await.unwrap();

        let result = repo
            .append_update(
                &id,
                StatusChange::new(ComplaintStatus::Resolved, "skip ahead", "Admin"),
            )
            .await;
        assert_err!(&result);
        assert!(matches!(result, Err(RepositoryError::InvalidTransition(_))));

        let stored = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(stored.updates.len(), 1);
        assert_eq!(stored.status, ComplaintStatus::Submitted);
    }

    #[tokio::test]
    async fn test_append_update_forward_path() {
        let repo = MemoryRepository::new();
        let id = repo.insert(sample_complaint(1)).await.unwrap();

        for status in [
            ComplaintStatus::Assigned,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
        ] {
            let updated = repo
                .append_update(&id, StatusChange::new(status, "next", "Admin"))
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }

        let result = repo
            .append_update(
                &id,
                StatusChange::new(ComplaintStatus::Assigned, "reopen", "Admin"),
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::InvalidTransition(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_serialize() {
        let repo = Arc::new(MemoryRepository::new());
        let id = repo.insert(sample_complaint(1)).await.unwrap();
        repo.append_update(&id, StatusChange::new(ComplaintStatus::Assigned, "a", "Admin"))
            .await
            .unwrap();
        repo.append_update(&id, StatusChange::new(ComplaintStatus::InProgress, "b", "Admin"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for n in 0..32 {
            let repo = Arc::clone(&repo);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let status = if n == 16 {
                    ComplaintStatus::Resolved
                } else {
                    ComplaintStatus::Update
                };
                repo.append_update(&id, StatusChange::new(status, format!("note {}", n), "Crew"))
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        let stored = repo.find(&id).await.unwrap().unwrap();
        assert_eq!(stored.updates.len(), 3 + accepted);
        assert!(stored
            .updates
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(stored.status, stored.updates.last().unwrap().status);
        assert_eq!(stored.status, ComplaintStatus::Resolved);
        assert_eq!(
            stored
                .updates
                .iter()
                .filter(|u| u.status == ComplaintStatus::Resolved)
                .count(),
            1
        );
        assert!(crate::ledger::verify(&stored));
    }
}
