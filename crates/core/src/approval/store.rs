//! Persistence seam for approval facts.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rungs_shared::types::{OrgUnitId, PeriodId, WorkflowId};

use super::error::ApprovalError;
use super::types::{ApprovalKey, DataApproval};

/// Repository trait for approval facts.
///
/// This trait is implemented by the db crate to provide actual database
/// operations. Absence is reported as `Ok(None)` or `Ok(false)`, never as an
/// error. Uniqueness per [`ApprovalKey`] is enforced by the store itself.
pub trait DataApprovalStore: Send + Sync {
    /// Records a new approval; fails with `Duplicate` if the key exists.
    fn add(
        &self,
        approval: DataApproval,
    ) -> impl std::future::Future<Output = Result<(), ApprovalError>> + Send;

    /// Updates the acceptance of an existing approval.
    fn update(
        &self,
        approval: &DataApproval,
    ) -> impl std::future::Future<Output = Result<(), ApprovalError>> + Send;

    /// Deletes an approval, returning whether it existed.
    fn delete(
        &self,
        key: &ApprovalKey,
    ) -> impl std::future::Future<Output = Result<bool, ApprovalError>> + Send;

    /// Finds an approval by key.
    fn get(
        &self,
        key: &ApprovalKey,
    ) -> impl std::future::Future<Output = Result<Option<DataApproval>, ApprovalError>> + Send;

    /// Lists every approval of a workflow in one workflow period.
    fn list_for_period(
        &self,
        workflow: WorkflowId,
        period: PeriodId,
    ) -> impl std::future::Future<Output = Result<Vec<DataApproval>, ApprovalError>> + Send;

    /// Records a batch of approvals: either every one is stored or none is.
    /// Fails with `Duplicate` on the first key that already exists, or that
    /// repeats within the batch.
    fn add_all(
        &self,
        approvals: Vec<DataApproval>,
    ) -> impl std::future::Future<Output = Result<(), ApprovalError>> + Send;

    /// Updates the acceptance of a batch of approvals: either every one is
    /// updated or none is.
    fn update_all(
        &self,
        approvals: &[DataApproval],
    ) -> impl std::future::Future<Output = Result<(), ApprovalError>> + Send;

    /// Deletes a batch of approvals in one unit, returning how many existed.
    fn delete_all(
        &self,
        keys: &[ApprovalKey],
    ) -> impl std::future::Future<Output = Result<u64, ApprovalError>> + Send;

    /// Deletes every approval recorded for an org unit, returning the count.
    fn delete_for_org_unit(
        &self,
        org_unit: OrgUnitId,
    ) -> impl std::future::Future<Output = Result<u64, ApprovalError>> + Send;
}

/// In-memory approval store.
#[derive(Debug, Default)]
pub struct MemoryApprovalStore {
    approvals: DashMap<ApprovalKey, DataApproval>,
}

impl MemoryApprovalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored approvals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }
}

impl DataApprovalStore for MemoryApprovalStore {
    async fn add(&self, approval: DataApproval) -> Result<(), ApprovalError> {
        match self.approvals.entry(approval.key) {
            Entry::Occupied(_) => Err(ApprovalError::Duplicate(approval.key)),
            Entry::Vacant(slot) => {
                slot.insert(approval);
                Ok(())
            }
        }
    }

    async fn update(&self, approval: &DataApproval) -> Result<(), ApprovalError> {
        let mut existing = self
            .approvals
            .get_mut(&approval.key)
            .ok_or(ApprovalError::NotFound(approval.key))?;
        existing.accepted = approval.accepted;
        existing.last_updated = approval.last_updated;
        existing.last_updated_by = approval.last_updated_by;
        Ok(())
    }

    async fn delete(&self, key: &ApprovalKey) -> Result<bool, ApprovalError> {
        Ok(self.approvals.remove(key).is_some())
    }

    async fn get(&self, key: &ApprovalKey) -> Result<Option<DataApproval>, ApprovalError> {
        Ok(self.approvals.get(key).map(|a| a.value().clone()))
    }

    async fn list_for_period(
        &self,
        workflow: WorkflowId,
        period: PeriodId,
    ) -> Result<Vec<DataApproval>, ApprovalError> {
        let mut found: Vec<_> = self
            .approvals
            .iter()
            .filter(|a| a.key.workflow == workflow && a.key.period == period)
            .map(|a| a.value().clone())
            .collect();
        found.sort_by_key(|a| a.key);
        Ok(found)
    }

    async fn add_all(&self, approvals: Vec<DataApproval>) -> Result<(), ApprovalError> {
        let mut inserted = Vec::with_capacity(approvals.len());
        for approval in approvals {
            let key = approval.key;
            let duplicate = match self.approvals.entry(key) {
                Entry::Occupied(_) => true,
                Entry::Vacant(slot) => {
                    slot.insert(approval);
                    false
                }
            };
            if duplicate {
                for key in &inserted {
                    self.approvals.remove(key);
                }
                return Err(ApprovalError::Duplicate(key));
            }
            inserted.push(key);
        }
        Ok(())
    }

    async fn update_all(&self, approvals: &[DataApproval]) -> Result<(), ApprovalError> {
        if let Some(missing) = approvals
            .iter()
            .find(|a| !self.approvals.contains_key(&a.key))
        {
            return Err(ApprovalError::NotFound(missing.key));
        }
        for approval in approvals {
            self.update(approval).await?;
        }
        Ok(())
    }

    async fn delete_all(&self, keys: &[ApprovalKey]) -> Result<u64, ApprovalError> {
        let mut deleted = 0;
        for key in keys {
            if self.approvals.remove(key).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_for_org_unit(&self, org_unit: OrgUnitId) -> Result<u64, ApprovalError> {
        let before = self.approvals.len();
        self.approvals.retain(|key, _| key.org_unit != org_unit);
        Ok((before - self.approvals.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rungs_shared::types::{ApprovalLevelId, CategoryOptionComboId, UserId};

    fn key(workflow: WorkflowId, period: PeriodId, org_unit: OrgUnitId) -> ApprovalKey {
        ApprovalKey {
            level: ApprovalLevelId::new(),
            workflow,
            period,
            org_unit,
            option_combo: CategoryOptionComboId::new(),
        }
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_key() {
        let store = MemoryApprovalStore::new();
        let k = key(WorkflowId::new(), PeriodId::new(), OrgUnitId::new());

        store.add(DataApproval::new(k, false, UserId::new())).await.unwrap();
        let err = store
            .add(DataApproval::new(k, true, UserId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApprovalError::Duplicate(dup) if dup == k));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryApprovalStore::new();
        let k = key(WorkflowId::new(), PeriodId::new(), OrgUnitId::new());
        let mut approval = DataApproval::new(k, false, UserId::new());
        store.add(approval.clone()).await.unwrap();

        approval.set_accepted(true, UserId::new());
        store.update(&approval).await.unwrap();
        assert!(store.get(&k).await.unwrap().unwrap().accepted);

        assert!(store.delete(&k).await.unwrap());
        assert!(!store.delete(&k).await.unwrap());
        assert!(store.get(&k).await.unwrap().is_none());
        assert!(matches!(
            store.update(&approval).await,
            Err(ApprovalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_all_is_all_or_nothing() {
        let store = MemoryApprovalStore::new();
        let (workflow, period) = (WorkflowId::new(), PeriodId::new());
        let existing = key(workflow, period, OrgUnitId::new());
        store
            .add(DataApproval::new(existing, false, UserId::new()))
            .await
            .unwrap();

        let fresh = key(workflow, period, OrgUnitId::new());
        let batch = vec![
            DataApproval::new(fresh, false, UserId::new()),
            DataApproval::new(existing, false, UserId::new()),
        ];
        let err = store.add_all(batch).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Duplicate(dup) if dup == existing));
        assert!(store.get(&fresh).await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        let repeated = vec![
            DataApproval::new(fresh, false, UserId::new()),
            DataApproval::new(fresh, true, UserId::new()),
        ];
        assert!(store.add_all(repeated).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_all_and_delete_all() {
        let store = MemoryApprovalStore::new();
        let (workflow, period) = (WorkflowId::new(), PeriodId::new());
        let approval = |org_unit| {
            DataApproval::new(key(workflow, period, org_unit), false, UserId::new())
        };
        let mut stored = approval(OrgUnitId::new());
        let missing = approval(OrgUnitId::new());
        store.add(stored.clone()).await.unwrap();

        stored.set_accepted(true, UserId::new());
        let err = store
            .update_all(&[stored.clone(), missing.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound(k) if k == missing.key));
        assert!(!store.get(&stored.key).await.unwrap().unwrap().accepted);

        store.update_all(&[stored.clone()]).await.unwrap();
        assert!(store.get(&stored.key).await.unwrap().unwrap().accepted);

        let deleted = store
            .delete_all(&[stored.key, missing.key, stored.key])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_for_period_and_delete_for_org_unit() {
        let store = MemoryApprovalStore::new();
        let (workflow, period, org_unit) = (WorkflowId::new(), PeriodId::new(), OrgUnitId::new());
        let other_period = PeriodId::new();

        for k in [
            key(workflow, period, org_unit),
            key(workflow, period, OrgUnitId::new()),
            key(workflow, other_period, org_unit),
        ] {
            store.add(DataApproval::new(k, false, UserId::new())).await.unwrap();
        }

        assert_eq!(store.list_for_period(workflow, period).await.unwrap().len(), 2);
        assert_eq!(store.delete_for_org_unit(org_unit).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }
}
