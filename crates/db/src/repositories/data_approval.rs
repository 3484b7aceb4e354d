//! Approval fact repository.
//!
//! Implements `DataApprovalStore` using SeaORM. Duplicate keys are caught by
//! the table's unique constraint, not by reading first. Batch writes run in
//! one database transaction.

use chrono::Utc;
use rungs_core::approval::{ApprovalError, ApprovalKey, DataApproval, DataApprovalStore};
use rungs_shared::types::{
    ApprovalLevelId, CategoryOptionComboId, DataApprovalId, OrgUnitId, PeriodId, UserId,
    WorkflowId,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::debug;

use crate::entities::data_approvals;

/// Approval fact repository implementation.
#[derive(Debug, Clone)]
pub struct DataApprovalRepository {
    db: DatabaseConnection,
}

impl DataApprovalRepository {
    /// Create a new approval fact repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl DataApprovalStore for DataApprovalRepository {
    async fn add(&self, approval: DataApproval) -> Result<(), ApprovalError> {
        insert_one(&self.db, &approval).await?;
        debug!(key = %approval.key, "Data approval inserted");
        Ok(())
    }

    async fn update(&self, approval: &DataApproval) -> Result<(), ApprovalError> {
        update_one(&self.db, approval).await
    }

    async fn delete(&self, key: &ApprovalKey) -> Result<bool, ApprovalError> {
        Ok(delete_one(&self.db, key).await? > 0)
    }

    async fn get(&self, key: &ApprovalKey) -> Result<Option<DataApproval>, ApprovalError> {
        let model = data_approvals::Entity::find()
            .filter(key_condition(key))
            .one(&self.db)
            .await
            .map_err(|e| store_error(&e))?;

        Ok(model.map(to_domain))
    }

    async fn list_for_period(
        &self,
        workflow: WorkflowId,
        period: PeriodId,
    ) -> Result<Vec<DataApproval>, ApprovalError> {
        let models = data_approvals::Entity::find()
            .filter(data_approvals::Column::WorkflowId.eq(workflow.into_inner()))
            .filter(data_approvals::Column::PeriodId.eq(period.into_inner()))
            .order_by_asc(data_approvals::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| store_error(&e))?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn add_all(&self, approvals: Vec<DataApproval>) -> Result<(), ApprovalError> {
        // Dropping the transaction without commit rolls it back
        let txn = self.db.begin().await.map_err(|e| store_error(&e))?;
        for approval in &approvals {
            insert_one(&txn, approval).await?;
        }
        txn.commit().await.map_err(|e| store_error(&e))?;

        debug!(count = approvals.len(), "Data approvals inserted");
        Ok(())
    }

    async fn update_all(&self, approvals: &[DataApproval]) -> Result<(), ApprovalError> {
        let txn = self.db.begin().await.map_err(|e| store_error(&e))?;
        for approval in approvals {
            update_one(&txn, approval).await?;
        }
        txn.commit().await.map_err(|e| store_error(&e))?;
        Ok(())
    }

    async fn delete_all(&self, keys: &[ApprovalKey]) -> Result<u64, ApprovalError> {
        let txn = self.db.begin().await.map_err(|e| store_error(&e))?;
        let mut deleted = 0;
        for key in keys {
            deleted += delete_one(&txn, key).await?;
        }
        txn.commit().await.map_err(|e| store_error(&e))?;
        Ok(deleted)
    }

    async fn delete_for_org_unit(&self, org_unit: OrgUnitId) -> Result<u64, ApprovalError> {
        let result = data_approvals::Entity::delete_many()
            .filter(data_approvals::Column::OrgUnitId.eq(org_unit.into_inner()))
            .exec(&self.db)
            .await
            .map_err(|e| store_error(&e))?;

        Ok(result.rows_affected)
    }
}

/// Inserts one fact; a unique constraint violation becomes `Duplicate`.
async fn insert_one<C: ConnectionTrait>(
    conn: &C,
    approval: &DataApproval,
) -> Result<(), ApprovalError> {
    data_approvals::Entity::insert(to_active_model(approval))
        .exec_without_returning(conn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ApprovalError::Duplicate(approval.key),
            _ => store_error(&e),
        })?;
    Ok(())
}

async fn update_one<C: ConnectionTrait>(
    conn: &C,
    approval: &DataApproval,
) -> Result<(), ApprovalError> {
    let result = data_approvals::Entity::update_many()
        .col_expr(data_approvals::Column::Accepted, Expr::value(approval.accepted))
        .col_expr(
            data_approvals::Column::UpdatedAt,
            Expr::value(approval.last_updated.fixed_offset()),
        )
        .col_expr(
            data_approvals::Column::UpdatedBy,
            Expr::value(approval.last_updated_by.into_inner()),
        )
        .filter(key_condition(&approval.key))
        .exec(conn)
        .await
        .map_err(|e| store_error(&e))?;

    if result.rows_affected == 0 {
        return Err(ApprovalError::NotFound(approval.key));
    }
    Ok(())
}

async fn delete_one<C: ConnectionTrait>(
    conn: &C,
    key: &ApprovalKey,
) -> Result<u64, ApprovalError> {
    let result = data_approvals::Entity::delete_many()
        .filter(key_condition(key))
        .exec(conn)
        .await
        .map_err(|e| store_error(&e))?;

    Ok(result.rows_affected)
}

fn store_error(err: &DbErr) -> ApprovalError {
    ApprovalError::Store(err.to_string())
}

fn key_condition(key: &ApprovalKey) -> Condition {
    Condition::all()
        .add(data_approvals::Column::LevelId.eq(key.level.into_inner()))
        .add(data_approvals::Column::WorkflowId.eq(key.workflow.into_inner()))
        .add(data_approvals::Column::PeriodId.eq(key.period.into_inner()))
        .add(data_approvals::Column::OrgUnitId.eq(key.org_unit.into_inner()))
        .add(data_approvals::Column::OptionComboId.eq(key.option_combo.into_inner()))
}

fn to_active_model(approval: &DataApproval) -> data_approvals::ActiveModel {
    data_approvals::ActiveModel {
        id: Set(approval.id.into_inner()),
        level_id: Set(approval.key.level.into_inner()),
        workflow_id: Set(approval.key.workflow.into_inner()),
        period_id: Set(approval.key.period.into_inner()),
        org_unit_id: Set(approval.key.org_unit.into_inner()),
        option_combo_id: Set(approval.key.option_combo.into_inner()),
        accepted: Set(approval.accepted),
        created_at: Set(approval.created.fixed_offset()),
        created_by: Set(approval.created_by.into_inner()),
        updated_at: Set(approval.last_updated.fixed_offset()),
        updated_by: Set(approval.last_updated_by.into_inner()),
    }
}

fn to_domain(model: data_approvals::Model) -> DataApproval {
    DataApproval {
        id: DataApprovalId::from_uuid(model.id),
        key: ApprovalKey {
            level: ApprovalLevelId::from_uuid(model.level_id),
            workflow: WorkflowId::from_uuid(model.workflow_id),
            period: PeriodId::from_uuid(model.period_id),
            org_unit: OrgUnitId::from_uuid(model.org_unit_id),
            option_combo: CategoryOptionComboId::from_uuid(model.option_combo_id),
        },
        accepted: model.accepted,
        created: model.created_at.with_timezone(&Utc),
        created_by: UserId::from_uuid(model.created_by),
        last_updated: model.updated_at.with_timezone(&Utc),
        last_updated_by: UserId::from_uuid(model.updated_by),
    }
}
