//! Data approvals migration.
//!
//! Creates the approval fact table. The unique constraint over
//! (level, workflow, period, org unit, option combo) is what serialises
//! concurrent approvals of the same pair.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in DATA_APPROVALS_SQL {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS data_approvals;")
            .await?;
        Ok(())
    }
}

// Kept to SQL understood by both PostgreSQL and SQLite.
const DATA_APPROVALS_SQL: [&str; 3] = [
    r"
CREATE TABLE data_approvals (
    id UUID PRIMARY KEY,
    level_id UUID NOT NULL,
    workflow_id UUID NOT NULL,
    period_id UUID NOT NULL,
    org_unit_id UUID NOT NULL,
    option_combo_id UUID NOT NULL,
    accepted BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL,
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    updated_by UUID NOT NULL,
    CONSTRAINT uq_data_approvals_key
        UNIQUE (level_id, workflow_id, period_id, org_unit_id, option_combo_id)
);
",
    // Per-request fact loading
    r"
CREATE INDEX idx_data_approvals_period ON data_approvals(workflow_id, period_id);
",
    // Org unit deletion
    r"
CREATE INDEX idx_data_approvals_org_unit ON data_approvals(org_unit_id);
",
];
