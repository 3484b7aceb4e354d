//! Integration tests for the approval fact repository.
//!
//! Each test runs against its own in-memory SQLite database migrated with
//! the real migrator.

use std::sync::Arc;

use futures::future::join_all;
use rungs_core::approval::{
    ApprovalError, ApprovalKey, ApprovalLevel, ApprovalMetadata, ApprovalQuery,
    ApprovalStateResolver, ApprovalSettings, DataApproval, DataApprovalState, DataApprovalStore,
    Workflow,
};
use rungs_core::category::{CategoryCatalog, CategoryCombo, CategoryOption, CategoryOptionCombo};
use rungs_core::hierarchy::OrgUnitHierarchy;
use rungs_core::period::{Period, PeriodCalendar, PeriodType};
use rungs_core::user::CurrentUser;
use rungs_db::DataApprovalRepository;
use rungs_db::migration::{Migrator, MigratorTrait};
use rungs_shared::types::{
    ApprovalLevelId, CategoryOptionComboId, OrgUnitId, PeriodId, UserId, WorkflowId,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    db
}

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
async fn test_add_get_and_duplicate() {
    let repo = DataApprovalRepository::new(setup().await);
    let user = UserId::new();
    let key = key(WorkflowId::new(), PeriodId::new(), OrgUnitId::new());

    repo.add(DataApproval::new(key, false, user)).await.unwrap();

    let found = repo.get(&key).await.unwrap().expect("approval exists");
    assert_eq!(found.key, key);
    assert!(!found.accepted);
    assert_eq!(found.created_by, user);

    let err = repo.add(DataApproval::new(key, true, user)).await.unwrap_err();
    assert!(matches!(err, ApprovalError::Duplicate(k) if k == key));

    let missing = ApprovalKey {
        org_unit: OrgUnitId::new(),
        ..key
    };
    assert!(repo.get(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_acceptance() {
    let repo = DataApprovalRepository::new(setup().await);
    let approver = UserId::new();
    let acceptor = UserId::new();
    let key = key(WorkflowId::new(), PeriodId::new(), OrgUnitId::new());

    let mut approval = DataApproval::new(key, false, approver);
    repo.add(approval.clone()).await.unwrap();

    approval.set_accepted(true, acceptor);
    repo.update(&approval).await.unwrap();

    let found = repo.get(&key).await.unwrap().unwrap();
    assert!(found.accepted);
    assert_eq!(found.created_by, approver);
    assert_eq!(found.last_updated_by, acceptor);

    let stranger = DataApproval::new(
        ApprovalKey {
            org_unit: OrgUnitId::new(),
            ..key
        },
        true,
        acceptor,
    );
    let err = repo.update(&stranger).await.unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(_)));
}

#[tokio::test]
async fn test_batch_writes_roll_back_on_failure() {
    let repo = DataApprovalRepository::new(setup().await);
    let user = UserId::new();
    let workflow = WorkflowId::new();
    let period = PeriodId::new();
    let existing = key(workflow, period, OrgUnitId::new());
    let fresh = key(workflow, period, OrgUnitId::new());
    repo.add(DataApproval::new(existing, false, user)).await.unwrap();

    let batch = vec![
        DataApproval::new(fresh, false, user),
        DataApproval::new(existing, false, user),
    ];
    let err = repo.add_all(batch).await.unwrap_err();
    assert!(matches!(err, ApprovalError::Duplicate(k) if k == existing));
    assert!(repo.get(&fresh).await.unwrap().is_none());
    assert_eq!(repo.list_for_period(workflow, period).await.unwrap().len(), 1);

    let mut stored = repo.get(&existing).await.unwrap().unwrap();
    stored.set_accepted(true, user);
    let missing = DataApproval::new(fresh, true, user);
    let err = repo.update_all(&[stored.clone(), missing]).await.unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(k) if k == fresh));
    assert!(!repo.get(&existing).await.unwrap().unwrap().accepted);

    repo.update_all(&[stored]).await.unwrap();
    assert!(repo.get(&existing).await.unwrap().unwrap().accepted);

    repo.add_all(vec![DataApproval::new(fresh, false, user)]).await.unwrap();
    assert_eq!(repo.delete_all(&[existing, fresh, existing]).await.unwrap(), 2);
    assert!(repo.list_for_period(workflow, period).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_and_delete() {
    let repo = DataApprovalRepository::new(setup().await);
    let user = UserId::new();
    let workflow = WorkflowId::new();
    let period = PeriodId::new();
    let north = OrgUnitId::new();
    let south = OrgUnitId::new();

    let a = key(workflow, period, north);
    let b = key(workflow, period, south);
    let c = key(workflow, PeriodId::new(), north);
    for k in [a, b, c] {
        repo.add(DataApproval::new(k, false, user)).await.unwrap();
    }

    let listed = repo.list_for_period(workflow, period).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|approval| approval.key.period == period));

    assert!(repo.delete(&b).await.unwrap());
    assert!(!repo.delete(&b).await.unwrap());

    assert_eq!(repo.delete_for_org_unit(north).await.unwrap(), 2);
    assert!(repo.list_for_period(workflow, period).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_adds_of_one_key_keep_one_record() {
    let repo = Arc::new(DataApprovalRepository::new(setup().await));
    let key = key(WorkflowId::new(), PeriodId::new(), OrgUnitId::new());

    let attempts = (0..8).map(|_| {
        let repo = Arc::clone(&repo);
        async move { repo.add(DataApproval::new(key, false, UserId::new())).await }
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ApprovalError::Duplicate(_))));
    assert_eq!(
        repo.list_for_period(key.workflow, key.period).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_resolver_reads_repository_facts() {
    let repo = Arc::new(DataApprovalRepository::new(setup().await));

    let mut hierarchy = OrgUnitHierarchy::new();
    let root = hierarchy.add_root("Root").unwrap();
    let district = hierarchy.add_child(root, "District A").unwrap();

    let mut catalog = CategoryCatalog::new();
    let option = catalog.add_option(CategoryOption::new("default")).unwrap();
    let combo = catalog
        .add_option_combo(CategoryOptionCombo::new("default", vec![option]))
        .unwrap();
    let category_combo = catalog
        .add_category_combo(CategoryCombo::new("default", vec![combo]))
        .unwrap();
    catalog.set_default_category_combo(category_combo).unwrap();

    let mut calendar = PeriodCalendar::new();
    let period_id = calendar.add(Period::from_iso("202401").unwrap()).unwrap();
    let period = calendar.require(period_id).unwrap().clone();

    let workflow = Workflow::new(
        "Monthly approval",
        PeriodType::Monthly,
        vec![ApprovalLevel::new("L1", 1, 1), ApprovalLevel::new("L2", 2, 2)],
    )
    .unwrap()
    .with_source(district);
    let l2 = workflow.sorted_levels()[1].id;

    let admin = CurrentUser::superuser("admin");
    repo.add(DataApproval::new(
        ApprovalKey {
            level: l2,
            workflow: workflow.id,
            period: period.id,
            org_unit: district,
            option_combo: combo,
        },
        true,
        admin.id,
    ))
    .await
    .unwrap();

    let metadata = Arc::new(ApprovalMetadata {
        hierarchy,
        catalog,
        calendar,
    });
    let resolver = ApprovalStateResolver::new(Arc::clone(&repo), metadata);
    let settings = ApprovalSettings::default();

    let query = ApprovalQuery::new(&workflow, &period).for_org_unit(root);
    let statuses = resolver.get_data_approvals(&query, &admin, &settings).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].state, DataApprovalState::UnapprovedReady);

    let query = ApprovalQuery::new(&workflow, &period).for_org_unit(district);
    let statuses = resolver.get_data_approvals(&query, &admin, &settings).await.unwrap();
    assert_eq!(statuses[0].state, DataApprovalState::AcceptedHere);
}
