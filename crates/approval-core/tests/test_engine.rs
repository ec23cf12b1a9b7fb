//! Integration tests for the approval workflow engine
//!
//! Every test runs against its own on-disk SQLite database created from
//! the embedded migrations, then drives the engine through its public
//! surface only.

use approval_core::{
    run_migrations, ApprovalEngine, ApprovalError, CounterReferenceGenerator, StaticContext,
};
use approval_types::{
    Actor, AssetTypeId, Decision, DepartmentId, DetailId, EmployeeId, HeaderId, HeaderStatus,
    HistoryAction, JobRoleId, OperationKind, OrgId, SubjectKind, SubjectRef,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tempfile::TempDir;

async fn test_pool(dir: &TempDir) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("approvals.db"))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();

    run_migrations(&pool).await.unwrap();
    pool
}

fn engine_for(pool: SqlitePool) -> ApprovalEngine {
    ApprovalEngine::new(
        Arc::new(StaticContext::new(pool)),
        Arc::new(CounterReferenceGenerator::new(6)),
    )
}

fn org() -> OrgId {
    OrgId::new("ORG1")
}

fn asset() -> SubjectRef {
    SubjectRef::new(SubjectKind::Asset, "ASSET-42")
}

async fn seed_asset_type(pool: &SqlitePool, asset_type: &str, required: Option<bool>) {
    sqlx::query(
        "INSERT INTO asset_types (asset_type_id, org_id, name, approval_required) VALUES (?, ?, ?, ?)",
    )
    .bind(asset_type)
    .bind("ORG1")
    .bind(asset_type)
    .bind(required.map(|r| r as i64))
    .execute(pool)
    .await
    .unwrap();
}

async fn seed_sequence(
    pool: &SqlitePool,
    asset_type: &str,
    operation: OperationKind,
    step: &str,
    sequence_no: i64,
) {
    sqlx::query(
        "INSERT INTO approval_sequences (asset_type_id, org_id, operation, step_id, sequence_no) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(asset_type)
    .bind("ORG1")
    .bind(operation.as_str())
    .bind(step)
    .bind(sequence_no)
    .execute(pool)
    .await
    .unwrap();
}

async fn seed_grant(
    pool: &SqlitePool,
    step: &str,
    job_role: &str,
    department: Option<&str>,
    employee: Option<&str>,
) {
    sqlx::query(
        "INSERT INTO approval_step_grants (step_id, job_role, department, employee_id) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(step)
    .bind(job_role)
    .bind(department)
    .bind(employee)
    .execute(pool)
    .await
    .unwrap();
}

/// The AT1 example: S1 (seq 10, JR1) then S2 (seq 20, JR2)
async fn seed_two_step_chain(pool: &SqlitePool) {
    seed_asset_type(pool, "AT1", Some(true)).await;
    seed_sequence(pool, "AT1", OperationKind::Maintenance, "S1", 10).await;
    seed_sequence(pool, "AT1", OperationKind::Maintenance, "S2", 20).await;
    seed_grant(pool, "S1", "JR1", None, None).await;
    seed_grant(pool, "S2", "JR2", None, None).await;
}

struct DetailRow {
    id: DetailId,
    sequence_no: i64,
    status: String,
    job_role: String,
}

/// Details of a header, ascending by sequence
async fn details_of(pool: &SqlitePool, header_id: &HeaderId) -> Vec<DetailRow> {
    let rows = sqlx::query(
        "SELECT detail_id, sequence_no, status, job_role FROM workflow_details \
         WHERE header_id = ? ORDER BY sequence_no ASC, detail_id ASC",
    )
    .bind(header_id.as_str())
    .fetch_all(pool)
    .await
    .unwrap();

    rows.iter()
        .map(|row| DetailRow {
            id: DetailId::from_string(&row.get::<String, _>("detail_id")).unwrap(),
            sequence_no: row.get("sequence_no"),
            status: row.get("status"),
            job_role: row.get("job_role"),
        })
        .collect()
}

/// The one detail at a sequence held by a job role
fn detail_for(details: &[DetailRow], sequence_no: i64, job_role: &str) -> DetailId {
    details
        .iter()
        .find(|d| d.sequence_no == sequence_no && d.job_role == job_role)
        .unwrap_or_else(|| panic!("no detail at seq {} for {}", sequence_no, job_role))
        .id
        .clone()
}

async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) AS n FROM {}", table);
    sqlx::query(&sql)
        .fetch_one(pool)
        .await
        .unwrap()
        .get::<i64, _>("n")
}

/// Invariant: a non-terminal header has exactly one distinct active sequence
async fn assert_single_active_sequence(pool: &SqlitePool, header_id: &HeaderId) {
    let pending: Vec<i64> = details_of(pool, header_id)
        .await
        .into_iter()
        .filter(|d| d.status == "ACTION_PENDING")
        .map(|d| d.sequence_no)
        .collect();

    assert!(!pending.is_empty(), "no active details on a live workflow");
    let first = pending[0];
    assert!(
        pending.iter().all(|seq| *seq == first),
        "details pending across sequences: {:?}",
        pending
    );
}

fn actor_jr1() -> Actor {
    Actor::new(EmployeeId::new("E1"), JobRoleId::new("JR1"))
}

fn actor_jr2() -> Actor {
    Actor::new(EmployeeId::new("E2"), JobRoleId::new("JR2"))
}

#[tokio::test]
async fn test_two_step_chain_worked_example() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;
    let engine = engine_for(pool.clone());

    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT1"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            Some("please review"),
        )
        .await
        .unwrap();

    assert_eq!(started.status, HeaderStatus::InProgress);

    let details = details_of(&pool, &started.header_id).await;
    assert_eq!(details.len(), 2);
    assert_eq!(details[0].sequence_no, 10);
    assert_eq!(details[0].status, "ACTION_PENDING");
    assert_eq!(details[1].sequence_no, 20);
    assert_eq!(details[1].status, "INACTIVE");

    let d1 = detail_for(&details, 10, "JR1");
    let d2 = detail_for(&details, 20, "JR2");

    let outcome = engine
        .record_decision(&d1, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(outcome.header_status, HeaderStatus::InProgress);

    let details = details_of(&pool, &started.header_id).await;
    assert_eq!(details[0].status, "APPROVED");
    assert_eq!(details[1].status, "ACTION_PENDING");

    let outcome = engine
        .record_decision(&d2, &actor_jr2(), Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(outcome.header_status, HeaderStatus::Completed);
    assert_eq!(
        engine.header_status(&started.header_id).await.unwrap(),
        HeaderStatus::Completed
    );

    // A second decision on an already-decided detail is rejected deterministically
    let err = engine
        .record_decision(&d1, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_single_active_sequence_holds_throughout() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "AT2", Some(true)).await;
    seed_sequence(&pool, "AT2", OperationKind::Scrap, "S1", 10).await;
    seed_sequence(&pool, "AT2", OperationKind::Scrap, "S2", 20).await;
    seed_sequence(&pool, "AT2", OperationKind::Scrap, "S3", 30).await;
    seed_grant(&pool, "S1", "JR1", None, None).await;
    seed_grant(&pool, "S2", "JR1", None, None).await;
    seed_grant(&pool, "S2", "JR2", None, None).await;
    seed_grant(&pool, "S3", "JR2", None, None).await;

    let engine = engine_for(pool.clone());
    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT2"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    assert_single_active_sequence(&pool, &started.header_id).await;

    // Approve everything in activation order, checking the invariant and
    // that the frontier sequence never moves backwards.
    let mut last_frontier = 0;
    loop {
        let details = details_of(&pool, &started.header_id).await;
        let pending: Vec<_> = details
            .iter()
            .filter(|d| d.status == "ACTION_PENDING")
            .collect();
        if pending.is_empty() {
            break;
        }

        let frontier = pending[0].sequence_no;
        assert!(
            frontier >= last_frontier,
            "frontier moved backwards: {} after {}",
            frontier,
            last_frontier
        );
        last_frontier = frontier;

        let next = pending[0];
        let actor = if next.job_role == "JR1" {
            actor_jr1()
        } else {
            actor_jr2()
        };
        engine
            .record_decision(&next.id, &actor, Decision::Approved, None)
            .await
            .unwrap();

        if engine.header_status(&started.header_id).await.unwrap() != HeaderStatus::Completed {
            assert_single_active_sequence(&pool, &started.header_id).await;
        }
    }

    assert_eq!(
        engine.header_status(&started.header_id).await.unwrap(),
        HeaderStatus::Completed
    );
}

#[tokio::test]
async fn test_parallel_approvers_must_all_approve() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "AT3", Some(true)).await;
    seed_sequence(&pool, "AT3", OperationKind::ScrapSale, "S1", 10).await;
    seed_sequence(&pool, "AT3", OperationKind::ScrapSale, "S2", 20).await;
    seed_grant(&pool, "S1", "JR1", None, None).await;
    seed_grant(&pool, "S1", "JR2", None, None).await;
    seed_grant(&pool, "S2", "JR1", None, None).await;

    let engine = engine_for(pool.clone());
    let started = engine
        .instantiate_workflow(
            SubjectRef::new(SubjectKind::DisposalBatch, "BATCH-7"),
            &AssetTypeId::new("AT3"),
            &org(),
            OperationKind::ScrapSale,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    assert_eq!(details.len(), 3);

    // Both sequence-10 details start pending, the sequence-20 one inactive
    let pending_at_10 = details
        .iter()
        .filter(|d| d.sequence_no == 10 && d.status == "ACTION_PENDING")
        .count();
    assert_eq!(pending_at_10, 2);

    // One of two approvals does not resolve the step
    let d_jr1 = detail_for(&details, 10, "JR1");
    engine
        .record_decision(&d_jr1, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    let inactive_at_20 = details
        .iter()
        .filter(|d| d.sequence_no == 20 && d.status == "INACTIVE")
        .count();
    assert_eq!(inactive_at_20, 1, "step advanced before all approvers acted");

    // The second approval resolves sequence 10 and activates sequence 20
    let d_jr2 = detail_for(&details, 10, "JR2");
    engine
        .record_decision(&d_jr2, &actor_jr2(), Decision::Approved, None)
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    let active_at_20 = details
        .iter()
        .filter(|d| d.sequence_no == 20 && d.status == "ACTION_PENDING")
        .count();
    assert_eq!(active_at_20, 1);
}

#[tokio::test]
async fn test_rejection_cancels_header_and_freezes_details() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "AT4", Some(true)).await;
    seed_sequence(&pool, "AT4", OperationKind::Scrap, "S1", 10).await;
    seed_sequence(&pool, "AT4", OperationKind::Scrap, "S2", 20).await;
    seed_grant(&pool, "S1", "JR1", None, None).await;
    seed_grant(&pool, "S1", "JR2", None, None).await;
    seed_grant(&pool, "S2", "JR1", None, None).await;

    let engine = engine_for(pool.clone());
    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT4"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    let d_jr1 = detail_for(&details, 10, "JR1");
    let d_jr2 = detail_for(&details, 10, "JR2");
    let d_inactive = detail_for(&details, 20, "JR1");

    let outcome = engine
        .record_decision(&d_jr1, &actor_jr1(), Decision::Rejected, Some("asset still in use"))
        .await
        .unwrap();
    assert_eq!(outcome.header_status, HeaderStatus::Cancelled);

    // The sibling detail is frozen: the header is terminal
    let err = engine
        .record_decision(&d_jr2, &actor_jr2(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidTransition(_)));

    // So is the never-activated one
    let err = engine
        .record_decision(&d_inactive, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidTransition(_)));

    assert_eq!(
        engine.header_status(&started.header_id).await.unwrap(),
        HeaderStatus::Cancelled
    );
}

#[tokio::test]
async fn test_decision_requires_the_details_own_grant() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "AT5", Some(true)).await;
    seed_sequence(&pool, "AT5", OperationKind::Maintenance, "S1", 10).await;
    seed_grant(&pool, "S1", "JR1", Some("D1"), None).await;
    seed_sequence(&pool, "AT5", OperationKind::Maintenance, "S2", 20).await;
    seed_grant(&pool, "S2", "JR2", None, Some("E9")).await;

    let engine = engine_for(pool.clone());
    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT5"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    let d1 = detail_for(&details, 10, "JR1");
    let d2 = detail_for(&details, 20, "JR2");

    // Wrong job role
    let err = engine
        .record_decision(&d1, &actor_jr2(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)));

    // Right role, wrong department
    let wrong_department = Actor::new(EmployeeId::new("E1"), JobRoleId::new("JR1"))
        .in_department(DepartmentId::new("D2"));
    let err = engine
        .record_decision(&d1, &wrong_department, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)));

    // Right role and department succeeds
    let in_department = Actor::new(EmployeeId::new("E1"), JobRoleId::new("JR1"))
        .in_department(DepartmentId::new("D1"));
    engine
        .record_decision(&d1, &in_department, Decision::Approved, None)
        .await
        .unwrap();

    // Grant pinned to employee E9 refuses any other JR2 holder
    let err = engine
        .record_decision(&d2, &actor_jr2(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Forbidden(_)));

    let pinned = Actor::new(EmployeeId::new("E9"), JobRoleId::new("JR2"));
    let outcome = engine
        .record_decision(&d2, &pinned, Decision::Approved, None)
        .await
        .unwrap();
    assert_eq!(outcome.header_status, HeaderStatus::Completed);
}

#[tokio::test]
async fn test_bypass_defaults_to_required() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "CONFIGURED_OFF", Some(false)).await;
    seed_asset_type(&pool, "CONFIGURED_ON", Some(true)).await;
    seed_asset_type(&pool, "NEVER_DECIDED", None).await;

    let engine = engine_for(pool.clone());

    assert!(!engine
        .is_workflow_required(&AssetTypeId::new("CONFIGURED_OFF"), &org())
        .await
        .unwrap());
    assert!(engine
        .is_workflow_required(&AssetTypeId::new("CONFIGURED_ON"), &org())
        .await
        .unwrap());
    // NULL flag: fail safe toward requiring approval
    assert!(engine
        .is_workflow_required(&AssetTypeId::new("NEVER_DECIDED"), &org())
        .await
        .unwrap());
    // Unknown asset type: same
    assert!(engine
        .is_workflow_required(&AssetTypeId::new("NO_SUCH_TYPE"), &org())
        .await
        .unwrap());

    // Bypassed operations create no rows at all
    assert_eq!(table_count(&pool, "workflow_headers").await, 0);
    assert_eq!(table_count(&pool, "workflow_details").await, 0);
    assert_eq!(table_count(&pool, "workflow_history").await, 0);
}

#[tokio::test]
async fn test_missing_sequence_aborts_with_nothing_persisted() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_asset_type(&pool, "AT6", Some(true)).await;

    let engine = engine_for(pool.clone());
    let err = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT6"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApprovalError::ConfigurationMissing(_)));
    assert_eq!(table_count(&pool, "workflow_headers").await, 0);
    assert_eq!(table_count(&pool, "workflow_details").await, 0);
    assert_eq!(table_count(&pool, "workflow_history").await, 0);
}

#[tokio::test]
async fn test_step_without_grants_aborts_all_or_nothing() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;

    seed_asset_type(&pool, "AT7", Some(true)).await;
    seed_sequence(&pool, "AT7", OperationKind::Scrap, "S1", 10).await;
    seed_sequence(&pool, "AT7", OperationKind::Scrap, "S2", 20).await;
    seed_grant(&pool, "S1", "JR1", None, None).await;
    // S2 has no grants

    let engine = engine_for(pool.clone());
    let err = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT7"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApprovalError::ConfigurationMissing(_)));
    // No partial workflow: not even the header or the resolvable S1 details
    assert_eq!(table_count(&pool, "workflow_headers").await, 0);
    assert_eq!(table_count(&pool, "workflow_details").await, 0);
    assert_eq!(table_count(&pool, "workflow_history").await, 0);
}

#[tokio::test]
async fn test_audit_history_is_complete_and_ordered() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;
    let engine = engine_for(pool.clone());

    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT1"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            Some("kickoff"),
        )
        .await
        .unwrap();

    let history = engine.history(&started.header_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::Created);
    assert_eq!(history[0].note.as_deref(), Some("kickoff"));

    let details = details_of(&pool, &started.header_id).await;
    let d1 = detail_for(&details, 10, "JR1");
    let d2 = detail_for(&details, 20, "JR2");

    engine
        .record_decision(&d1, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();
    engine
        .record_decision(&d2, &actor_jr2(), Decision::Approved, Some("done"))
        .await
        .unwrap();

    // 1 creation + 2 decisions + 1 header status change (-> Completed)
    let history = engine.history(&started.header_id).await.unwrap();
    assert_eq!(history.len(), 4);

    let actions: Vec<_> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Created,
            HistoryAction::Approved,
            HistoryAction::Approved,
            HistoryAction::StatusChanged,
        ]
    );

    // Insertion order is preserved
    let entry_ids: Vec<_> = history.iter().map(|entry| entry.entry_id).collect();
    let mut sorted = entry_ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(entry_ids, sorted);

    // Detail-level entries point at their detail, header-level ones do not
    assert!(history[0].detail_id.is_none());
    assert_eq!(history[1].detail_id.as_ref(), Some(&d1));
    assert_eq!(history[2].detail_id.as_ref(), Some(&d2));
    assert!(history[3].detail_id.is_none());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    let engine = engine_for(pool.clone());

    let err = engine
        .record_decision(&DetailId::new(), &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(_)));

    let err = engine.header_status(&HeaderId::new()).await.unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(_)));

    let err = engine.history(&HeaderId::new()).await.unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound(_)));
}

#[tokio::test]
async fn test_workflow_references_are_unique_and_prefixed() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;

    seed_asset_type(&pool, "AT8", Some(true)).await;
    seed_sequence(&pool, "AT8", OperationKind::Scrap, "S1", 10).await;

    let engine = engine_for(pool.clone());
    let mut references = Vec::new();

    for i in 0..3 {
        let started = engine
            .instantiate_workflow(
                SubjectRef::new(SubjectKind::Asset, format!("ASSET-{}", i)),
                &AssetTypeId::new("AT1"),
                &org(),
                OperationKind::Maintenance,
                &actor_jr1(),
                None,
            )
            .await
            .unwrap();
        assert!(started.workflow_no.starts_with("MNT-"), "{}", started.workflow_no);
        references.push(started.workflow_no);
    }

    let scrapped = engine
        .instantiate_workflow(
            SubjectRef::new(SubjectKind::Asset, "ASSET-S"),
            &AssetTypeId::new("AT8"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(scrapped.workflow_no, "SCR-000001");
    references.push(scrapped.workflow_no);

    let mut deduped = references.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), references.len());
    assert_eq!(references[0], "MNT-000001");
    assert_eq!(references[2], "MNT-000003");
}

#[tokio::test]
async fn test_pending_work_queue_follows_activation() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;
    let engine = engine_for(pool.clone());

    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT1"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            Some("please review"),
        )
        .await
        .unwrap();

    let jr1_queue = engine.pending_for_actor(&org(), &actor_jr1()).await.unwrap();
    assert_eq!(jr1_queue.len(), 1);
    assert_eq!(jr1_queue[0].workflow_no, started.workflow_no);
    assert_eq!(jr1_queue[0].note.as_deref(), Some("please review"));

    // Nothing is pending for the second step's role yet
    assert!(engine
        .pending_for_actor(&org(), &actor_jr2())
        .await
        .unwrap()
        .is_empty());

    engine
        .record_decision(&jr1_queue[0].detail_id, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();

    // Activation moved the work to JR2 and emptied JR1's queue
    assert!(engine
        .pending_for_actor(&org(), &actor_jr1())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        engine
            .pending_for_actor(&org(), &actor_jr2())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_status_counts_by_org() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;

    seed_asset_type(&pool, "AT9", Some(true)).await;
    seed_sequence(&pool, "AT9", OperationKind::Scrap, "S1", 10).await;

    let engine = engine_for(pool.clone());

    let _running = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT1"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    let one_step = engine
        .instantiate_workflow(
            SubjectRef::new(SubjectKind::Asset, "ASSET-99"),
            &AssetTypeId::new("AT9"),
            &org(),
            OperationKind::Scrap,
            &actor_jr1(),
            None,
        )
        .await
        .unwrap();

    let details = details_of(&pool, &one_step.header_id).await;
    engine
        .record_decision(&details[0].id, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();

    let counts = engine.status_counts(&org()).await.unwrap();
    assert_eq!(counts.get(HeaderStatus::InProgress), 1);
    assert_eq!(counts.get(HeaderStatus::Completed), 1);
    assert_eq!(counts.get(HeaderStatus::Cancelled), 0);
    assert_eq!(counts.total(), 2);

    // A different org sees nothing
    let elsewhere = engine.status_counts(&OrgId::new("ORG2")).await.unwrap();
    assert_eq!(elsewhere.total(), 0);
}

#[tokio::test]
async fn test_decision_note_is_kept_and_initiation_note_preserved() {
    let dir = TempDir::new().unwrap();
    let pool = test_pool(&dir).await;
    seed_two_step_chain(&pool).await;
    let engine = engine_for(pool.clone());

    let started = engine
        .instantiate_workflow(
            asset(),
            &AssetTypeId::new("AT1"),
            &org(),
            OperationKind::Maintenance,
            &actor_jr1(),
            Some("initial context"),
        )
        .await
        .unwrap();

    let details = details_of(&pool, &started.header_id).await;
    let d1 = detail_for(&details, 10, "JR1");
    let d2 = detail_for(&details, 20, "JR2");

    // Approving without a note keeps the initiating note on the detail
    engine
        .record_decision(&d1, &actor_jr1(), Decision::Approved, None)
        .await
        .unwrap();

    let note: Option<String> =
        sqlx::query("SELECT note FROM workflow_details WHERE detail_id = ?")
            .bind(d1.as_str())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("note");
    assert_eq!(note.as_deref(), Some("initial context"));

    // The second-step detail never received the initiating note
    let note: Option<String> =
        sqlx::query("SELECT note FROM workflow_details WHERE detail_id = ?")
            .bind(d2.as_str())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("note");
    assert_eq!(note, None);
}
