//! Header and detail persistence
//!
//! Every function operates on a borrowed connection so the engine can run
//! it inside the transaction it controls. Detail transitions go through the
//! status-guarded update in [`claim_detail`]; nothing else flips a detail
//! out of `ActionPending`.

use crate::error::{ApprovalError, Result};
use approval_types::{
    Actor, AssetTypeId, DepartmentId, DetailId, DetailStatus, EmployeeId, HeaderId, HeaderStatus,
    JobRoleId, OperationKind, OrgId, PendingDetail, RoleGrant, StatusCounts, StepId, SubjectKind,
    SubjectRef, WorkflowDetail, WorkflowHeader,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub async fn insert_header(conn: &mut SqliteConnection, header: &WorkflowHeader) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workflow_headers
            (header_id, workflow_no, org_id, asset_type_id, operation,
             subject_kind, subject_id, status, created_by, created_at, changed_by, changed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(header.id.as_str())
    .bind(&header.workflow_no)
    .bind(header.org_id.as_str())
    .bind(header.asset_type_id.as_str())
    .bind(header.operation.as_str())
    .bind(header.subject.kind.as_str())
    .bind(&header.subject.id)
    .bind(header.status.as_str())
    .bind(header.created_by.as_str())
    .bind(header.created_at)
    .bind(header.changed_by.as_str())
    .bind(header.changed_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn insert_detail(conn: &mut SqliteConnection, detail: &WorkflowDetail) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workflow_details
            (detail_id, header_id, step_id, job_role, department, employee_id,
             sequence_no, status, note, changed_by, changed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(detail.id.as_str())
    .bind(detail.header_id.as_str())
    .bind(detail.step_id.as_str())
    .bind(detail.grant.job_role.as_str())
    .bind(detail.grant.department.as_ref().map(|d| d.as_str()))
    .bind(detail.grant.employee.as_ref().map(|e| e.as_str()))
    .bind(detail.sequence_no)
    .bind(detail.status.as_str())
    .bind(detail.note.as_deref())
    .bind(detail.changed_by.as_ref().map(|e| e.as_str()))
    .bind(detail.changed_at)
    .execute(conn)
    .await?;

    Ok(())
}

fn header_from_row(row: &SqliteRow) -> Result<WorkflowHeader> {
    let operation: String = row.try_get("operation")?;
    let subject_kind: String = row.try_get("subject_kind")?;
    let status: String = row.try_get("status")?;

    Ok(WorkflowHeader {
        id: HeaderId::from_string(&row.try_get::<String, _>("header_id")?)
            .map_err(ApprovalError::Validation)?,
        workflow_no: row.try_get("workflow_no")?,
        org_id: OrgId::new(row.try_get::<String, _>("org_id")?),
        asset_type_id: AssetTypeId::new(row.try_get::<String, _>("asset_type_id")?),
        operation: OperationKind::parse(&operation)
            .map_err(|e| ApprovalError::Validation(e.to_string()))?,
        subject: SubjectRef {
            kind: SubjectKind::parse(&subject_kind)
                .map_err(|e| ApprovalError::Validation(e.to_string()))?,
            id: row.try_get("subject_id")?,
        },
        status: HeaderStatus::parse(&status)
            .map_err(|e| ApprovalError::Validation(e.to_string()))?,
        created_by: EmployeeId::new(row.try_get::<String, _>("created_by")?),
        created_at: row.try_get("created_at")?,
        changed_by: EmployeeId::new(row.try_get::<String, _>("changed_by")?),
        changed_at: row.try_get("changed_at")?,
    })
}

fn detail_from_row(row: &SqliteRow) -> Result<WorkflowDetail> {
    let status: String = row.try_get("status")?;

    Ok(WorkflowDetail {
        id: DetailId::from_string(&row.try_get::<String, _>("detail_id")?)
            .map_err(ApprovalError::Validation)?,
        header_id: HeaderId::from_string(&row.try_get::<String, _>("header_id")?)
            .map_err(ApprovalError::Validation)?,
        step_id: StepId::new(row.try_get::<String, _>("step_id")?),
        grant: RoleGrant {
            job_role: JobRoleId::new(row.try_get::<String, _>("job_role")?),
            department: row
                .try_get::<Option<String>, _>("department")?
                .map(DepartmentId::new),
            employee: row
                .try_get::<Option<String>, _>("employee_id")?
                .map(EmployeeId::new),
        },
        sequence_no: row.try_get("sequence_no")?,
        status: DetailStatus::parse(&status)
            .map_err(|e| ApprovalError::Validation(e.to_string()))?,
        note: row.try_get("note")?,
        changed_by: row
            .try_get::<Option<String>, _>("changed_by")?
            .map(EmployeeId::new),
        changed_at: row.try_get("changed_at")?,
    })
}

pub async fn fetch_header(
    conn: &mut SqliteConnection,
    header_id: &HeaderId,
) -> Result<Option<WorkflowHeader>> {
    let row = sqlx::query(
        r#"
        SELECT header_id, workflow_no, org_id, asset_type_id, operation,
               subject_kind, subject_id, status, created_by, created_at, changed_by, changed_at
        FROM workflow_headers
        WHERE header_id = ?1
        "#,
    )
    .bind(header_id.as_str())
    .fetch_optional(conn)
    .await?;

    row.map(|row| header_from_row(&row)).transpose()
}

pub async fn fetch_detail(
    conn: &mut SqliteConnection,
    detail_id: &DetailId,
) -> Result<Option<WorkflowDetail>> {
    let row = sqlx::query(
        r#"
        SELECT detail_id, header_id, step_id, job_role, department, employee_id,
               sequence_no, status, note, changed_by, changed_at
        FROM workflow_details
        WHERE detail_id = ?1
        "#,
    )
    .bind(detail_id.as_str())
    .fetch_optional(conn)
    .await?;

    row.map(|row| detail_from_row(&row)).transpose()
}

/// All details of a header, ascending by sequence
pub async fn fetch_details_for_header(
    conn: &mut SqliteConnection,
    header_id: &HeaderId,
) -> Result<Vec<WorkflowDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT detail_id, header_id, step_id, job_role, department, employee_id,
               sequence_no, status, note, changed_by, changed_at
        FROM workflow_details
        WHERE header_id = ?1
        ORDER BY sequence_no ASC, detail_id ASC
        "#,
    )
    .bind(header_id.as_str())
    .fetch_all(conn)
    .await?;

    rows.iter().map(detail_from_row).collect()
}

pub async fn update_header_status(
    conn: &mut SqliteConnection,
    header_id: &HeaderId,
    status: HeaderStatus,
    changed_by: &EmployeeId,
    changed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE workflow_headers
        SET status = ?1, changed_by = ?2, changed_at = ?3
        WHERE header_id = ?4
        "#,
    )
    .bind(status.as_str())
    .bind(changed_by.as_str())
    .bind(changed_at)
    .bind(header_id.as_str())
    .execute(conn)
    .await?;

    Ok(())
}

/// Transition a detail out of `ActionPending`.
///
/// The status guard in the WHERE clause is the row-level re-validation: a
/// racing duplicate observes zero rows affected and gets `false`, which the
/// processor maps to `InvalidTransition`. A missing note keeps whatever
/// note the detail already carries.
pub async fn claim_detail(
    conn: &mut SqliteConnection,
    detail_id: &DetailId,
    status: DetailStatus,
    note: Option<&str>,
    actor: &EmployeeId,
    at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_details
        SET status = ?1, note = COALESCE(?2, note), changed_by = ?3, changed_at = ?4
        WHERE detail_id = ?5 AND status = 'ACTION_PENDING'
        "#,
    )
    .bind(status.as_str())
    .bind(note)
    .bind(actor.as_str())
    .bind(at)
    .bind(detail_id.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Activate every inactive detail at the given sequence. Returns how many
/// details were activated.
pub async fn activate_details(
    conn: &mut SqliteConnection,
    header_id: &HeaderId,
    sequence_no: i64,
    at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_details
        SET status = 'ACTION_PENDING', changed_at = ?1
        WHERE header_id = ?2 AND sequence_no = ?3 AND status = 'INACTIVE'
        "#,
    )
    .bind(at)
    .bind(header_id.as_str())
    .bind(sequence_no)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// All `ActionPending` details whose grant the actor holds, newest first
pub async fn pending_for_actor(
    conn: &mut SqliteConnection,
    org: &OrgId,
    actor: &Actor,
) -> Result<Vec<PendingDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT d.detail_id, d.header_id, h.workflow_no, h.operation,
               h.subject_kind, h.subject_id, d.step_id, d.sequence_no, d.note, h.created_at
        FROM workflow_details d
        JOIN workflow_headers h ON h.header_id = d.header_id
        WHERE h.org_id = ?1
          AND d.status = 'ACTION_PENDING'
          AND d.job_role = ?2
          AND (d.department IS NULL OR d.department = ?3)
          AND (d.employee_id IS NULL OR d.employee_id = ?4)
        ORDER BY h.created_at DESC, d.sequence_no ASC
        "#,
    )
    .bind(org.as_str())
    .bind(actor.job_role.as_str())
    .bind(actor.department.as_ref().map(|d| d.as_str()))
    .bind(actor.employee_id.as_str())
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let operation: String = row.try_get("operation")?;
            let subject_kind: String = row.try_get("subject_kind")?;

            Ok(PendingDetail {
                detail_id: DetailId::from_string(&row.try_get::<String, _>("detail_id")?)
                    .map_err(ApprovalError::Validation)?,
                header_id: HeaderId::from_string(&row.try_get::<String, _>("header_id")?)
                    .map_err(ApprovalError::Validation)?,
                workflow_no: row.try_get("workflow_no")?,
                operation: OperationKind::parse(&operation)
                    .map_err(|e| ApprovalError::Validation(e.to_string()))?,
                subject: SubjectRef {
                    kind: SubjectKind::parse(&subject_kind)
                        .map_err(|e| ApprovalError::Validation(e.to_string()))?,
                    id: row.try_get("subject_id")?,
                },
                step_id: StepId::new(row.try_get::<String, _>("step_id")?),
                sequence_no: row.try_get("sequence_no")?,
                note: row.try_get("note")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Header counts per status within one organization
pub async fn count_headers_by_status(
    conn: &mut SqliteConnection,
    org: &OrgId,
) -> Result<StatusCounts> {
    let rows = sqlx::query(
        r#"
        SELECT status, COUNT(*) AS header_count
        FROM workflow_headers
        WHERE org_id = ?1
        GROUP BY status
        "#,
    )
    .bind(org.as_str())
    .fetch_all(conn)
    .await?;

    let mut counts = StatusCounts::new();
    for row in rows {
        let status: String = row.try_get("status")?;
        let count: i64 = row.try_get("header_count")?;
        let status = HeaderStatus::parse(&status)
            .map_err(|e| ApprovalError::Validation(e.to_string()))?;
        counts.add(status, count as usize);
    }

    Ok(counts)
}
