//! Workflow instantiation
//!
//! Creates one header and one detail per (step, grant) pair in a single
//! transaction. Any failure rolls the whole attempt back; an orphaned
//! header or a detail without a header is never observable.

use crate::error::Result;
use crate::store::{numbering::ReferenceGenerator, workflow_store};
use crate::workflow::{audit, roles, sequence};
use approval_types::{
    derive_header_status, Actor, AssetTypeId, DetailId, DetailStatus, HeaderId, HeaderStatus,
    HistoryAction, OperationKind, OrgId, SubjectRef, WorkflowDetail, WorkflowHeader,
    WorkflowStarted,
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Everything the instantiator needs from the calling operation
#[derive(Debug, Clone)]
pub struct InstantiateRequest<'a> {
    pub subject: SubjectRef,
    pub asset_type: &'a AssetTypeId,
    pub org: &'a OrgId,
    pub operation: OperationKind,
    pub actor: &'a Actor,
    pub note: Option<&'a str>,
}

pub async fn run(
    pool: &SqlitePool,
    numbering: &dyn ReferenceGenerator,
    request: InstantiateRequest<'_>,
) -> Result<WorkflowStarted> {
    // The reference is issued outside the transaction so a rollback cannot
    // leave the counter behind a committed workflow_no.
    let workflow_no = numbering.next_reference(pool, request.operation).await?;

    let mut tx = pool.begin().await?;

    let steps = sequence::resolve(&mut *tx, request.asset_type, request.org, request.operation)
        .await?;

    // Resolve every grant before the first write: a step without grants
    // aborts the attempt with nothing persisted.
    let mut resolved = Vec::with_capacity(steps.len());
    for step in steps {
        let grants = roles::resolve(&mut *tx, &step.step_id).await?;
        resolved.push((step, grants));
    }

    let now = Utc::now();
    let header = WorkflowHeader {
        id: HeaderId::new(),
        workflow_no: workflow_no.clone(),
        org_id: request.org.clone(),
        asset_type_id: request.asset_type.clone(),
        operation: request.operation,
        subject: request.subject.clone(),
        status: HeaderStatus::Initiated,
        created_by: request.actor.employee_id.clone(),
        created_at: now,
        changed_by: request.actor.employee_id.clone(),
        changed_at: now,
    };
    workflow_store::insert_header(&mut *tx, &header).await?;

    let min_sequence = resolved[0].0.sequence_no;
    let mut detail_statuses = Vec::new();

    for (step, grants) in &resolved {
        for grant in grants {
            let active = step.sequence_no == min_sequence;
            let status = if active {
                DetailStatus::ActionPending
            } else {
                DetailStatus::Inactive
            };

            let detail = WorkflowDetail {
                id: DetailId::new(),
                header_id: header.id.clone(),
                step_id: step.step_id.clone(),
                grant: grant.clone(),
                sequence_no: step.sequence_no,
                // The initiating note travels on the details awaiting action
                note: active.then(|| request.note.map(str::to_string)).flatten(),
                status,
                changed_by: None,
                changed_at: now,
            };
            workflow_store::insert_detail(&mut *tx, &detail).await?;
            detail_statuses.push(status);
        }
    }

    let status = derive_header_status(detail_statuses.iter().copied());
    if status != header.status {
        workflow_store::update_header_status(&mut *tx, &header.id, status, &header.created_by, now)
            .await?;
    }

    audit::record(
        &mut *tx,
        &header.id,
        None,
        &request.actor.employee_id,
        HistoryAction::Created,
        request.note,
        now,
    )
    .await?;

    tx.commit().await?;

    log::info!(
        "Created workflow {} ({}) for {} with {} details, status {}",
        workflow_no,
        header.id,
        header.subject,
        detail_statuses.len(),
        status
    );

    Ok(WorkflowStarted {
        header_id: header.id,
        workflow_no,
        status,
    })
}
