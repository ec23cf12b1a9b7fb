//! Decision processing
//!
//! One transaction per approval call: claim the detail, recompute the
//! header, advance activation, write history. Preconditions are enforced
//! against the rows as they exist inside the transaction, not a prior
//! read, so racing duplicates fail deterministically.

use crate::error::{ApprovalError, Result};
use crate::store::workflow_store;
use crate::workflow::audit;
use approval_types::{
    derive_header_status, min_unresolved_sequence, Actor, Decision, DecisionOutcome, DetailId,
    HistoryAction,
};
use chrono::Utc;
use sqlx::SqlitePool;

pub async fn run(
    pool: &SqlitePool,
    detail_id: &DetailId,
    actor: &Actor,
    decision: Decision,
    note: Option<&str>,
) -> Result<DecisionOutcome> {
    let mut tx = pool.begin().await?;

    let detail = workflow_store::fetch_detail(&mut *tx, detail_id)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("detail {} does not exist", detail_id)))?;

    let header = workflow_store::fetch_header(&mut *tx, &detail.header_id)
        .await?
        .ok_or_else(|| {
            ApprovalError::NotFound(format!("header {} does not exist", detail.header_id))
        })?;

    if header.status.is_terminal() {
        log::warn!(
            "Rejecting decision on detail {}: header {} is already {}",
            detail_id,
            header.id,
            header.status
        );
        return Err(ApprovalError::InvalidTransition(format!(
            "workflow {} is already {}",
            header.workflow_no, header.status
        )));
    }

    // A detail is a specific (step, grant) pairing; holding some other
    // grant on the same step is not enough.
    if !detail.grant.matches(actor) {
        return Err(ApprovalError::Forbidden(format!(
            "employee {} does not hold the grant assigned to detail {}",
            actor.employee_id, detail_id
        )));
    }

    let now = Utc::now();
    let new_detail_status = decision.detail_status();

    let claimed =
        workflow_store::claim_detail(&mut *tx, detail_id, new_detail_status, note, &actor.employee_id, now)
            .await?;
    if !claimed {
        log::warn!(
            "Rejecting decision on detail {}: status is {}, not ACTION_PENDING",
            detail_id,
            detail.status
        );
        return Err(ApprovalError::InvalidTransition(format!(
            "detail {} is {}, decisions are only accepted while ACTION_PENDING",
            detail_id, detail.status
        )));
    }

    let details = workflow_store::fetch_details_for_header(&mut *tx, &header.id).await?;
    let new_header_status = derive_header_status(details.iter().map(|d| d.status));

    let header_changed = new_header_status != header.status;
    if header_changed {
        workflow_store::update_header_status(
            &mut *tx,
            &header.id,
            new_header_status,
            &actor.employee_id,
            now,
        )
        .await?;
    }

    // Advance activation only while the workflow is still live. The lowest
    // unresolved sequence either stayed (parallel approver outstanding) or
    // moved forward; activation is a no-op in the former case.
    if !new_header_status.is_terminal() {
        let pairs: Vec<_> = details.iter().map(|d| (d.sequence_no, d.status)).collect();
        if let Some(next_sequence) = min_unresolved_sequence(&pairs) {
            let activated =
                workflow_store::activate_details(&mut *tx, &header.id, next_sequence, now).await?;
            if activated > 0 {
                log::info!(
                    "Workflow {}: activated {} details at sequence {}",
                    header.workflow_no,
                    activated,
                    next_sequence
                );
            }
        }
    }

    let detail_action = match decision {
        Decision::Approved => HistoryAction::Approved,
        Decision::Rejected => HistoryAction::Rejected,
    };
    audit::record(
        &mut *tx,
        &header.id,
        Some(detail_id),
        &actor.employee_id,
        detail_action,
        note,
        now,
    )
    .await?;

    if header_changed {
        let transition = format!("{} -> {}", header.status, new_header_status);
        audit::record(
            &mut *tx,
            &header.id,
            None,
            &actor.employee_id,
            HistoryAction::StatusChanged,
            Some(transition.as_str()),
            now,
        )
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "Recorded {:?} by {} on detail {} of workflow {}, header now {}",
        decision,
        actor.employee_id,
        detail_id,
        header.workflow_no,
        new_header_status
    );

    Ok(DecisionOutcome {
        header_id: header.id,
        header_status: new_header_status,
        detail_status: new_detail_status,
    })
}
