//! Engine facade
//!
//! `ApprovalEngine` is the surface the calling operations (maintenance
//! scheduling, scrapping, scrap-sale disposal) talk to. It owns no
//! database; every call asks the context provider for the current pool.

use crate::error::{ApprovalError, Result};
use crate::store::{workflow_store, ContextProvider, ReferenceGenerator};
use crate::workflow::{audit, bypass, instantiate, process, InstantiateRequest};
use approval_types::{
    Actor, AssetTypeId, Decision, DecisionOutcome, DetailId, HeaderId, HeaderStatus, HistoryEntry,
    OperationKind, OrgId, PendingDetail, StatusCounts, SubjectRef, WorkflowStarted,
};
use std::sync::Arc;

pub struct ApprovalEngine {
    context: Arc<dyn ContextProvider>,
    numbering: Arc<dyn ReferenceGenerator>,
}

impl ApprovalEngine {
    pub fn new(context: Arc<dyn ContextProvider>, numbering: Arc<dyn ReferenceGenerator>) -> Self {
        Self { context, numbering }
    }

    /// Whether the calling operation must instantiate a workflow at all.
    ///
    /// When this returns `false` the caller completes immediately; no
    /// workflow rows are written for the operation.
    pub async fn is_workflow_required(
        &self,
        asset_type: &AssetTypeId,
        org: &OrgId,
    ) -> Result<bool> {
        let pool = self.context.pool().await?;
        let mut conn = pool.acquire().await?;
        bypass::workflow_required(&mut *conn, asset_type, org).await
    }

    /// Create a workflow for a subject entity.
    ///
    /// Fails with `ConfigurationMissing` when the asset type has no
    /// sequence or a step has no grants; nothing is persisted in that
    /// case.
    pub async fn instantiate_workflow(
        &self,
        subject: SubjectRef,
        asset_type: &AssetTypeId,
        org: &OrgId,
        operation: OperationKind,
        actor: &Actor,
        note: Option<&str>,
    ) -> Result<WorkflowStarted> {
        let pool = self.context.pool().await?;
        instantiate::run(
            &pool,
            self.numbering.as_ref(),
            InstantiateRequest {
                subject,
                asset_type,
                org,
                operation,
                actor,
                note,
            },
        )
        .await
    }

    /// Record an approver's decision on one detail
    pub async fn record_decision(
        &self,
        detail_id: &DetailId,
        actor: &Actor,
        decision: Decision,
        note: Option<&str>,
    ) -> Result<DecisionOutcome> {
        let pool = self.context.pool().await?;
        process::run(&pool, detail_id, actor, decision, note).await
    }

    /// Current aggregate status of a workflow.
    ///
    /// Callers poll this and apply their own subject side effect (asset
    /// status update and the like) once a terminal status comes back; the
    /// engine never reaches into subject tables.
    pub async fn header_status(&self, header_id: &HeaderId) -> Result<HeaderStatus> {
        let pool = self.context.pool().await?;
        let mut conn = pool.acquire().await?;

        let header = workflow_store::fetch_header(&mut *conn, header_id)
            .await?
            .ok_or_else(|| {
                ApprovalError::NotFound(format!("header {} does not exist", header_id))
            })?;

        Ok(header.status)
    }

    /// Full audit history of a workflow in insertion order
    pub async fn history(&self, header_id: &HeaderId) -> Result<Vec<HistoryEntry>> {
        let pool = self.context.pool().await?;
        let mut conn = pool.acquire().await?;

        if workflow_store::fetch_header(&mut *conn, header_id).await?.is_none() {
            return Err(ApprovalError::NotFound(format!(
                "header {} does not exist",
                header_id
            )));
        }

        audit::list(&mut *conn, header_id).await
    }

    /// Work queue: every detail currently awaiting this actor
    pub async fn pending_for_actor(
        &self,
        org: &OrgId,
        actor: &Actor,
    ) -> Result<Vec<PendingDetail>> {
        let pool = self.context.pool().await?;
        let mut conn = pool.acquire().await?;
        workflow_store::pending_for_actor(&mut *conn, org, actor).await
    }

    /// Header counts per status for operational monitoring
    pub async fn status_counts(&self, org: &OrgId) -> Result<StatusCounts> {
        let pool = self.context.pool().await?;
        let mut conn = pool.acquire().await?;
        workflow_store::count_headers_by_status(&mut *conn, org).await
    }
}
