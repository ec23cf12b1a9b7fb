//! Domain records shared between the engine, its stores and its callers

use crate::ids::{
    AssetTypeId, DepartmentId, DetailId, EmployeeId, HeaderId, JobRoleId, OrgId, StepId,
};
use crate::status::{DetailStatus, HeaderStatus, StatusParseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The state-changing operations gated behind an approval chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Maintenance,
    Scrap,
    ScrapSale,
}

impl OperationKind {
    /// Stable code used in configuration rows and header columns
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "MAINTENANCE",
            Self::Scrap => "SCRAP",
            Self::ScrapSale => "SCRAP_SALE",
        }
    }

    pub fn parse(code: &str) -> Result<Self, StatusParseError> {
        match code {
            "MAINTENANCE" => Ok(Self::Maintenance),
            "SCRAP" => Ok(Self::Scrap),
            "SCRAP_SALE" => Ok(Self::ScrapSale),
            other => Err(StatusParseError(other.to_string())),
        }
    }

    /// Prefix for human-readable workflow references
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Maintenance => "MNT",
            Self::Scrap => "SCR",
            Self::ScrapSale => "SSL",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of entity a workflow is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectKind {
    Asset,
    AssetGroup,
    DisposalBatch,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::AssetGroup => "ASSET_GROUP",
            Self::DisposalBatch => "DISPOSAL_BATCH",
        }
    }

    pub fn parse(code: &str) -> Result<Self, StatusParseError> {
        match code {
            "ASSET" => Ok(Self::Asset),
            "ASSET_GROUP" => Ok(Self::AssetGroup),
            "DISPOSAL_BATCH" => Ok(Self::DisposalBatch),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Reference to the subject entity a workflow gates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: String,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// One step of a configured approval sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub step_id: StepId,
    pub sequence_no: i64,
}

/// Eligibility rule permitted to act on a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub job_role: JobRoleId,
    pub department: Option<DepartmentId>,
    pub employee: Option<EmployeeId>,
}

impl RoleGrant {
    pub fn for_role(job_role: JobRoleId) -> Self {
        Self {
            job_role,
            department: None,
            employee: None,
        }
    }

    /// Whether the acting user satisfies this grant. An unset department or
    /// employee on the grant acts as a wildcard; a set one must match.
    pub fn matches(&self, actor: &Actor) -> bool {
        if self.job_role != actor.job_role {
            return false;
        }
        if let Some(department) = &self.department {
            if actor.department.as_ref() != Some(department) {
                return false;
            }
        }
        if let Some(employee) = &self.employee {
            if *employee != actor.employee_id {
                return false;
            }
        }
        true
    }
}

/// The authenticated user performing an engine operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub employee_id: EmployeeId,
    pub job_role: JobRoleId,
    pub department: Option<DepartmentId>,
}

impl Actor {
    pub fn new(employee_id: EmployeeId, job_role: JobRoleId) -> Self {
        Self {
            employee_id,
            job_role,
            department: None,
        }
    }

    pub fn in_department(mut self, department: DepartmentId) -> Self {
        self.department = Some(department);
        self
    }
}

/// The approver's verdict on one detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn detail_status(&self) -> DetailStatus {
        match self {
            Self::Approved => DetailStatus::Approved,
            Self::Rejected => DetailStatus::Rejected,
        }
    }
}

/// One workflow instance bound to a subject entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowHeader {
    pub id: HeaderId,
    pub workflow_no: String,
    pub org_id: OrgId,
    pub asset_type_id: AssetTypeId,
    pub operation: OperationKind,
    pub subject: SubjectRef,
    pub status: HeaderStatus,
    pub created_by: EmployeeId,
    pub created_at: DateTime<Utc>,
    pub changed_by: EmployeeId,
    pub changed_at: DateTime<Utc>,
}

/// One (step, grant) unit of approval work within a header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDetail {
    pub id: DetailId,
    pub header_id: HeaderId,
    pub step_id: StepId,
    pub grant: RoleGrant,
    pub sequence_no: i64,
    pub status: DetailStatus,
    pub note: Option<String>,
    pub changed_by: Option<EmployeeId>,
    pub changed_at: DateTime<Utc>,
}

/// Action recorded in the audit history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    Created,
    Approved,
    Rejected,
    StatusChanged,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::StatusChanged => "STATUS_CHANGED",
        }
    }

    pub fn parse(code: &str) -> Result<Self, StatusParseError> {
        match code {
            "CREATED" => Ok(Self::Created),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "STATUS_CHANGED" => Ok(Self::StatusChanged),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// Append-only audit record. Never consulted to derive current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: i64,
    pub header_id: HeaderId,
    pub detail_id: Option<DetailId>,
    pub actor: EmployeeId,
    pub action: HistoryAction,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Result of a successful workflow instantiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStarted {
    pub header_id: HeaderId,
    pub workflow_no: String,
    pub status: HeaderStatus,
}

/// Result of a successfully recorded decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub header_id: HeaderId,
    pub header_status: HeaderStatus,
    pub detail_status: DetailStatus,
}

/// One actionable detail in an approver's work queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDetail {
    pub detail_id: DetailId,
    pub header_id: HeaderId,
    pub workflow_no: String,
    pub operation: OperationKind,
    pub subject: SubjectRef,
    pub step_id: StepId,
    pub sequence_no: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Header counts per status, for operational monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    counts: HashMap<HeaderStatus, usize>,
}

impl StatusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, status: HeaderStatus, count: usize) {
        *self.counts.entry(status).or_insert(0) += count;
    }

    pub fn get(&self, status: HeaderStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
