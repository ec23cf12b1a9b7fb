//! Shared types for the asset approval workflow engine
//!
//! Everything here is strongly typed - no string-based state management.
//! The status derivation in [`status`] is the single source of truth for
//! header status; no other code path assigns it by hand.

pub mod ids;
pub mod records;
pub mod status;

pub use ids::{
    AssetTypeId, DepartmentId, DetailId, EmployeeId, HeaderId, JobRoleId, OrgId, StepId,
};
pub use records::{
    Actor, Decision, DecisionOutcome, HistoryAction, HistoryEntry, OperationKind, PendingDetail,
    RoleGrant, SequenceStep, StatusCounts, SubjectKind, SubjectRef, WorkflowDetail,
    WorkflowHeader, WorkflowStarted,
};
pub use status::{
    derive_header_status, min_unresolved_sequence, DetailStatus, HeaderStatus, StatusParseError,
};
