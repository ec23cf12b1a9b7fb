//! Workflow status enums and the header status derivation
//!
//! Statuses are stored as stable text codes. The derivation function here
//! is the only writer of header status anywhere in the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when a stored status code does not map to a known status
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown status code: {0}")]
pub struct StatusParseError(pub String);

/// Aggregate status of a workflow header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderStatus {
    Initiated,
    InProgress,
    Completed,
    Cancelled,
}

impl HeaderStatus {
    /// Stable code used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(code: &str) -> Result<Self, StatusParseError> {
        match code {
            "INITIATED" => Ok(Self::Initiated),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(StatusParseError(other.to_string())),
        }
    }

    /// Terminal headers accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for HeaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one approval detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailStatus {
    Inactive,
    ActionPending,
    Approved,
    Rejected,
}

impl DetailStatus {
    /// Stable code used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::ActionPending => "ACTION_PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(code: &str) -> Result<Self, StatusParseError> {
        match code {
            "INACTIVE" => Ok(Self::Inactive),
            "ACTION_PENDING" => Ok(Self::ActionPending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for DetailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the header status from the full set of its detail statuses.
///
/// Rules, in priority order:
/// - any detail `Rejected` -> `Cancelled`
/// - every detail `Approved` -> `Completed`
/// - no details yet (header inserted, fan-out pending) -> `Initiated`
/// - otherwise -> `InProgress`
///
/// A populated detail set always derives at least `InProgress`, which is
/// why a freshly instantiated workflow reads `InProgress` from the outside.
pub fn derive_header_status<I>(details: I) -> HeaderStatus
where
    I: IntoIterator<Item = DetailStatus>,
{
    let mut seen_any = false;
    let mut all_approved = true;

    for status in details {
        seen_any = true;
        match status {
            DetailStatus::Rejected => return HeaderStatus::Cancelled,
            DetailStatus::Approved => {}
            DetailStatus::Inactive | DetailStatus::ActionPending => all_approved = false,
        }
    }

    if !seen_any {
        HeaderStatus::Initiated
    } else if all_approved {
        HeaderStatus::Completed
    } else {
        HeaderStatus::InProgress
    }
}

/// Lowest sequence number that is not yet fully resolved.
///
/// A sequence is resolved when every detail under it is `Approved`. Returns
/// `None` when all sequences are resolved.
pub fn min_unresolved_sequence(details: &[(i64, DetailStatus)]) -> Option<i64> {
    details
        .iter()
        .filter(|(_, status)| *status != DetailStatus::Approved)
        .map(|(seq, _)| *seq)
        .min()
}
