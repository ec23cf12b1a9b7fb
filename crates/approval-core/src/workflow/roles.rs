//! Role grant resolution
//!
//! Every step of a resolved sequence must carry at least one grant; a step
//! nobody can act on is a configuration error, not an empty-but-valid step.

use crate::error::{ApprovalError, Result};
use crate::store::config_store;
use approval_types::{RoleGrant, StepId};
use sqlx::SqliteConnection;

/// Resolve the grants eligible to act on one step.
///
/// Fails with `ConfigurationMissing` when the step has none, which aborts
/// instantiation entirely; no partial workflow is ever persisted.
pub async fn resolve(conn: &mut SqliteConnection, step: &StepId) -> Result<Vec<RoleGrant>> {
    let grants = config_store::step_grants(conn, step).await?;

    if grants.is_empty() {
        return Err(ApprovalError::ConfigurationMissing(format!(
            "no role grants configured for approval step {}",
            step
        )));
    }

    log::debug!("Resolved {} grants for step {}", grants.len(), step);

    Ok(grants)
}
