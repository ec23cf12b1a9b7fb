//! Sequence resolution
//!
//! Returns the ordered approval steps configured for an asset type and
//! operation, and validates the ordering invariants before anyone builds
//! on them.

use crate::error::{ApprovalError, Result};
use crate::store::config_store;
use approval_types::{AssetTypeId, OperationKind, OrgId, SequenceStep};
use sqlx::SqliteConnection;
use std::collections::HashSet;

/// Resolve the configured approval sequence.
///
/// Fails with `ConfigurationMissing` when no steps exist; a required
/// workflow can never be created with zero steps.
pub async fn resolve(
    conn: &mut SqliteConnection,
    asset_type: &AssetTypeId,
    org: &OrgId,
    operation: OperationKind,
) -> Result<Vec<SequenceStep>> {
    let steps = config_store::sequence_steps(conn, asset_type, org, operation).await?;

    if steps.is_empty() {
        return Err(ApprovalError::ConfigurationMissing(format!(
            "no approval sequence configured for asset type {} operation {} in org {}",
            asset_type, operation, org
        )));
    }

    validate_ordering(&steps)?;

    log::debug!(
        "Resolved {} approval steps for asset type {} operation {}",
        steps.len(),
        asset_type,
        operation
    );

    Ok(steps)
}

/// Sequence numbers must be strictly increasing and step ids unique.
/// The schema enforces this for rows as stored; re-checking here keeps the
/// invariant independent of how the configuration was written.
fn validate_ordering(steps: &[SequenceStep]) -> Result<()> {
    let mut seen_steps = HashSet::new();
    let mut previous: Option<i64> = None;

    for step in steps {
        if !seen_steps.insert(step.step_id.as_str()) {
            return Err(ApprovalError::Validation(format!(
                "step {} appears more than once in the sequence",
                step.step_id
            )));
        }

        if let Some(previous) = previous {
            if step.sequence_no <= previous {
                return Err(ApprovalError::Validation(format!(
                    "sequence numbers must be strictly increasing, got {} after {}",
                    step.sequence_no, previous
                )));
            }
        }

        previous = Some(step.sequence_no);
    }

    Ok(())
}
