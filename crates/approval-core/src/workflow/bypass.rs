//! Bypass evaluation
//!
//! Decides whether an operation needs a workflow at all. Fail-safe: an
//! asset type that was never configured requires approval.

use crate::error::Result;
use crate::store::config_store;
use approval_types::{AssetTypeId, OrgId};
use sqlx::SqliteConnection;

/// Whether a workflow must be instantiated for this asset type.
///
/// Read-only; when this returns `false` the caller completes its operation
/// immediately and no workflow rows are ever written.
pub async fn workflow_required(
    conn: &mut SqliteConnection,
    asset_type: &AssetTypeId,
    org: &OrgId,
) -> Result<bool> {
    let required = config_store::approval_required(conn, asset_type, org).await?;

    log::debug!(
        "Workflow required for asset type {} in org {}: {}",
        asset_type,
        org,
        required
    );

    Ok(required)
}
