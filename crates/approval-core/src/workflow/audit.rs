//! Append-only audit history
//!
//! History rows are inserted inside the same transaction as the state
//! change they record, so they can never drift from the header and detail
//! tables. No update or delete operation exists here.

use crate::error::{ApprovalError, Result};
use approval_types::{DetailId, EmployeeId, HeaderId, HistoryAction, HistoryEntry};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

/// Append one history entry
pub async fn record(
    conn: &mut SqliteConnection,
    header_id: &HeaderId,
    detail_id: Option<&DetailId>,
    actor: &EmployeeId,
    action: HistoryAction,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workflow_history (header_id, detail_id, actor, action, note, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(header_id.as_str())
    .bind(detail_id.map(|d| d.as_str()))
    .bind(actor.as_str())
    .bind(action.as_str())
    .bind(note)
    .bind(at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Full history of a header in insertion order
pub async fn list(conn: &mut SqliteConnection, header_id: &HeaderId) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT entry_id, header_id, detail_id, actor, action, note, recorded_at
        FROM workflow_history
        WHERE header_id = ?1
        ORDER BY entry_id ASC
        "#,
    )
    .bind(header_id.as_str())
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let action: String = row.try_get("action")?;

            Ok(HistoryEntry {
                entry_id: row.try_get("entry_id")?,
                header_id: HeaderId::from_string(&row.try_get::<String, _>("header_id")?)
                    .map_err(ApprovalError::Validation)?,
                detail_id: row
                    .try_get::<Option<String>, _>("detail_id")?
                    .map(|id| DetailId::from_string(&id).map_err(ApprovalError::Validation))
                    .transpose()?,
                actor: EmployeeId::new(row.try_get::<String, _>("actor")?),
                action: HistoryAction::parse(&action)
                    .map_err(|e| ApprovalError::Validation(e.to_string()))?,
                note: row.try_get("note")?,
                recorded_at: row.try_get("recorded_at")?,
            })
        })
        .collect()
}
