//! Read-only lookups against the approval configuration tables
//!
//! These tables are maintained by the administration surface; the engine
//! never writes them.

use crate::error::{ApprovalError, Result};
use approval_types::{
    AssetTypeId, DepartmentId, EmployeeId, JobRoleId, OperationKind, OrgId, RoleGrant,
    SequenceStep, StepId,
};
use sqlx::{Row, SqliteConnection};

/// Whether workflows are required for this asset type.
///
/// A missing row or a NULL flag means the type was never configured; the
/// engine fails safe and requires approval in that case.
pub async fn approval_required(
    conn: &mut SqliteConnection,
    asset_type: &AssetTypeId,
    org: &OrgId,
) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT approval_required
        FROM asset_types
        WHERE asset_type_id = ?1 AND org_id = ?2
        "#,
    )
    .bind(asset_type.as_str())
    .bind(org.as_str())
    .fetch_optional(conn)
    .await?;

    match row {
        None => Ok(true),
        Some(row) => {
            let flag: Option<i64> = row.try_get("approval_required")?;
            Ok(flag.map(|v| v != 0).unwrap_or(true))
        }
    }
}

/// Ordered approval steps configured for an asset type and operation
pub async fn sequence_steps(
    conn: &mut SqliteConnection,
    asset_type: &AssetTypeId,
    org: &OrgId,
    operation: OperationKind,
) -> Result<Vec<SequenceStep>> {
    let rows = sqlx::query(
        r#"
        SELECT step_id, sequence_no
        FROM approval_sequences
        WHERE asset_type_id = ?1 AND org_id = ?2 AND operation = ?3
        ORDER BY sequence_no ASC
        "#,
    )
    .bind(asset_type.as_str())
    .bind(org.as_str())
    .bind(operation.as_str())
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(SequenceStep {
                step_id: StepId::new(row.try_get::<String, _>("step_id")?),
                sequence_no: row.try_get("sequence_no")?,
            })
        })
        .collect()
}

/// Grants eligible to act on one step
pub async fn step_grants(conn: &mut SqliteConnection, step: &StepId) -> Result<Vec<RoleGrant>> {
    let rows = sqlx::query(
        r#"
        SELECT job_role, department, employee_id
        FROM approval_step_grants
        WHERE step_id = ?1
        ORDER BY grant_id ASC
        "#,
    )
    .bind(step.as_str())
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RoleGrant {
                job_role: JobRoleId::new(row.try_get::<String, _>("job_role")?),
                department: row
                    .try_get::<Option<String>, _>("department")?
                    .map(DepartmentId::new),
                employee: row
                    .try_get::<Option<String>, _>("employee_id")?
                    .map(EmployeeId::new),
            })
        })
        .collect()
}

/// Typed condition builder for optional admin filters.
///
/// Column names are code-side literals; values only ever travel as binds.
#[derive(Debug, Default)]
pub struct SqlFilter {
    clauses: Vec<String>,
    binds: Vec<String>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, column: &str, value: impl Into<String>) -> Self {
        self.clauses.push(format!("{} = ?", column));
        self.binds.push(value.into());
        self
    }

    pub fn maybe_equals(self, column: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.equals(column, value),
            None => self,
        }
    }

    /// ` WHERE a = ? AND b = ?`, or empty when no condition was added
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[String] {
        &self.binds
    }
}

/// One configured sequence row as the administration surface sees it
#[derive(Debug, Clone)]
pub struct SequenceConfigRow {
    pub asset_type_id: AssetTypeId,
    pub org_id: OrgId,
    pub operation: OperationKind,
    pub step_id: StepId,
    pub sequence_no: i64,
}

/// List configured sequences, optionally narrowed by asset type/operation
pub async fn list_sequences(
    conn: &mut SqliteConnection,
    asset_type: Option<&AssetTypeId>,
    operation: Option<OperationKind>,
) -> Result<Vec<SequenceConfigRow>> {
    let filter = SqlFilter::new()
        .maybe_equals("asset_type_id", asset_type.map(|a| a.as_str()))
        .maybe_equals("operation", operation.map(|o| o.as_str()));

    let sql = format!(
        "SELECT asset_type_id, org_id, operation, step_id, sequence_no \
         FROM approval_sequences{} \
         ORDER BY asset_type_id, operation, sequence_no",
        filter.where_sql()
    );

    let mut query = sqlx::query(&sql);
    for bind in filter.binds() {
        query = query.bind(bind.as_str());
    }

    let rows = query.fetch_all(conn).await?;

    rows.into_iter()
        .map(|row| {
            let operation: String = row.try_get("operation")?;
            Ok(SequenceConfigRow {
                asset_type_id: AssetTypeId::new(row.try_get::<String, _>("asset_type_id")?),
                org_id: OrgId::new(row.try_get::<String, _>("org_id")?),
                operation: OperationKind::parse(&operation)
                    .map_err(|e| ApprovalError::Validation(e.to_string()))?,
                step_id: StepId::new(row.try_get::<String, _>("step_id")?),
                sequence_no: row.try_get("sequence_no")?,
            })
        })
        .collect()
}

/// One configured grant row as the administration surface sees it
#[derive(Debug, Clone)]
pub struct GrantConfigRow {
    pub step_id: StepId,
    pub grant: RoleGrant,
}

/// List configured grants, optionally narrowed by step or job role
pub async fn list_grants(
    conn: &mut SqliteConnection,
    step: Option<&StepId>,
    job_role: Option<&JobRoleId>,
) -> Result<Vec<GrantConfigRow>> {
    let filter = SqlFilter::new()
        .maybe_equals("step_id", step.map(|s| s.as_str()))
        .maybe_equals("job_role", job_role.map(|r| r.as_str()));

    let sql = format!(
        "SELECT step_id, job_role, department, employee_id \
         FROM approval_step_grants{} \
         ORDER BY step_id, grant_id",
        filter.where_sql()
    );

    let mut query = sqlx::query(&sql);
    for bind in filter.binds() {
        query = query.bind(bind.as_str());
    }

    let rows = query.fetch_all(conn).await?;

    rows.into_iter()
        .map(|row| {
            Ok(GrantConfigRow {
                step_id: StepId::new(row.try_get::<String, _>("step_id")?),
                grant: RoleGrant {
                    job_role: JobRoleId::new(row.try_get::<String, _>("job_role")?),
                    department: row
                        .try_get::<Option<String>, _>("department")?
                        .map(DepartmentId::new),
                    employee: row
                        .try_get::<Option<String>, _>("employee_id")?
                        .map(EmployeeId::new),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let filter = SqlFilter::new();
        assert_eq!(filter.where_sql(), "");
        assert!(filter.binds().is_empty());
    }

    #[test]
    fn test_filter_joins_clauses_with_and() {
        let filter = SqlFilter::new()
            .equals("asset_type_id", "AT1")
            .equals("operation", "SCRAP");

        assert_eq!(
            filter.where_sql(),
            " WHERE asset_type_id = ? AND operation = ?"
        );
        assert_eq!(filter.binds(), &["AT1".to_string(), "SCRAP".to_string()]);
    }

    #[test]
    fn test_maybe_equals_skips_none() {
        let filter = SqlFilter::new()
            .maybe_equals("asset_type_id", None::<String>)
            .maybe_equals("operation", Some("SCRAP"));

        assert_eq!(filter.where_sql(), " WHERE operation = ?");
        assert_eq!(filter.binds(), &["SCRAP".to_string()]);
    }
}
