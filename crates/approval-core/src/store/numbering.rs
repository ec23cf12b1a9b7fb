//! Human-readable workflow reference generation
//!
//! References come from a counter table incremented atomically in its own
//! statement, outside the instantiation transaction. A rolled-back
//! instantiation may burn a number; uniqueness is the contract, density is
//! not.

use crate::config::NumberingConfig;
use crate::error::Result;
use approval_types::OperationKind;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Issues unique human-readable workflow references
#[async_trait]
pub trait ReferenceGenerator: Send + Sync {
    async fn next_reference(&self, pool: &SqlitePool, operation: OperationKind) -> Result<String>;
}

/// Counter-table backed generator producing references like `MNT-000042`
pub struct CounterReferenceGenerator {
    pad_width: usize,
}

impl CounterReferenceGenerator {
    pub fn new(pad_width: usize) -> Self {
        Self { pad_width }
    }

    pub fn from_config(config: &NumberingConfig) -> Self {
        Self::new(config.pad_width)
    }
}

#[async_trait]
impl ReferenceGenerator for CounterReferenceGenerator {
    async fn next_reference(&self, pool: &SqlitePool, operation: OperationKind) -> Result<String> {
        // Upsert-and-return is a single atomic statement; concurrent
        // instantiations cannot observe the same value.
        let row = sqlx::query(
            r#"
            INSERT INTO workflow_counters (scope, next_value)
            VALUES (?1, 1)
            ON CONFLICT (scope) DO UPDATE SET next_value = next_value + 1
            RETURNING next_value
            "#,
        )
        .bind(operation.as_str())
        .fetch_one(pool)
        .await?;

        let value: i64 = row.try_get("next_value")?;

        Ok(format!(
            "{}-{:0width$}",
            operation.reference_prefix(),
            value,
            width = self.pad_width
        ))
    }
}
