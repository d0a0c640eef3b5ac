//! Audit log repository. Reads/writes belong to the REST layer; the core
//! only prunes it as part of the retention sweeper.

use crate::DbPool;
use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;

#[derive(Clone)]
pub struct AuditLogRepository {
    pool: DbPool,
}

impl AuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM audit_log WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
