//! Append-only latency/error history, plus the status-change feed.

use crate::models::StatusChangeEvent;
use crate::DbPool;
use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Repository for the three append-only history tables.
#[derive(Clone)]
pub struct DependencyHistoryRepository {
    pool: DbPool,
}

impl DependencyHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append_latency(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        dependency_id: Uuid,
        latency_ms: i32,
    ) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            INSERT INTO dependency_latency_history (dependency_id, latency_ms, recorded_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(dependency_id)
        .bind(latency_ms)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// `error` and `error_message` both `None` denotes a recovery sample.
    pub async fn append_error(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        dependency_id: Uuid,
        error: Option<serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            INSERT INTO dependency_error_history (dependency_id, error, error_message, recorded_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(dependency_id)
        .bind(error)
        .bind(error_message)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn append_status_change(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        service_id: Uuid,
        service_name: &str,
        dependency_name: &str,
        previous_healthy: Option<bool>,
        current_healthy: Option<bool>,
    ) -> Result<StatusChangeEvent, SqlxError> {
        sqlx::query_as::<_, StatusChangeEvent>(
            r#"
            INSERT INTO status_change_events (
                service_id, service_name, dependency_name, previous_healthy,
                current_healthy, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, service_id, service_name, dependency_name, previous_healthy,
                      current_healthy, recorded_at
            "#,
        )
        .bind(service_id)
        .bind(service_name)
        .bind(dependency_name)
        .bind(previous_healthy)
        .bind(current_healthy)
        .fetch_one(&mut **tx)
        .await
    }

    /// Number of error samples for a dependency since `since`.
    pub async fn error_count_since(
        &self,
        dependency_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM dependency_error_history
            WHERE dependency_id = $1 AND recorded_at >= $2 AND error IS NOT NULL
            "#,
        )
        .bind(dependency_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn recent_status_changes(
        &self,
        limit: i64,
    ) -> Result<Vec<StatusChangeEvent>, SqlxError> {
        sqlx::query_as::<_, StatusChangeEvent>(
            r#"
            SELECT id, service_id, service_name, dependency_name, previous_healthy,
                   current_healthy, recorded_at
            FROM status_change_events
            ORDER BY recorded_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Retention sweeper: delete rows older than `cutoff` from each
    /// independently-trimmed history table. Idempotent; safe to re-run.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SqlxError> {
        let mut deleted = 0u64;
        deleted += sqlx::query("DELETE FROM dependency_latency_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        deleted += sqlx::query("DELETE FROM dependency_error_history WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        deleted += sqlx::query("DELETE FROM status_change_events WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted)
    }
}
