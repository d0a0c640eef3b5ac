//! Dependency repository: the per-service diff target for poll results.

use crate::models::Dependency;
use crate::DbPool;
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Repository for dependency rows. Write methods take a live transaction
/// since every mutation happens inside the poll executor's single commit.
#[derive(Clone)]
pub struct DependencyRepository {
    pool: DbPool,
}

impl DependencyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All dependency rows for a service, keyed by name for diffing.
    pub async fn list_for_service(&self, service_id: Uuid) -> Result<Vec<Dependency>, SqlxError> {
        sqlx::query_as::<_, Dependency>(
            r#"
            SELECT id, service_id, name, canonical_name, description, impact,
                   dependency_type, healthy, health_state, health_code, latency_ms,
                   last_checked, last_status_change, error, error_message, skipped,
                   created_at, updated_at
            FROM dependencies
            WHERE service_id = $1
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        service_id: Uuid,
        name: &str,
        canonical_name: &str,
        description: Option<&str>,
        impact: Option<&str>,
        dependency_type: &str,
        healthy: Option<bool>,
        health_state: Option<i32>,
        health_code: Option<i32>,
        latency_ms: Option<i32>,
        error: Option<serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<Dependency, SqlxError> {
        sqlx::query_as::<_, Dependency>(
            r#"
            INSERT INTO dependencies (
                service_id, name, canonical_name, description, impact, dependency_type,
                healthy, health_state, health_code, latency_ms, last_checked,
                last_status_change, error, error_message, skipped
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW(), $11, $12, false)
            RETURNING id, service_id, name, canonical_name, description, impact,
                      dependency_type, healthy, health_state, health_code, latency_ms,
                      last_checked, last_status_change, error, error_message, skipped,
                      created_at, updated_at
            "#,
        )
        .bind(service_id)
        .bind(name)
        .bind(canonical_name)
        .bind(description)
        .bind(impact)
        .bind(dependency_type)
        .bind(healthy)
        .bind(health_state)
        .bind(health_code)
        .bind(latency_ms)
        .bind(error)
        .bind(error_message)
        .fetch_one(&mut **tx)
        .await
    }

    /// Update an existing row. `bump_status_change` is true only when
    /// `healthy` changed from the previous value.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        description: Option<&str>,
        impact: Option<&str>,
        dependency_type: &str,
        healthy: Option<bool>,
        health_state: Option<i32>,
        health_code: Option<i32>,
        latency_ms: Option<i32>,
        error: Option<serde_json::Value>,
        error_message: Option<&str>,
        bump_status_change: bool,
    ) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            UPDATE dependencies
            SET description = $2, impact = $3, dependency_type = $4, healthy = $5,
                health_state = $6, health_code = $7, latency_ms = $8, error = $9,
                error_message = $10, skipped = false, last_checked = NOW(),
                last_status_change = CASE WHEN $11 THEN NOW() ELSE last_status_change END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(description)
        .bind(impact)
        .bind(dependency_type)
        .bind(healthy)
        .bind(health_state)
        .bind(health_code)
        .bind(latency_ms)
        .bind(error)
        .bind(error_message)
        .bind(bump_status_change)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_skipped(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<(), SqlxError> {
        sqlx::query("UPDATE dependencies SET skipped = true, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Deletes a row and its history, called when a dependency has been
    /// missing from two consecutive successful polls.
    pub async fn delete_with_history(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<(), SqlxError> {
        sqlx::query("DELETE FROM dependency_latency_history WHERE dependency_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM dependency_error_history WHERE dependency_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM dependencies WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
