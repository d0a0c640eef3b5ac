//! Service repository.

use crate::models::Service;
use crate::DbPool;
use sqlx::Error as SqlxError;
use uuid::Uuid;

/// Repository for service CRUD and the poll-result writeback.
#[derive(Clone)]
pub struct ServiceRepository {
    pool: DbPool,
}

impl ServiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All active services, used to seed the scheduler on startup.
    pub async fn list_active(&self) -> Result<Vec<Service>, SqlxError> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT id, team_id, name, health_endpoint, metrics_endpoint, schema_config,
                   poll_interval_ms, poll_timeout_ms, is_active, last_poll_success,
                   last_poll_error, poll_warnings, created_at, updated_at
            FROM services
            WHERE is_active = true
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Service>, SqlxError> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT id, team_id, name, health_endpoint, metrics_endpoint, schema_config,
                   poll_interval_ms, poll_timeout_ms, is_active, last_poll_success,
                   last_poll_error, poll_warnings, created_at, updated_at
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        team_id: Uuid,
        name: &str,
        health_endpoint: &str,
        metrics_endpoint: Option<&str>,
        schema_config: Option<serde_json::Value>,
        poll_interval_ms: Option<i32>,
        poll_timeout_ms: Option<i32>,
    ) -> Result<Service, SqlxError> {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (team_id, name, health_endpoint, metrics_endpoint,
                                   schema_config, poll_interval_ms, poll_timeout_ms,
                                   is_active, last_poll_success, poll_warnings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true, NULL, '[]'::jsonb)
            RETURNING id, team_id, name, health_endpoint, metrics_endpoint, schema_config,
                      poll_interval_ms, poll_timeout_ms, is_active, last_poll_success,
                      last_poll_error, poll_warnings, created_at, updated_at
            "#,
        )
        .bind(team_id)
        .bind(name)
        .bind(health_endpoint)
        .bind(metrics_endpoint)
        .bind(schema_config)
        .bind(poll_interval_ms)
        .bind(poll_timeout_ms)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<Service>, SqlxError> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, team_id, name, health_endpoint, metrics_endpoint, schema_config,
                      poll_interval_ms, poll_timeout_ms, is_active, last_poll_success,
                      last_poll_error, poll_warnings, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, SqlxError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist the outcome of one poll. Called within the poll executor's
    /// transaction, never against the bare pool.
    pub async fn record_poll_outcome(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        success: bool,
        error: Option<&str>,
        warnings: serde_json::Value,
    ) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            UPDATE services
            SET last_poll_success = $2, last_poll_error = $3, poll_warnings = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(success)
        .bind(error)
        .bind(warnings)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
