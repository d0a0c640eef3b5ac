//! Alert history repository: delivery audit trail plus the cooldown and
//! rate-limit source of truth (spec invariants 4 and 5).

use crate::models::{AlertHistory, RecordAlertDelivery};
use crate::DbPool;
use chrono::{DateTime, Utc};
use sqlx::Error as SqlxError;
use uuid::Uuid;

#[derive(Clone)]
pub struct AlertHistoryRepository {
    pool: DbPool,
}

impl AlertHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, delivery: &RecordAlertDelivery) -> Result<AlertHistory, SqlxError> {
        sqlx::query_as::<_, AlertHistory>(
            r#"
            INSERT INTO alert_history (
                team_id, service_id, dependency_id, channel_id, event_type,
                severity, sent_at, success, error
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7, $8)
            RETURNING id, team_id, service_id, dependency_id, channel_id, event_type,
                      severity, sent_at, success, error
            "#,
        )
        .bind(delivery.team_id)
        .bind(delivery.service_id)
        .bind(delivery.dependency_id)
        .bind(delivery.channel_id)
        .bind(&delivery.event_type)
        .bind(&delivery.severity)
        .bind(delivery.success)
        .bind(&delivery.error)
        .fetch_one(&self.pool)
        .await
    }

    /// Most recent successful delivery for `(team, service, dependency, kind)`,
    /// used to enforce `alert_cooldown_minutes`.
    pub async fn last_successful_delivery(
        &self,
        team_id: Uuid,
        service_id: Uuid,
        dependency_name: Option<&str>,
        event_type: &str,
    ) -> Result<Option<DateTime<Utc>>, SqlxError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT ah.sent_at
            FROM alert_history ah
            LEFT JOIN dependencies d ON d.id = ah.dependency_id
            WHERE ah.team_id = $1 AND ah.service_id = $2 AND ah.event_type = $3
              AND ah.success = true
              AND ($4::text IS NULL OR d.name = $4)
            ORDER BY ah.sent_at DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(service_id)
        .bind(event_type)
        .bind(dependency_name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delivery attempts (any outcome, excluding `rate_limited` markers) for
    /// a team since `since`, used against `alert_rate_limit_per_hour`.
    pub async fn delivery_count_since(
        &self,
        team_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, SqlxError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM alert_history
            WHERE team_id = $1 AND sent_at >= $2 AND event_type != 'rate_limited'
            "#,
        )
        .bind(team_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    /// Whether a `rate_limited` marker has already been recorded for this
    /// team within the last hour (at most one per hour).
    pub async fn has_recent_rate_limit_marker(
        &self,
        team_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, SqlxError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM alert_history
            WHERE team_id = $1 AND sent_at >= $2 AND event_type = 'rate_limited'
            "#,
        )
        .bind(team_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM alert_history WHERE sent_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
