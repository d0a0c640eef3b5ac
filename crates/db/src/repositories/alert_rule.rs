//! Alert rule repository.

use crate::models::AlertRule;
use crate::DbPool;
use sqlx::Error as SqlxError;
use uuid::Uuid;

#[derive(Clone)]
pub struct AlertRuleRepository {
    pool: DbPool,
}

impl AlertRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// A team with no row is treated as `severity_filter=all, is_active=false`.
    pub async fn get_for_team(&self, team_id: Uuid) -> Result<AlertRule, SqlxError> {
        let rule = sqlx::query_as::<_, AlertRule>(
            r#"
            SELECT id, team_id, severity_filter, is_active, created_at, updated_at
            FROM alert_rules
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rule.unwrap_or_else(|| AlertRule::silent_default(team_id)))
    }

    pub async fn upsert(
        &self,
        team_id: Uuid,
        severity_filter: &str,
        is_active: bool,
    ) -> Result<AlertRule, SqlxError> {
        sqlx::query_as::<_, AlertRule>(
            r#"
            INSERT INTO alert_rules (team_id, severity_filter, is_active)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id)
            DO UPDATE SET severity_filter = $2, is_active = $3, updated_at = NOW()
            RETURNING id, team_id, severity_filter, is_active, created_at, updated_at
            "#,
        )
        .bind(team_id)
        .bind(severity_filter)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
    }
}
