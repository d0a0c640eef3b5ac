//! Alert channel repository.

use crate::models::AlertChannel;
use crate::DbPool;
use sqlx::Error as SqlxError;
use uuid::Uuid;

#[derive(Clone)]
pub struct AlertChannelRepository {
    pool: DbPool,
}

impl AlertChannelRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_active_for_team(&self, team_id: Uuid) -> Result<Vec<AlertChannel>, SqlxError> {
        sqlx::query_as::<_, AlertChannel>(
            r#"
            SELECT id, team_id, channel_type, config, is_active, created_at, updated_at
            FROM alert_channels
            WHERE team_id = $1 AND is_active = true
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn create(
        &self,
        team_id: Uuid,
        channel_type: &str,
        config: serde_json::Value,
    ) -> Result<AlertChannel, SqlxError> {
        sqlx::query_as::<_, AlertChannel>(
            r#"
            INSERT INTO alert_channels (team_id, channel_type, config, is_active)
            VALUES ($1, $2, $3, true)
            RETURNING id, team_id, channel_type, config, is_active, created_at, updated_at
            "#,
        )
        .bind(team_id)
        .bind(channel_type)
        .bind(config)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, SqlxError> {
        let result = sqlx::query("DELETE FROM alert_channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
