//! Settings repository: persisted overrides backing the typed settings
//! provider in `depsera_core::settings`.

use crate::models::Setting;
use crate::DbPool;
use sqlx::Error as SqlxError;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: DbPool,
}

impl SettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Raw string override for a key, or `None` if unset (caller falls back
    /// to the built-in default).
    pub async fn get(&self, key: &str) -> Result<Option<String>, SqlxError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<Setting>, SqlxError> {
        sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<Setting, SqlxError> {
        sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }
}
