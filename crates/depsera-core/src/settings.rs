//! Typed settings provider (spec §4.A).
//!
//! Every read returns the persisted override when present, else the
//! built-in default. An in-process cache sits in front of the repository so
//! a read hot off a poll loop doesn't round-trip the database every time;
//! `set` invalidates the cached entry before writing through, so the next
//! read anywhere sees the new value.

use std::collections::HashMap;
use std::sync::Arc;

use db::models::Setting;
use db::repositories::SettingsRepository;
use tokio::sync::RwLock;

/// Read-through typed settings provider, cached in process.
#[derive(Clone)]
pub struct SettingsProvider {
    repo: SettingsRepository,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl SettingsProvider {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn data_retention_days(&self) -> Result<u32, sqlx::Error> {
        Ok(self.read_int(setting_key::DATA_RETENTION_DAYS, 365).await?.clamp(1, 3650))
    }

    pub async fn retention_cleanup_time(&self) -> Result<String, sqlx::Error> {
        Ok(self
            .get_cached(setting_key::RETENTION_CLEANUP_TIME)
            .await?
            .unwrap_or_else(|| "02:00".to_string()))
    }

    pub async fn default_poll_interval_ms(&self) -> Result<u32, sqlx::Error> {
        Ok(self
            .read_int(setting_key::DEFAULT_POLL_INTERVAL_MS, 30_000)
            .await?
            .clamp(5_000, 3_600_000))
    }

    /// Comma-separated host/CIDR allowlist patterns, split and trimmed.
    pub async fn ssrf_allowlist(&self) -> Result<Vec<String>, sqlx::Error> {
        let raw = self.get_cached(setting_key::SSRF_ALLOWLIST).await?.unwrap_or_default();
        Ok(raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub async fn alert_cooldown_minutes(&self) -> Result<u32, sqlx::Error> {
        Ok(self.read_int(setting_key::ALERT_COOLDOWN_MINUTES, 5).await?.clamp(0, 1440))
    }

    pub async fn alert_rate_limit_per_hour(&self) -> Result<u32, sqlx::Error> {
        Ok(self
            .read_int(setting_key::ALERT_RATE_LIMIT_PER_HOUR, 30)
            .await?
            .clamp(1, 1000))
    }

    pub async fn global_rate_limit(&self) -> Result<Option<u32>, sqlx::Error> {
        match self.get_cached(setting_key::GLOBAL_RATE_LIMIT).await? {
            Some(v) => Ok(v.parse().ok()),
            None => Ok(None),
        }
    }

    pub async fn global_rate_limit_window_minutes(&self) -> Result<Option<u32>, sqlx::Error> {
        match self.get_cached(setting_key::GLOBAL_RATE_LIMIT_WINDOW_MINUTES).await? {
            Some(v) => Ok(v.parse().ok()),
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<Setting>, sqlx::Error> {
        self.repo.get_all().await
    }

    /// Writes an override through to the repository and refreshes the
    /// cached entry so the next read anywhere sees the new value.
    pub async fn set(&self, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        self.cache.write().await.remove(key);
        let setting = self.repo.set(key, value).await?;
        self.cache.write().await.insert(key.to_string(), value.to_string());
        Ok(setting)
    }

    async fn read_int(&self, key: &str, default: u32) -> Result<u32, sqlx::Error> {
        Ok(self
            .get_cached(key)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(default))
    }

    async fn get_cached(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        if let Some(v) = self.cache.read().await.get(key) {
            return Ok(Some(v.clone()));
        }
        let value = self.repo.get(key).await?;
        if let Some(v) = &value {
            self.cache.write().await.insert(key.to_string(), v.clone());
        }
        Ok(value)
    }
}

mod setting_key {
    pub use db::models::setting_keys::*;
}
