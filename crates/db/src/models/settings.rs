//! Typed key/value settings store read on every poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single persisted setting override. Absence means "use the built-in
/// default" — see `depsera_core::settings` for the defaults table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Well-known setting keys read by the pipeline (spec §6).
#[allow(missing_docs)]
pub mod keys {
    pub const DATA_RETENTION_DAYS: &str = "data_retention_days";
    pub const RETENTION_CLEANUP_TIME: &str = "retention_cleanup_time";
    pub const DEFAULT_POLL_INTERVAL_MS: &str = "default_poll_interval_ms";
    pub const SSRF_ALLOWLIST: &str = "ssrf_allowlist";
    pub const GLOBAL_RATE_LIMIT: &str = "global_rate_limit";
    pub const GLOBAL_RATE_LIMIT_WINDOW_MINUTES: &str = "global_rate_limit_window_minutes";
    pub const ALERT_COOLDOWN_MINUTES: &str = "alert_cooldown_minutes";
    pub const ALERT_RATE_LIMIT_PER_HOUR: &str = "alert_rate_limit_per_hour";
}
