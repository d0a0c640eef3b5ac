//! Per-team severity filter governing which transitions get dispatched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Severity filter enum, stored as text.
#[allow(missing_docs)]
pub mod severity_filter {
    pub const ALL: &str = "all";
    pub const WARNING: &str = "warning";
    pub const CRITICAL: &str = "critical";
}

/// A team's alert rule. A team with no row is treated as
/// `severity_filter=all, is_active=false`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertRule {
    pub id: Uuid,
    pub team_id: Uuid,
    pub severity_filter: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    /// The implicit rule used when a team has configured none.
    pub fn silent_default(team_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            team_id,
            severity_filter: severity_filter::ALL.to_string(),
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request payload for upserting a team's alert rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAlertRule {
    pub team_id: Uuid,
    pub severity_filter: String,
    pub is_active: bool,
}
