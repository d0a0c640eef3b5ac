//! Append-only audit trail of alert deliveries, doubling as the rate-limit
//! and cooldown source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Event type enum, stored as text.
#[allow(missing_docs)]
pub mod event_type {
    pub const BECAME_UNHEALTHY: &str = "became_unhealthy";
    pub const RECOVERED: &str = "recovered";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Severity enum, stored as text.
#[allow(missing_docs)]
pub mod severity {
    pub const WARNING: &str = "warning";
    pub const CRITICAL: &str = "critical";
}

/// One attempted (or suppressed) alert delivery.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertHistory {
    pub id: Uuid,
    pub team_id: Uuid,
    pub service_id: Uuid,
    pub dependency_id: Option<Uuid>,
    pub channel_id: Option<Uuid>,
    pub event_type: String,
    pub severity: String,
    pub sent_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

/// Row to insert for a delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAlertDelivery {
    pub team_id: Uuid,
    pub service_id: Uuid,
    pub dependency_id: Option<Uuid>,
    pub channel_id: Option<Uuid>,
    pub event_type: String,
    pub severity: String,
    pub success: bool,
    pub error: Option<String>,
}
