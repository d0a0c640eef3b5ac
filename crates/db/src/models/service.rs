//! Polled service entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A service under health-polling supervision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub health_endpoint: String,
    pub metrics_endpoint: Option<String>,
    #[sqlx(json)]
    pub schema_config: Option<serde_json::Value>,
    pub poll_interval_ms: Option<i32>,
    pub poll_timeout_ms: Option<i32>,
    pub is_active: bool,
    pub last_poll_success: Option<bool>,
    pub last_poll_error: Option<String>,
    #[sqlx(json)]
    pub poll_warnings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub team_id: Uuid,
    pub name: String,
    pub health_endpoint: String,
    pub metrics_endpoint: Option<String>,
    pub schema_config: Option<serde_json::Value>,
    pub poll_interval_ms: Option<i32>,
    pub poll_timeout_ms: Option<i32>,
}

/// Request payload for updating a service's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateService {
    pub name: Option<String>,
    pub health_endpoint: Option<String>,
    pub metrics_endpoint: Option<String>,
    pub schema_config: Option<serde_json::Value>,
    pub poll_interval_ms: Option<i32>,
    pub poll_timeout_ms: Option<i32>,
    pub is_active: Option<bool>,
}

/// Outcome of a single poll, as persisted back onto the Service row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOutcome {
    pub last_poll_success: bool,
    pub last_poll_error: Option<String>,
    pub poll_warnings: Vec<String>,
}

/// Caps the number of retained poll warnings per service (spec: "most recent N").
pub const MAX_POLL_WARNINGS: usize = 10;
