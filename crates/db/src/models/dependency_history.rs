//! Append-only history tables sampled off successful and failed polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One latency sample for a dependency, recorded on every poll that reports one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DependencyLatencyHistory {
    pub id: Uuid,
    pub dependency_id: Uuid,
    pub latency_ms: i32,
    pub recorded_at: DateTime<Utc>,
}

/// One error sample for a dependency. A row with both `error` and
/// `error_message` null denotes a recovery event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DependencyErrorHistory {
    pub id: Uuid,
    pub dependency_id: Uuid,
    #[sqlx(json)]
    pub error: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Rolled-up error count, used for "errors in the last 24h" summaries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ErrorCount {
    pub dependency_id: Uuid,
    pub count: i64,
}
