//! Audit log entity. Written by the (out-of-scope) REST layer; the core
//! only needs to know its retention column to honor the sweeper's cutoff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub team_id: Option<Uuid>,
    pub action: String,
    #[sqlx(json)]
    pub details: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}
