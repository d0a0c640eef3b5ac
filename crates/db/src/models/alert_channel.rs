//! Per-team alert delivery destinations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Channel type enum, stored as text.
#[allow(missing_docs)]
pub mod channel_type {
    pub const SLACK: &str = "slack";
    pub const WEBHOOK: &str = "webhook";
}

/// A configured alert destination for a team.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertChannel {
    pub id: Uuid,
    pub team_id: Uuid,
    pub channel_type: String,
    #[sqlx(json)]
    pub config: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `{ webhook_url: string }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackChannelConfig {
    pub webhook_url: String,
}

/// `{ url: string, method?: "POST"|"PUT"|"PATCH", headers?: {string: string} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<std::collections::HashMap<String, String>>,
}

/// Request payload for creating an alert channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlertChannel {
    pub team_id: Uuid,
    pub channel_type: String,
    pub config: serde_json::Value,
}
