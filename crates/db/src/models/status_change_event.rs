//! Denormalized, append-only feed of dependency health transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A snapshot of one health transition, independent of later renames or
/// deletions of the service/dependency it describes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusChangeEvent {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub dependency_name: String,
    pub previous_healthy: Option<bool>,
    pub current_healthy: Option<bool>,
    pub recorded_at: DateTime<Utc>,
}
