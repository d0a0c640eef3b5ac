//! Dependency entity: a single item parsed out of a service's health response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Dependency type enum, stored as text.
#[allow(missing_docs)]
pub mod dependency_type {
    pub const DATABASE: &str = "database";
    pub const REST: &str = "rest";
    pub const SOAP: &str = "soap";
    pub const GRPC: &str = "grpc";
    pub const GRAPHQL: &str = "graphql";
    pub const MESSAGE_QUEUE: &str = "message_queue";
    pub const CACHE: &str = "cache";
    pub const FILE_SYSTEM: &str = "file_system";
    pub const SMTP: &str = "smtp";
    pub const OTHER: &str = "other";
}

/// Dependency impact enum, stored as text.
#[allow(missing_docs)]
pub mod impact {
    pub const CRITICAL: &str = "critical";
    pub const HIGH: &str = "high";
    pub const MEDIUM: &str = "medium";
    pub const LOW: &str = "low";
    pub const NONE: &str = "none";
}

/// A dependency row: the last-known state of one item reported by a service's
/// health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dependency {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub canonical_name: String,
    pub description: Option<String>,
    pub impact: Option<String>,
    pub dependency_type: String,
    pub healthy: Option<bool>,
    pub health_state: Option<i32>,
    pub health_code: Option<i32>,
    pub latency_ms: Option<i32>,
    pub last_checked: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
    #[sqlx(json)]
    pub error: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub skipped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A canonical dependency record as produced by the schema mapper / health
/// parser, before it has been diffed against the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalDependency {
    pub name: String,
    pub description: Option<String>,
    pub impact: Option<String>,
    pub dependency_type: Option<String>,
    pub healthy: Option<bool>,
    pub health_state: Option<i32>,
    pub health_code: Option<i32>,
    pub latency_ms: Option<i32>,
    pub error: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl CanonicalDependency {
    /// Trim, lowercase, and collapse internal whitespace to single spaces.
    pub fn canonical_name(&self) -> String {
        self.name
            .trim()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
