//! Channel senders (spec §4.J).
//!
//! Both senders share the same outcome shape and a 10s wall-clock timeout;
//! grounded on `crates/integrations/src/airbnb.rs`'s `AirbnbClient` (a held
//! `reqwest::Client`, one `Result`-returning call per operation, explicit
//! status-code handling).

pub mod slack;
pub mod webhook;

use std::time::Duration;

/// Timeout applied to every channel send (spec §4.J).
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one channel delivery attempt.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { success: false, error: Some(reason.into()) }
    }
}

/// The fields common to both channel payloads, built once per dispatched
/// event and shared by the Slack and webhook senders.
#[derive(Debug, Clone)]
pub struct AlertContext<'a> {
    pub service_id: uuid::Uuid,
    pub service_name: &'a str,
    pub dependency_id: Option<uuid::Uuid>,
    pub dependency_name: &'a str,
    pub old_status: &'static str,
    pub new_status: &'static str,
    pub severity: &'static str,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    pub app_base_url: Option<&'a str>,
}
