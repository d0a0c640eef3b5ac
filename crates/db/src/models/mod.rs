//! Database models.

pub mod alert_channel;
pub mod alert_history;
pub mod alert_rule;
pub mod audit_log;
pub mod dependency;
pub mod dependency_history;
pub mod service;
pub mod settings;
pub mod status_change_event;

pub use audit_log::AuditLog;
pub use alert_channel::{
    channel_type, AlertChannel, CreateAlertChannel, SlackChannelConfig, WebhookChannelConfig,
};
pub use alert_history::{event_type, severity, AlertHistory, RecordAlertDelivery};
pub use alert_rule::{severity_filter, AlertRule, UpsertAlertRule};
pub use dependency::{dependency_type, impact, CanonicalDependency, Dependency};
pub use dependency_history::{DependencyErrorHistory, DependencyLatencyHistory, ErrorCount};
pub use service::{CreateService, PollOutcome, Service, UpdateService, MAX_POLL_WARNINGS};
pub use settings::{keys as setting_keys, Setting};
pub use status_change_event::StatusChangeEvent;
