//! Repository pattern implementations.
//! Each repository handles database operations for a specific domain.

pub mod alert_channel;
pub mod alert_history;
pub mod alert_rule;
pub mod audit_log;
pub mod dependency;
pub mod dependency_history;
pub mod service;
pub mod settings;

pub use alert_channel::AlertChannelRepository;
pub use alert_history::AlertHistoryRepository;
pub use alert_rule::AlertRuleRepository;
pub use audit_log::AuditLogRepository;
pub use dependency::DependencyRepository;
pub use dependency_history::DependencyHistoryRepository;
pub use service::ServiceRepository;
pub use settings::SettingsRepository;
