//! Alert dispatcher (spec §4.I).
//!
//! Loaded once per pipeline and invoked after each poll's transaction
//! commits. Grounded on `servers/api-server/src/services/notification.rs`'s
//! dedup-window concept, generalized here to a persisted cooldown plus a
//! sliding-window team rate limit backed by `AlertHistory` instead of an
//! in-memory cache (the cooldown must survive a process restart).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use db::models::{alert_rule::severity_filter, alert_history::event_type, AlertChannel, RecordAlertDelivery};
use db::repositories::{AlertChannelRepository, AlertHistoryRepository, AlertRuleRepository};
use tracing::warn;
use uuid::Uuid;

use crate::alerts::channels::{self, AlertContext};
use crate::settings::SettingsProvider;
use crate::transitions::Transition;

/// A transition event enriched with the service/team identity it needs to
/// be filtered and delivered (spec §4.I input).
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub team_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub dependency_id: Option<Uuid>,
    pub dependency_name: String,
    pub transition: Transition,
    pub impact: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Filters and fans a transition event out to every active channel of its
/// team, honouring severity filter, cooldown, and rate limit.
#[derive(Clone)]
pub struct AlertDispatcher {
    rules: AlertRuleRepository,
    channels: AlertChannelRepository,
    history: AlertHistoryRepository,
    settings: SettingsProvider,
    client: reqwest::Client,
    app_base_url: Option<String>,
}

impl AlertDispatcher {
    pub fn new(
        rules: AlertRuleRepository,
        channels: AlertChannelRepository,
        history: AlertHistoryRepository,
        settings: SettingsProvider,
    ) -> Self {
        Self {
            rules,
            channels,
            history,
            settings,
            client: reqwest::Client::new(),
            app_base_url: std::env::var("APP_BASE_URL").ok(),
        }
    }

    pub async fn dispatch(&self, event: TransitionEvent) {
        if let Err(e) = self.try_dispatch(&event).await {
            warn!(service_id = %event.service_id, error = %e, "alert dispatch failed");
        }
    }

    async fn try_dispatch(&self, event: &TransitionEvent) -> Result<(), sqlx::Error> {
        let rule = self.rules.get_for_team(event.team_id).await?;
        if !rule.is_active {
            return Ok(());
        }

        let severity = severity_of(event.impact.as_deref());
        if !severity_passes_filter(&rule.severity_filter, severity) {
            return Ok(());
        }

        let event_type = match event.transition {
            Transition::BecameUnhealthy => event_type::BECAME_UNHEALTHY,
            Transition::Recovered => event_type::RECOVERED,
            _ => return Ok(()),
        };

        let cooldown_minutes = self.settings.alert_cooldown_minutes().await?;
        if cooldown_minutes > 0 {
            let last = self
                .history
                .last_successful_delivery(
                    event.team_id,
                    event.service_id,
                    Some(&event.dependency_name),
                    event_type,
                )
                .await?;
            if let Some(last) = last {
                if Utc::now() - last < ChronoDuration::minutes(cooldown_minutes as i64) {
                    return Ok(());
                }
            }
        }

        let rate_limit = self.settings.alert_rate_limit_per_hour().await?;
        let window_start = Utc::now() - ChronoDuration::hours(1);
        let recent = self.history.delivery_count_since(event.team_id, window_start).await?;
        if recent as u32 >= rate_limit {
            if !self.history.has_recent_rate_limit_marker(event.team_id, window_start).await? {
                self.history
                    .record(&RecordAlertDelivery {
                        team_id: event.team_id,
                        service_id: event.service_id,
                        dependency_id: event.dependency_id,
                        channel_id: None,
                        event_type: db::models::alert_history::event_type::RATE_LIMITED.to_string(),
                        severity: severity.to_string(),
                        success: true,
                        error: None,
                    })
                    .await?;
            }
            return Ok(());
        }

        let active_channels = self.channels.list_active_for_team(event.team_id).await?;
        for channel in &active_channels {
            let outcome = self.send_to_channel(channel, event, event_type, severity).await;
            metrics::counter!("alerts_dispatched_total").increment(1);
            self.history
                .record(&RecordAlertDelivery {
                    team_id: event.team_id,
                    service_id: event.service_id,
                    dependency_id: event.dependency_id,
                    channel_id: Some(channel.id),
                    event_type: event_type.to_string(),
                    severity: severity.to_string(),
                    success: outcome.success,
                    error: outcome.error,
                })
                .await?;
        }

        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel: &AlertChannel,
        event: &TransitionEvent,
        event_type: &str,
        severity: &'static str,
    ) -> channels::SendOutcome {
        let (old_status, new_status) = match event_type {
            t if t == db::models::alert_history::event_type::RECOVERED => ("unhealthy", "healthy"),
            _ => ("healthy", "unhealthy"),
        };

        let ctx = AlertContext {
            service_id: event.service_id,
            service_name: &event.service_name,
            dependency_id: event.dependency_id,
            dependency_name: &event.dependency_name,
            old_status,
            new_status,
            severity,
            recorded_at: event.recorded_at,
            app_base_url: self.app_base_url.as_deref(),
        };

        match channel.channel_type.as_str() {
            db::models::alert_channel::channel_type::SLACK => {
                match serde_json::from_value::<db::models::SlackChannelConfig>(channel.config.clone()) {
                    Ok(config) => channels::slack::send(&self.client, &config.webhook_url, &ctx).await,
                    Err(e) => channels::SendOutcome::failed(format!("invalid slack config: {e}")),
                }
            }
            db::models::alert_channel::channel_type::WEBHOOK => {
                match serde_json::from_value::<db::models::WebhookChannelConfig>(channel.config.clone()) {
                    Ok(config) => {
                        channels::webhook::send(
                            &self.client,
                            &config.url,
                            config.method.as_deref(),
                            config.headers.as_ref(),
                            channels::webhook::WebhookEvent::DependencyStatusChange,
                            &ctx,
                        )
                        .await
                    }
                    Err(e) => channels::SendOutcome::failed(format!("invalid webhook config: {e}")),
                }
            }
            other => channels::SendOutcome::failed(format!("unknown channel type: {other}")),
        }
    }
}

/// Severity of a transition, per spec §4.I step 2: unhealthy with impact in
/// `{critical,high}` is critical, else warning. A recovery inherits the
/// severity of the state it recovers from, which for a stable `impact`
/// field reduces to the same rule.
fn severity_of(impact: Option<&str>) -> &'static str {
    use db::models::dependency::impact as impact_level;
    match impact {
        Some(i) if i == impact_level::CRITICAL || i == impact_level::HIGH => "critical",
        _ => "warning",
    }
}

fn severity_passes_filter(filter: &str, severity: &'static str) -> bool {
    match filter {
        f if f == severity_filter::CRITICAL => severity == "critical",
        f if f == severity_filter::WARNING => true,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_impact_is_critical_severity() {
        assert_eq!(severity_of(Some("critical")), "critical");
        assert_eq!(severity_of(Some("high")), "critical");
    }

    #[test]
    fn other_impact_is_warning_severity() {
        assert_eq!(severity_of(Some("medium")), "warning");
        assert_eq!(severity_of(None), "warning");
    }

    #[test]
    fn critical_filter_blocks_warning_severity() {
        assert!(!severity_passes_filter(severity_filter::CRITICAL, "warning"));
        assert!(severity_passes_filter(severity_filter::CRITICAL, "critical"));
    }

    #[test]
    fn warning_filter_allows_both() {
        assert!(severity_passes_filter(severity_filter::WARNING, "warning"));
        assert!(severity_passes_filter(severity_filter::WARNING, "critical"));
    }
}
