//! Retention sweeper (spec §4.K).
//!
//! Grounded on the teacher's `servers/api-server/src/services/scheduler.rs`
//! background-loop shape (`tokio::spawn` + `interval` ticker, per-task
//! error-log-and-continue) and its `cleanup_sessions` idiom of deleting
//! from several tables and logging a combined count.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use db::repositories::{AlertHistoryRepository, AuditLogRepository, DependencyHistoryRepository};
use tracing::{error, info};

use crate::settings::SettingsProvider;

/// How often the sweeper wakes up to check whether today's run is due.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Daily sweep of history tables older than `data_retention_days`.
pub struct RetentionSweeper {
    dependency_history: DependencyHistoryRepository,
    alert_history: AlertHistoryRepository,
    audit_log: AuditLogRepository,
    settings: SettingsProvider,
    last_run_date: Mutex<Option<NaiveDate>>,
}

impl RetentionSweeper {
    pub fn new(
        dependency_history: DependencyHistoryRepository,
        alert_history: AlertHistoryRepository,
        audit_log: AuditLogRepository,
        settings: SettingsProvider,
    ) -> Self {
        Self {
            dependency_history,
            alert_history,
            audit_log,
            settings,
            last_run_date: Mutex::new(None),
        }
    }

    /// Spawns the sweeper's background loop. Overlapping runs within the
    /// same day are prevented by `last_run_date`; a restart loses that
    /// in-memory stamp, and an extra run the same day is harmless since
    /// deletion is idempotent.
    pub fn start(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_if_due().await {
                    error!(error = %e, "retention sweep failed");
                }
            }
        })
    }

    async fn run_if_due(&self) -> Result<(), sqlx::Error> {
        let cleanup_time = self.settings.retention_cleanup_time().await?;
        let Some(cleanup_at) = parse_cleanup_time(&cleanup_time) else {
            error!(value = %cleanup_time, "invalid retention_cleanup_time setting, skipping run");
            return Ok(());
        };

        let now = Utc::now();
        if now.time() < cleanup_at {
            return Ok(());
        }

        {
            let mut last_run = self.last_run_date.lock().unwrap();
            if *last_run == Some(now.date_naive()) {
                return Ok(());
            }
            *last_run = Some(now.date_naive());
        }

        self.run_once().await
    }

    /// Runs one sweep unconditionally; exposed for callers that want to
    /// trigger an off-cycle run (e.g. an admin endpoint).
    pub async fn run_once(&self) -> Result<(), sqlx::Error> {
        let retention_days = self.settings.data_retention_days().await?;
        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);

        let dependency_rows = self.dependency_history.prune_before(cutoff).await?;
        let alert_rows = self.alert_history.prune_before(cutoff).await?;
        let audit_rows = self.audit_log.prune_before(cutoff).await?;

        info!(
            dependency_rows,
            alert_rows, audit_rows, cutoff = %cutoff, "retention sweep completed"
        );

        Ok(())
    }
}

fn parse_cleanup_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm_cleanup_time() {
        assert_eq!(parse_cleanup_time("03:30"), NaiveTime::from_hms_opt(3, 30, 0));
    }

    #[test]
    fn rejects_malformed_cleanup_time() {
        assert_eq!(parse_cleanup_time("not-a-time"), None);
    }
}
