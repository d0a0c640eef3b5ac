//! Poll executor (spec §4.F).
//!
//! Runs the full poll sequence for one service and commits every resulting
//! write in a single transaction. Grounded on
//! `crates/db/src/repositories/oauth.rs`'s `pool.begin()` / `fetch_optional`
//! / `tx.commit()` idiom, and `crates/db/src/repositories/
//! health_monitoring.rs`'s history-row insert shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use db::models::{Service, MAX_POLL_WARNINGS};
use db::repositories::{DependencyHistoryRepository, DependencyRepository, ServiceRepository};
use db::DbPool;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alerts::dispatcher::AlertDispatcher;
use crate::alerts::TransitionEvent;
use crate::error::PipelineError;
use crate::fetcher::{HttpFetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};
use crate::health_parser;
use crate::settings::SettingsProvider;
use crate::ssrf::{self, HostResolver, SsrfDecision};
use crate::transitions::{self, Transition};

/// Outcome of running one poll to completion.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub service_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

/// Executes the poll sequence for one service and owns the single
/// transaction its writes occur in.
pub struct PollExecutor {
    pool: DbPool,
    services: ServiceRepository,
    dependencies: DependencyRepository,
    history: DependencyHistoryRepository,
    fetcher: HttpFetcher,
    resolver: std::sync::Arc<dyn HostResolver>,
    settings: SettingsProvider,
    dispatcher: AlertDispatcher,
    /// Per-service locks so a manual "poll now" and the scheduler never run
    /// the same service concurrently (spec §6).
    service_locks: AsyncMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl PollExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        services: ServiceRepository,
        dependencies: DependencyRepository,
        history: DependencyHistoryRepository,
        fetcher: HttpFetcher,
        resolver: std::sync::Arc<dyn HostResolver>,
        settings: SettingsProvider,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            pool,
            services,
            dependencies,
            history,
            fetcher,
            resolver,
            settings,
            dispatcher,
            service_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, service_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.service_locks.lock().await;
        Arc::clone(locks.entry(service_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }

    /// Runs one poll for `service` to completion, used by the manual "poll
    /// now" entry point. Never cancelled.
    pub async fn run_once(&self, service: &Service) -> PollResult {
        self.run_once_cancellable(service, &tokio_util::sync::CancellationToken::new()).await
    }

    /// As [`run_once`](Self::run_once), but races every suspension point
    /// against `cancellation` so the scheduler can abort an in-flight poll
    /// once its drain deadline elapses (spec §5).
    pub async fn run_once_cancellable(
        &self,
        service: &Service,
        cancellation: &tokio_util::sync::CancellationToken,
    ) -> PollResult {
        let lock = self.lock_for(service.id).await;
        let _guard = lock.lock().await;

        let started_at = std::time::Instant::now();
        let result = match self.run_once_inner(service, cancellation).await {
            Ok(result) => result,
            Err(e) => {
                warn!(service_id = %service.id, error = %e, "poll failed before commit");
                PollResult {
                    service_id: service.id,
                    success: false,
                    error: Some(e.as_poll_error()),
                    warnings: Vec::new(),
                }
            }
        };

        metrics::histogram!("poll_duration_seconds").record(started_at.elapsed().as_secs_f64());
        metrics::counter!("polls_total").increment(1);
        if !result.success {
            metrics::counter!("polls_failed_total").increment(1);
        }

        result
    }

    async fn run_once_inner(
        &self,
        service: &Service,
        cancellation: &tokio_util::sync::CancellationToken,
    ) -> Result<PollResult, PipelineError> {
        let _span = tracing::info_span!("poll", service_id = %service.id, service_name = %service.name).entered();

        let allowlist = self.settings.ssrf_allowlist().await?;

        // 1. SSRF check.
        let decision = ssrf::validate_url(&service.health_endpoint, self.resolver.as_ref(), &allowlist).await;
        if let SsrfDecision::Rejected(reason) = decision {
            let err = PipelineError::SsrfBlocked(reason);
            self.record_failure(service.id, &err).await?;
            return Ok(PollResult {
                service_id: service.id,
                success: false,
                error: Some(err.as_poll_error()),
                warnings: Vec::new(),
            });
        }

        // 2. Fetch.
        let timeout = effective_timeout(service);
        let fetch = match self
            .fetcher
            .fetch_cancellable(&service.health_endpoint, timeout, DEFAULT_MAX_BYTES, cancellation)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                self.record_failure(service.id, &e).await?;
                return Ok(PollResult {
                    service_id: service.id,
                    success: false,
                    error: Some(e.as_poll_error()),
                    warnings: Vec::new(),
                });
            }
        };

        // 3. Non-2xx status.
        if !(200..300).contains(&fetch.status) {
            let err = PipelineError::HttpStatus(fetch.status);
            self.record_failure(service.id, &err).await?;
            return Ok(PollResult {
                service_id: service.id,
                success: false,
                error: Some(err.as_poll_error()),
                warnings: Vec::new(),
            });
        }

        // 4. Parse.
        let mut warnings = Vec::new();
        if fetch.truncated {
            warnings.push("response body truncated at max_bytes".to_string());
        }
        let parsed = health_parser::parse(&fetch.body, service.schema_config.as_ref());
        warnings.extend(parsed.warnings);

        // 5-8. Diff, persist, one transaction.
        let existing = self.dependencies.list_for_service(service.id).await?;
        let mut tx = self.pool.begin().await?;

        let mut events = Vec::new();
        let mut seen_names = std::collections::HashSet::new();

        for record in &parsed.records {
            let canonical_name = record.canonical_name();
            seen_names.insert(record.name.clone());

            let previous = existing.iter().find(|d| d.name == record.name);

            let transition = transitions::classify(previous, record);

            let dependency_id = match previous {
                None => {
                    let inserted = self
                        .dependencies
                        .insert(
                            &mut tx,
                            service.id,
                            &record.name,
                            &canonical_name,
                            record.description.as_deref(),
                            record.impact.as_deref(),
                            record
                                .dependency_type
                                .as_deref()
                                .unwrap_or(db::models::dependency_type::OTHER),
                            record.healthy,
                            record.health_state,
                            record.health_code,
                            record.latency_ms,
                            record.error.clone(),
                            record.error_message.as_deref(),
                        )
                        .await?;
                    inserted.id
                }
                Some(prev) => {
                    self.dependencies
                        .update(
                            &mut tx,
                            prev.id,
                            record.description.as_deref(),
                            record.impact.as_deref(),
                            record
                                .dependency_type
                                .as_deref()
                                .unwrap_or(&prev.dependency_type),
                            record.healthy,
                            record.health_state,
                            record.health_code,
                            record.latency_ms,
                            record.error.clone(),
                            record.error_message.as_deref(),
                            matches!(
                                transition,
                                Transition::BecameUnhealthy | Transition::Recovered
                            ),
                        )
                        .await?;
                    prev.id
                }
            };

            if let Some(latency_ms) = record.latency_ms {
                self.history.append_latency(&mut tx, dependency_id, latency_ms).await?;
            }

            if transition.is_alertable() {
                self.history
                    .append_error(&mut tx, dependency_id, record.error.clone(), record.error_message.as_deref())
                    .await?;

                let change = self
                    .history
                    .append_status_change(
                        &mut tx,
                        service.id,
                        &service.name,
                        &record.name,
                        previous.and_then(|p| p.healthy),
                        record.healthy,
                    )
                    .await?;

                events.push(TransitionEvent {
                    team_id: service.team_id,
                    service_id: service.id,
                    service_name: service.name.clone(),
                    dependency_id: Some(dependency_id),
                    dependency_name: record.name.clone(),
                    transition,
                    impact: record.impact.clone(),
                    recorded_at: change.recorded_at,
                });
            }
        }

        // Missing-row bookkeeping: mark skipped, or delete if skipped twice.
        for row in existing.iter().filter(|d| !seen_names.contains(&d.name)) {
            if row.skipped {
                self.dependencies.delete_with_history(&mut tx, row.id).await?;
            } else {
                self.dependencies.mark_skipped(&mut tx, row.id).await?;
            }
        }

        if warnings.len() > MAX_POLL_WARNINGS {
            warnings.drain(0..warnings.len() - MAX_POLL_WARNINGS);
        }
        let warnings_json = serde_json::to_value(&warnings).unwrap_or(serde_json::json!([]));
        self.services
            .record_poll_outcome(&mut tx, service.id, true, None, warnings_json)
            .await?;

        tx.commit().await?;

        // Dispatch only after commit succeeds (spec §4.F).
        for event in events {
            self.dispatcher.dispatch(event).await;
        }

        info!(service_id = %service.id, dependency_count = parsed.records.len(), "poll succeeded");

        Ok(PollResult {
            service_id: service.id,
            success: true,
            error: None,
            warnings,
        })
    }

    async fn record_failure(&self, service_id: Uuid, err: &PipelineError) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        self.services
            .record_poll_outcome(&mut tx, service_id, false, Some(&err.as_poll_error()), serde_json::json!([]))
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Computes the effective per-service timeout: service override, else the
/// 10s default (spec §4.F step 2).
pub fn effective_timeout(service: &Service) -> Duration {
    service
        .poll_timeout_ms
        .filter(|&ms| ms > 0)
        .map(|ms| Duration::from_millis(ms as u64))
        .unwrap_or(DEFAULT_TIMEOUT)
}
