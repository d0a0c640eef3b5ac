//! Poller server: loads configuration, builds the DB pool, wires the
//! scheduler and retention sweeper, and exposes a liveness endpoint plus a
//! Prometheus scrape target. Grounded on `servers/api-server/src/main.rs`'s
//! startup sequence (dotenvy, observability guard, pool construction,
//! `tokio::net::TcpListener` + `axum::serve`), trimmed to this process's
//! much smaller route surface.

mod config;
mod observability;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use config::AppConfig;
use db::repositories::{
    AlertChannelRepository, AlertHistoryRepository, AlertRuleRepository, DependencyHistoryRepository,
    DependencyRepository, ServiceRepository, SettingsRepository,
};
use depsera_core::alerts::AlertDispatcher;
use depsera_core::fetcher::{HttpFetcher, SystemResolver};
use depsera_core::retention::RetentionSweeper;
use depsera_core::scheduler::{Scheduler, DEFAULT_DRAIN_DEADLINE, DEFAULT_WORKERS};
use depsera_core::settings::SettingsProvider;
use depsera_core::PollExecutor;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    #[allow(unused_variables)]
    let observability_guard = observability::init_observability(
        observability::OtelConfig::default(),
        observability::SentryConfig::default(),
        observability::MetricsConfig::default(),
    );

    tracing::info!("poller-server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("connected to database");

    let services = ServiceRepository::new(pool.clone());
    let dependencies = DependencyRepository::new(pool.clone());
    let dependency_history = DependencyHistoryRepository::new(pool.clone());
    let alert_rules = AlertRuleRepository::new(pool.clone());
    let alert_channels = AlertChannelRepository::new(pool.clone());
    let alert_history = AlertHistoryRepository::new(pool.clone());
    let settings = SettingsProvider::new(SettingsRepository::new(pool.clone()));

    let resolver = Arc::new(SystemResolver::from_system_conf()?);
    let fetcher = HttpFetcher::new();
    let dispatcher = AlertDispatcher::new(alert_rules, alert_channels, alert_history.clone(), settings.clone());

    let executor = PollExecutor::new(
        pool.clone(),
        services.clone(),
        dependencies,
        dependency_history.clone(),
        fetcher,
        resolver,
        settings.clone(),
        dispatcher,
    );

    let cpu_scaled = std::thread::available_parallelism().map(|n| n.get() * 4).unwrap_or(DEFAULT_WORKERS);
    let worker_count = cpu_scaled.min(config.workers).min(DEFAULT_WORKERS);
    let default_interval_ms = settings.default_poll_interval_ms().await?;
    let drain_deadline = if config.drain_deadline_secs > 0 {
        Duration::from_secs(config.drain_deadline_secs)
    } else {
        DEFAULT_DRAIN_DEADLINE
    };

    let scheduler = Arc::new(Scheduler::new(executor, worker_count, default_interval_ms, drain_deadline));
    scheduler.seed(services.list_active().await?).await;
    let scheduler_handle = Arc::clone(&scheduler).run();

    let retention = Arc::new(RetentionSweeper::new(dependency_history, alert_history, db::repositories::AuditLogRepository::new(pool.clone()), settings));
    let retention_handle = retention.start();

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "poller-server listening");

    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => { result?; }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining scheduler");
            scheduler.shutdown().await;
        }
    }

    scheduler_handle.abort();
    retention_handle.abort();
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint() -> impl axum::response::IntoResponse {
    let body = observability::get_metrics_text();
    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], body)
}
