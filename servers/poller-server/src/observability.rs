//! Observability: tracing, optional OpenTelemetry export, optional Sentry
//! error tracking, optional Prometheus metrics. Grounded on
//! `servers/api-server/src/observability.rs`'s `init_observability` shape,
//! trimmed to what a daemon with no per-request HTTP surface needs —
//! `ErrorContext`/`RequestMetrics` were about per-route instrumentation,
//! which this process doesn't have; `tracing::warn!` calls already reach
//! Sentry through the tracing layer below.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Tracer;
use sentry::ClientInitGuard;
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct OtelConfig {
    pub service_name: String,
    pub otlp_endpoint: Option<String>,
    pub enabled: bool,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            service_name: "poller-server".to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            enabled: std::env::var("OTEL_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: String,
    pub release: Option<String>,
    pub sample_rate: f32,
    pub enabled: bool,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: std::env::var("SENTRY_DSN").ok(),
            environment: std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
            release: Some(env!("CARGO_PKG_VERSION").to_string()),
            sample_rate: std::env::var("SENTRY_SAMPLE_RATE").ok().and_then(|v| v.parse().ok()).unwrap_or(1.0),
            enabled: std::env::var("SENTRY_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("METRICS_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(true),
        }
    }
}

fn init_otel_tracer(config: &OtelConfig) -> Option<Tracer> {
    if !config.enabled {
        tracing::info!("OpenTelemetry tracing disabled");
        return None;
    }
    let endpoint = config.otlp_endpoint.as_deref()?;

    let exporter = match opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint).build_span_exporter() {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("failed to create OTLP exporter: {e}");
            return None;
        }
    };

    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(opentelemetry_sdk::Resource::new(vec![
            opentelemetry::KeyValue::new("service.name", config.service_name.clone()),
            opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])))
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    opentelemetry::global::set_tracer_provider(provider);
    Some(tracer)
}

fn init_sentry(config: &SentryConfig) -> Option<ClientInitGuard> {
    if !config.enabled {
        return None;
    }
    let dsn = config.dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: config.release.clone().map(|v| v.into()),
            environment: Some(config.environment.clone().into()),
            sample_rate: config.sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    )))
}

fn init_metrics(config: &MetricsConfig) -> Option<PrometheusHandle> {
    if !config.enabled {
        return None;
    }
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("failed to install Prometheus recorder: {e}");
            return None;
        }
    };
    PROMETHEUS_HANDLE.set(handle.clone()).ok();

    metrics::describe_histogram!("poll_duration_seconds", "Poll duration in seconds");
    metrics::describe_counter!("polls_total", "Total number of polls run");
    metrics::describe_counter!("polls_failed_total", "Total number of failed polls");
    metrics::describe_counter!("alerts_dispatched_total", "Total number of alert deliveries attempted");

    Some(handle)
}

pub fn get_metrics_text() -> String {
    PROMETHEUS_HANDLE.get().map(|h| h.render()).unwrap_or_else(|| "# metrics not initialized\n".to_string())
}

pub struct ObservabilityGuard {
    _sentry_guard: Option<ClientInitGuard>,
    _prometheus_handle: Option<PrometheusHandle>,
}

pub fn init_observability(otel_config: OtelConfig, sentry_config: SentryConfig, metrics_config: MetricsConfig) -> ObservabilityGuard {
    let prometheus_handle = init_metrics(&metrics_config);
    let sentry_guard = init_sentry(&sentry_config);

    let registry = tracing_subscriber::registry();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "poller_server=debug,depsera_core=debug".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(env_filter);

    if let Some(tracer) = init_otel_tracer(&otel_config) {
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        if sentry_guard.is_some() {
            registry.with(fmt_layer).with(otel_layer).with(sentry::integrations::tracing::layer()).init();
        } else {
            registry.with(fmt_layer).with(otel_layer).init();
        }
    } else if sentry_guard.is_some() {
        registry.with(fmt_layer).with(sentry::integrations::tracing::layer()).init();
    } else {
        registry.with(fmt_layer).init();
    }

    ObservabilityGuard { _sentry_guard: sentry_guard, _prometheus_handle: prometheus_handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_opt_in() {
        let otel = OtelConfig::default();
        assert_eq!(otel.service_name, "poller-server");
        assert!(!otel.enabled);

        let sentry_config = SentryConfig::default();
        assert!(!sentry_config.enabled);
    }
}
