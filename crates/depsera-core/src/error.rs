//! Pipeline error taxonomy (spec §7).

use thiserror::Error;

/// Errors produced anywhere in the poll/alert pipeline. Every variant maps
/// to one row of the spec's error taxonomy table.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ssrf blocked: {0}")]
    SsrfBlocked(String),

    #[error("request timed out")]
    Timeout,

    #[error("dns resolution failed: {0}")]
    DnsFailed(String),

    #[error("connection refused")]
    ConnectRefused,

    #[error("tls handshake failed: {0}")]
    TlsFailed(String),

    #[error("http {0}")]
    HttpStatus(u16),

    #[error("failed to read response body: {0}")]
    BodyRead(String),

    #[error("database write failed: {0}")]
    DbWriteFailed(#[from] sqlx::Error),

    #[error("channel send failed: {0}")]
    ChannelSendFailed(String),

    #[error("poll cancelled during shutdown drain")]
    Cancelled,
}

impl PipelineError {
    /// The error-kind tag used in structured log fields and `last_poll_error`.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SsrfBlocked(_) => "ssrf_blocked",
            PipelineError::Timeout => "timeout",
            PipelineError::DnsFailed(_) => "dns_failed",
            PipelineError::ConnectRefused => "connect_refused",
            PipelineError::TlsFailed(_) => "tls_failed",
            PipelineError::HttpStatus(_) => "http_status",
            PipelineError::BodyRead(_) => "body_read",
            PipelineError::DbWriteFailed(_) => "db_write_failed",
            PipelineError::ChannelSendFailed(_) => "channel_send_failed",
            PipelineError::Cancelled => "cancelled",
        }
    }

    /// Single-line message suitable for `Service::last_poll_error`.
    pub fn as_poll_error(&self) -> String {
        self.to_string()
    }
}
