//! Generic webhook sender (spec §4.J).

use std::collections::HashMap;

use reqwest::Method;
use serde_json::json;

use super::{AlertContext, SendOutcome, SEND_TIMEOUT};

/// Event kind carried in the fixed webhook payload.
#[derive(Debug, Clone, Copy)]
pub enum WebhookEvent {
    DependencyStatusChange,
    PollError,
}

impl WebhookEvent {
    fn as_str(self) -> &'static str {
        match self {
            WebhookEvent::DependencyStatusChange => "dependency_status_change",
            WebhookEvent::PollError => "poll_error",
        }
    }
}

/// POSTs/PUTs/PATCHes the fixed `dependency_status_change` payload. `method`
/// defaults to `POST` when absent; anything other than POST/PUT/PATCH fails
/// without attempting a request.
pub async fn send(
    client: &reqwest::Client,
    url: &str,
    method: Option<&str>,
    headers: Option<&HashMap<String, String>>,
    event: WebhookEvent,
    ctx: &AlertContext<'_>,
) -> SendOutcome {
    let method = match method.unwrap_or("POST").to_uppercase().as_str() {
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "PATCH" => Method::PATCH,
        other => return SendOutcome::failed(format!("unsupported method: {other}")),
    };

    let mut payload = json!({
        "event": event.as_str(),
        "service": { "id": ctx.service_id, "name": ctx.service_name },
        "oldStatus": ctx.old_status,
        "newStatus": ctx.new_status,
        "severity": ctx.severity,
        "timestamp": ctx.recorded_at.to_rfc3339(),
    });

    if let Some(dependency_id) = ctx.dependency_id {
        payload["dependency"] = json!({ "id": dependency_id, "name": ctx.dependency_name });
    }
    if let Some(base) = ctx.app_base_url {
        payload["url"] = json!(format!("{}/services/{}", base.trim_end_matches('/'), ctx.service_id));
    }

    let mut request = client.request(method, url).timeout(SEND_TIMEOUT).json(&payload);
    if let Some(headers) = headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }

    match request.send().await {
        Ok(resp) if resp.status().is_success() => SendOutcome::ok(),
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            SendOutcome::failed(format!("webhook responded with status {status}: {excerpt}"))
        }
        Err(e) if e.is_timeout() => SendOutcome::failed("timed out"),
        Err(e) => SendOutcome::failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{method as method_matcher, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> AlertContext<'static> {
        AlertContext {
            service_id: Uuid::nil(),
            service_name: "billing-api",
            dependency_id: Some(Uuid::nil()),
            dependency_name: "postgres",
            old_status: "healthy",
            new_status: "unhealthy",
            severity: "critical",
            recorded_at: Utc::now(),
            app_base_url: None,
        }
    }

    #[tokio::test]
    async fn posts_with_default_method() {
        let server = MockServer::start().await;
        Mock::given(method_matcher("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = send(
            &client,
            &format!("{}/hook", server.uri()),
            None,
            None,
            WebhookEvent::DependencyStatusChange,
            &ctx(),
        )
        .await;

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn rejects_unsupported_method() {
        let client = reqwest::Client::new();
        let outcome = send(
            &client,
            "https://example.com/hook",
            Some("DELETE"),
            None,
            WebhookEvent::DependencyStatusChange,
            &ctx(),
        )
        .await;

        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn reports_non_2xx_with_body_excerpt() {
        let server = MockServer::start().await;
        Mock::given(method_matcher("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = send(
            &client,
            &format!("{}/hook", server.uri()),
            None,
            None,
            WebhookEvent::DependencyStatusChange,
            &ctx(),
        )
        .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("boom"));
    }
}
