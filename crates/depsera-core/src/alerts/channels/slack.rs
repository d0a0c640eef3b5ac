//! Slack webhook sender (spec §4.J).

use serde_json::json;

use super::{AlertContext, SendOutcome, SEND_TIMEOUT};

const SLACK_WEBHOOK_PREFIX: &str = "https://hooks.slack.com/services/";

/// POSTs a Slack "incoming webhook" attachment payload. `webhook_url` is
/// validated before any request is made.
pub async fn send(client: &reqwest::Client, webhook_url: &str, ctx: &AlertContext<'_>) -> SendOutcome {
    if !webhook_url.starts_with(SLACK_WEBHOOK_PREFIX) {
        return SendOutcome::failed("webhook_url must start with https://hooks.slack.com/services/");
    }

    let color = match ctx.severity {
        "critical" => "danger",
        _ => "warning",
    };

    let title = format!("{} — {}", ctx.service_name, ctx.dependency_name);
    let text = format!("Status changed from {} to {}", ctx.old_status, ctx.new_status);

    let mut attachment = json!({
        "color": color,
        "title": title,
        "text": text,
        "fields": [
            { "title": "Severity", "value": ctx.severity, "short": true },
            { "title": "Recorded at", "value": ctx.recorded_at.to_rfc3339(), "short": true },
        ],
    });

    if let Some(base) = ctx.app_base_url {
        attachment["title_link"] = json!(format!("{}/services/{}", base.trim_end_matches('/'), ctx.service_id));
    }

    let payload = json!({ "attachments": [attachment] });

    let response = client
        .post(webhook_url)
        .timeout(SEND_TIMEOUT)
        .json(&payload)
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => SendOutcome::ok(),
        Ok(resp) => SendOutcome::failed(format!("slack responded with status {}", resp.status())),
        Err(e) if e.is_timeout() => SendOutcome::failed("timed out"),
        Err(e) => SendOutcome::failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn ctx(recorded_at: chrono::DateTime<Utc>) -> AlertContext<'static> {
        AlertContext {
            service_id: Uuid::nil(),
            service_name: "billing-api",
            dependency_id: Some(Uuid::nil()),
            dependency_name: "postgres",
            old_status: "healthy",
            new_status: "unhealthy",
            severity: "critical",
            recorded_at,
            app_base_url: None,
        }
    }

    #[tokio::test]
    async fn rejects_non_slack_url() {
        let client = reqwest::Client::new();
        let outcome = send(&client, "https://example.com/hook", &ctx(Utc::now())).await;
        assert!(!outcome.success);
    }
}
