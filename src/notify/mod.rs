//! Terminal-state webhook notification.
//!
//! Optional: when no URL is configured the notifier is a no-op. Delivery
//! failures are logged and swallowed; notification is best-effort and never
//! changes a job's outcome.

use crate::pipeline::{JobReport, JobState};
use std::time::Duration;

/// Posts job terminal states to a configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Self {
        WebhookNotifier {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Disabled notifier.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Sends the terminal-state payload, if a webhook is configured.
    pub async fn notify(&self, report: &JobReport) {
        let Some(url) = &self.url else {
            return;
        };

        let payload = payload(report);
        let result = self
            .client
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                log::info!("webhook notified: {}", report.state.as_str());
            }
            Ok(response) => {
                log::warn!("webhook returned {}", response.status());
            }
            Err(e) => {
                log::warn!("webhook delivery failed: {e}");
            }
        }
    }
}

fn payload(report: &JobReport) -> serde_json::Value {
    let status = match report.state {
        JobState::Completed => "success",
        _ => "failure",
    };
    serde_json::json!({
        "buildId": report.job_id,
        "status": status,
        "artifactId": report.artifact.as_ref().map(|a| a.id.clone()),
        "error": report.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::JobReport;
    use uuid::Uuid;

    #[test]
    fn payload_marks_completed_as_success() {
        let report = JobReport::completed_for_test(Uuid::new_v4());
        let value = payload(&report);
        assert_eq!(value["status"], "success");
        assert_eq!(value["error"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn disabled_notifier_is_a_noop() {
        let notifier = WebhookNotifier::disabled();
        notifier
            .notify(&JobReport::completed_for_test(Uuid::new_v4()))
            .await;
    }
}
