//! Delivery of card messages to a chat webhook.

use std::time::Duration;

use crate::card::CardMessage;
use crate::error::{Result, TrackerError};

/// Something that can deliver a card message to a webhook endpoint.
pub trait Notifier {
    fn deliver(&self, webhook_url: &str, message: &CardMessage) -> Result<()>;
}

/// Posts card messages as JSON over HTTP.
pub struct WebhookNotifier {
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("task_tracker/", env!("CARGO_PKG_VERSION")))
            .build();
        WebhookNotifier { agent }
    }
}

impl Notifier for WebhookNotifier {
    fn deliver(&self, webhook_url: &str, message: &CardMessage) -> Result<()> {
        let body = serde_json::to_string(message)?;
        match self
            .agent
            .post(webhook_url)
            .set("Content-Type", "application/json; charset=UTF-8")
            .send_string(&body)
        {
            Ok(resp) => {
                tracing::debug!(status = resp.status(), "webhook accepted message");
                Ok(())
            }
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp.into_string().unwrap_or_default();
                Err(TrackerError::DeliveryFailure(format!(
                    "webhook returned HTTP {code}: {}",
                    detail.trim()
                )))
            }
            Err(e) => Err(TrackerError::DeliveryFailure(e.to_string())),
        }
    }
}
