// ABOUTME: Webhook notification sink posting the event as JSON.
// ABOUTME: Any 2xx answer counts as delivered.

use async_trait::async_trait;
use std::time::Duration;

use super::{DeploymentEvent, Notifier, NotifyError};
use crate::http::{HttpClient, HttpRequest};

pub struct WebhookNotifier<C> {
    client: C,
    url: String,
    timeout: Duration,
}

impl<C: HttpClient> WebhookNotifier<C> {
    pub fn new(client: C, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl<C: HttpClient> Notifier for WebhookNotifier<C> {
    async fn notify(&self, event: &DeploymentEvent) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(event)?;
        let response = self
            .client
            .send(HttpRequest::post_json(&self.url, body, self.timeout))
            .await?;

        if (200..300).contains(&response.status) {
            tracing::debug!("Webhook delivered ({})", response.status);
            Ok(())
        } else {
            Err(NotifyError::Status(response.status))
        }
    }
}
