// ABOUTME: Deployment notifications: a structured event and the sinks that receive it.
// ABOUTME: Delivery failures are reported to the caller but never change a deployment's outcome.

mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::config::NotifyConfig;
use crate::http::{HttpClient, HttpError};
use crate::types::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failure,
}

/// The event sent to every sink at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentEvent {
    pub status: EventStatus,
    pub project: String,
    pub destination: String,
    pub version: String,
    /// Environment serving traffic when the run ended, if known.
    pub environment: Option<Environment>,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub rollback_performed: bool,
    pub dry_run: bool,
}

fn rfc3339<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Http(#[from] HttpError),

    #[error("webhook answered with status {0}")]
    Status(u16),

    #[error("{failed} of {total} notification sinks failed: {}", .errors.join("; "))]
    Partial {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &DeploymentEvent) -> Result<(), NotifyError>;
}

/// Emits the event as a single structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &DeploymentEvent) -> Result<(), NotifyError> {
        let environment = event.environment.map(|e| e.as_str()).unwrap_or("unknown");
        let failed_stage = event.failed_stage.as_deref().unwrap_or("-");
        match event.status {
            EventStatus::Success => tracing::info!(
                project = %event.project,
                destination = %event.destination,
                version = %event.version,
                environment,
                dry_run = event.dry_run,
                "deployment succeeded"
            ),
            EventStatus::Failure => tracing::error!(
                project = %event.project,
                destination = %event.destination,
                version = %event.version,
                environment,
                failed_stage,
                rollback_performed = event.rollback_performed,
                dry_run = event.dry_run,
                "deployment failed"
            ),
        }
        Ok(())
    }
}

/// Delivers to every sink, even after one fails.
#[derive(Clone, Default)]
pub struct NotifierSet {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// The log sink always; the webhook when one is configured and resolvable.
    pub fn from_config<C>(config: Option<&NotifyConfig>, client: C) -> Self
    where
        C: HttpClient + 'static,
    {
        let set = NotifierSet::new().with(Arc::new(LogNotifier));

        let Some(config) = config else {
            return set;
        };
        let Some(ref webhook) = config.webhook else {
            return set;
        };

        match webhook.resolve_optional() {
            Some(url) => set.with(Arc::new(WebhookNotifier::new(client, url, config.timeout))),
            None => {
                tracing::warn!("Webhook URL is not set in the environment; webhook notifications disabled");
                set
            }
        }
    }
}

#[async_trait]
impl Notifier for NotifierSet {
    async fn notify(&self, event: &DeploymentEvent) -> Result<(), NotifyError> {
        let results =
            futures::future::join_all(self.sinks.iter().map(|sink| sink.notify(event))).await;

        let errors: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err())
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Partial {
                failed: errors.len(),
                total: self.sinks.len(),
                errors,
            })
        }
    }
}
