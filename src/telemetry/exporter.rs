//! Record export to the collection backend.
//!
//! The exporter boundary never raises: success and failure are values, so a
//! slow or broken backend cannot destabilize the ingestion path.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::json;

use crate::http::{shared_client, HttpError};

use super::models::EventRecord;

/// Outcome of one batch export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    Success,
    Failure,
}

/// Delivery boundary for batches of records.
#[async_trait]
pub trait EventExporter: Send + Sync {
    /// Ship one batch. Must not panic or propagate errors.
    async fn export(&self, batch: Vec<EventRecord>) -> ExportResult;

    /// Mark the exporter inert; subsequent exports are no-ops.
    fn shutdown(&self);
}

/// Exporter POSTing batches to `{endpoint}/v2/create_events` with the
/// session's bearer credential.
pub struct HttpEventExporter {
    client: reqwest::Client,
    endpoint: String,
    jwt: String,
    shut_down: AtomicBool,
}

impl HttpEventExporter {
    pub fn new(endpoint: impl Into<String>, jwt: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: shared_client().clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            jwt: jwt.into(),
            shut_down: AtomicBool::new(false),
        }
    }

    async fn post_events(&self, batch: &[EventRecord]) -> Result<(), HttpError> {
        let url = format!("{}/v2/create_events", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.jwt))
            .json(&json!({ "events": batch }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::from_response(
                status.as_u16(),
                &url,
                if body.trim().is_empty() { None } else { Some(&body) },
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EventExporter for HttpEventExporter {
    async fn export(&self, batch: Vec<EventRecord>) -> ExportResult {
        if self.shut_down.load(Ordering::Acquire) || batch.is_empty() {
            return ExportResult::Success;
        }

        match self.post_events(&batch).await {
            Ok(()) => {
                tracing::info!(events = batch.len(), "events exported");
                ExportResult::Success
            }
            Err(err) => {
                tracing::error!(%err, events = batch.len(), "export failed");
                ExportResult::Failure
            }
        }
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::testutil::{spawn_backend, wait_until};
    use chrono::Utc;
    use std::sync::atomic::Ordering as AtomicOrdering;
    use std::time::Duration;

    fn record(event_type: &str) -> EventRecord {
        EventRecord {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            init_timestamp: Utc::now(),
            end_timestamp: Some(Utc::now()),
            session_id: "test-session".to_string(),
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_export_posts_batch_with_bearer() {
        let backend = spawn_backend().await;
        let exporter = HttpEventExporter::new(backend.base_url.clone(), "jwt-abc");

        let result = exporter.export(vec![record("tools"), record("llms")]).await;
        assert_eq!(result, ExportResult::Success);

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].path.ends_with("/v2/create_events"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer jwt-abc"));
        assert_eq!(requests[0].body["events"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure_value() {
        let backend = spawn_backend().await;
        backend.events_status.store(500, AtomicOrdering::SeqCst);
        let exporter = HttpEventExporter::new(backend.base_url.clone(), "jwt-abc");

        let result = exporter.export(vec![record("tools")]).await;
        assert_eq!(result, ExportResult::Failure);

        // The pipeline keeps going: a later batch succeeds.
        backend.events_status.store(200, AtomicOrdering::SeqCst);
        let result = exporter.export(vec![record("tools")]).await;
        assert_eq!(result, ExportResult::Success);
    }

    #[tokio::test]
    async fn test_transport_error_is_failure_value() {
        // Nothing listens on this port.
        let exporter = HttpEventExporter::new("http://127.0.0.1:1", "jwt-abc");
        let result = exporter.export(vec![record("tools")]).await;
        assert_eq!(result, ExportResult::Failure);
    }

    #[tokio::test]
    async fn test_shutdown_makes_export_inert() {
        let backend = spawn_backend().await;
        let exporter = HttpEventExporter::new(backend.base_url.clone(), "jwt-abc");

        exporter.shutdown();
        let result = exporter.export(vec![record("tools")]).await;
        assert_eq!(result, ExportResult::Success);

        // No network activity after shutdown.
        assert!(!wait_until(|| !backend.requests.lock().is_empty(), Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let backend = spawn_backend().await;
        let exporter = HttpEventExporter::new(backend.base_url.clone(), "jwt-abc");

        assert_eq!(exporter.export(Vec::new()).await, ExportResult::Success);
        assert!(backend.requests.lock().is_empty());
    }
}
