//! Session lifecycle.
//!
//! A session is a bounded unit of work whose events are grouped, batched,
//! and exported under one identity and credential. It moves through
//! `NotStarted -> Running -> Ended` exactly once, owns its batch processor
//! and exporter for its lifetime, and tears both down when it ends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Configuration;
use crate::host_env;
use crate::http::{ApiClient, HttpError};

use super::error::SessionStartError;
use super::exporter::HttpEventExporter;
use super::models::{EventCounts, EventKind, EventRecord, TelemetryEvent};
use super::processor::{BatchConfig, BatchProcessor};
use super::summary::{self, SessionSummary};

/// How a session ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEndState {
    Success,
    Fail,
    #[default]
    Indeterminate,
}

impl std::fmt::Display for SessionEndState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEndState::Success => f.write_str("Success"),
            SessionEndState::Fail => f.write_str("Fail"),
            SessionEndState::Indeterminate => f.write_str("Indeterminate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    NotStarted,
    Running,
    Ended,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(default)]
    jwt: Option<String>,
}

struct SessionInner {
    state: SessionState,
    id: String,
    tags: Vec<String>,
    init_timestamp: Option<DateTime<Utc>>,
    end_timestamp: Option<DateTime<Utc>>,
    end_state: SessionEndState,
    end_state_reason: Option<String>,
    event_counts: EventCounts,
    token_cost: f64,
    processor: Option<Arc<BatchProcessor>>,
}

/// One telemetry session.
pub struct Session {
    config: Configuration,
    api: ApiClient,
    /// Serializes the start sequence; identity and credential fields must
    /// never be observed half-initialized by a concurrent caller.
    start_lock: tokio::sync::Mutex<()>,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(config: Configuration) -> Self {
        let api = ApiClient::new(&config.endpoint);
        Self {
            config,
            api,
            start_lock: tokio::sync::Mutex::new(()),
            inner: Mutex::new(SessionInner {
                state: SessionState::NotStarted,
                id: String::new(),
                tags: Vec::new(),
                init_timestamp: None,
                end_timestamp: None,
                end_state: SessionEndState::Indeterminate,
                end_state_reason: None,
                event_counts: EventCounts::default(),
                token_cost: 0.0,
                processor: None,
            }),
        }
    }

    /// Register the session with the backend and transition to running.
    ///
    /// The full sequence runs under a per-session lock: a concurrent `start`
    /// waits for the first to finish and then returns without issuing a
    /// second registration request. On any failure the session stays
    /// not-started.
    pub async fn start(
        &self,
        tags: Vec<String>,
        inherited_session_id: Option<String>,
    ) -> Result<(), SessionStartError> {
        let _guard = self.start_lock.lock().await;

        {
            let inner = self.inner.lock();
            match inner.state {
                SessionState::Running => return Ok(()),
                SessionState::Ended => return Err(SessionStartError::AlreadyEnded),
                SessionState::NotStarted => {}
            }
        }

        let id = inherited_session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let init_timestamp = Utc::now();
        {
            let mut inner = self.inner.lock();
            inner.id = id.clone();
            inner.tags = tags.clone();
            inner.init_timestamp = Some(init_timestamp);
        }

        let host_env = host_env::get_host_env().await;
        let payload = json!({
            "session": {
                "id": id,
                "tags": tags,
                "init_timestamp": init_timestamp,
                "host_env": host_env,
            }
        });

        let response: CreateSessionResponse = self
            .api
            .post_json("/v2/create_session", &payload, self.registration_headers()?)
            .await?;
        let jwt = response
            .jwt
            .filter(|token| !token.is_empty())
            .ok_or(SessionStartError::MissingJwt)?;

        let exporter = Arc::new(HttpEventExporter::new(self.config.endpoint.clone(), jwt));
        let processor = BatchProcessor::new(exporter, BatchConfig::from_configuration(&self.config));

        {
            let mut inner = self.inner.lock();
            inner.processor = Some(Arc::new(processor));
            inner.state = SessionState::Running;
        }

        match self.session_url() {
            Some(url) => tracing::info!(session_id = %id, %url, "session replay"),
            None => tracing::info!(session_id = %id, "session started"),
        }
        Ok(())
    }

    fn registration_headers(&self) -> Result<HeaderMap, SessionStartError> {
        let mut headers = HeaderMap::new();
        let api_key = self.config.api_key.clone().unwrap_or_default();
        headers.insert(
            "X-Agentops-Api-Key",
            HeaderValue::from_str(&api_key)
                .map_err(|_| SessionStartError::Http(HttpError::InvalidHeader("api key")))?,
        );
        if let Some(ref parent_key) = self.config.parent_key {
            headers.insert(
                "X-Parent-Key",
                HeaderValue::from_str(parent_key)
                    .map_err(|_| SessionStartError::Http(HttpError::InvalidHeader("parent key")))?,
            );
        }
        Ok(headers)
    }

    /// Record a typed event.
    ///
    /// A no-op unless the session is running. Synchronous and
    /// fire-and-forget: the caller is never blocked beyond record
    /// construction; export happens in the background.
    pub fn record_event(&self, event: TelemetryEvent) {
        let kind = event.kind();
        let (record, processor) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Running {
                tracing::debug!(kind = %kind, "event discarded: session is not running");
                return;
            }

            inner.event_counts.increment(kind);
            if let Some(cost) = event.cost() {
                inner.token_cost += cost;
            }

            let base = event.base();
            let record = EventRecord {
                id: base.id.clone(),
                event_type: kind.as_str().to_string(),
                init_timestamp: base.init_timestamp,
                end_timestamp: Some(base.end_timestamp.unwrap_or_else(Utc::now)),
                session_id: inner.id.clone(),
                data: event.payload(),
            };
            let processor = match inner.processor.clone() {
                Some(processor) => processor,
                None => return,
            };
            (record, processor)
        };
        processor.enqueue(record);
    }

    /// Record an event from a raw kind string and payload.
    ///
    /// The per-kind counter is incremented only when the kind is recognized;
    /// the record is enqueued either way.
    pub fn record_raw(&self, event_type: &str, data: Value) {
        let (record, processor) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Running {
                tracing::debug!(event_type, "event discarded: session is not running");
                return;
            }

            if let Some(kind) = EventKind::from_str(event_type) {
                inner.event_counts.increment(kind);
            }

            let now = Utc::now();
            let record = EventRecord {
                id: Uuid::new_v4().to_string(),
                event_type: event_type.to_string(),
                init_timestamp: now,
                end_timestamp: Some(now),
                session_id: inner.id.clone(),
                data,
            };
            let processor = match inner.processor.clone() {
                Some(processor) => processor,
                None => return,
            };
            (record, processor)
        };
        processor.enqueue(record);
    }

    /// End the session.
    ///
    /// Idempotent past the first call. The state flips to ended before the
    /// drain begins, so nothing recorded afterwards can slip into the final
    /// batch; the drain is awaited before the summary is emitted, so the
    /// final batch cannot be lost to the process exiting underneath it.
    pub async fn end(&self, end_state: SessionEndState, reason: Option<String>) {
        let processor = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Running {
                tracing::debug!("end ignored: session is not running");
                return;
            }
            inner.state = SessionState::Ended;
            inner.end_state = end_state;
            inner.end_state_reason = reason;
            inner.end_timestamp = Some(Utc::now());
            inner.processor.take()
        };

        if let Some(processor) = processor {
            processor.shutdown().await;
        }

        tracing::debug!("{}", summary::render(&self.summary()));
    }

    /// Snapshot of the session for summary rendering.
    pub fn summary(&self) -> SessionSummary {
        let inner = self.inner.lock();
        let duration_secs = match (inner.init_timestamp, inner.end_timestamp) {
            (Some(start), Some(end)) => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        };
        SessionSummary {
            session_id: inner.id.clone(),
            duration_secs,
            token_cost: inner.token_cost,
            event_counts: inner.event_counts,
            end_state: inner.end_state,
            end_state_reason: inner.end_state_reason.clone(),
        }
    }

    /// The session id; empty until `start` assigns one.
    pub fn id(&self) -> String {
        self.inner.lock().id.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().state == SessionState::Running
    }

    pub fn tags(&self) -> Vec<String> {
        self.inner.lock().tags.clone()
    }

    pub fn event_counts(&self) -> EventCounts {
        self.inner.lock().event_counts
    }

    pub fn token_cost(&self) -> f64 {
        self.inner.lock().token_cost
    }

    pub fn end_state(&self) -> SessionEndState {
        self.inner.lock().end_state
    }

    /// Replay URL on the dashboard host, when the endpoint has one.
    pub fn session_url(&self) -> Option<String> {
        let inner = self.inner.lock();
        if inner.id.is_empty() || !self.config.endpoint.contains("//api.") {
            return None;
        }
        let dashboard = self.config.endpoint.replacen("//api.", "//app.", 1);
        Some(format!(
            "{}/drilldown?session_id={}",
            dashboard.trim_end_matches('/'),
            inner.id
        ))
    }

    /// Number of records awaiting export. Zero once ended.
    pub fn pending_records(&self) -> usize {
        self.inner
            .lock()
            .processor
            .as_ref()
            .map(|p| p.pending())
            .unwrap_or(0)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == SessionState::Running {
            tracing::warn!(
                session_id = %inner.id,
                "session dropped while running; buffered records are lost without end()"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::models::{ActionEvent, LlmEvent, ToolEvent};
    use crate::telemetry::testutil::{spawn_backend, wait_until, TestBackend};
    use std::sync::atomic::Ordering;
    use std::time::Duration as StdDuration;

    fn session_for(backend: &TestBackend) -> Session {
        let config = Configuration::default()
            .with_endpoint(backend.base_url.clone())
            .with_api_key("test-api-key")
            .with_max_queue_size(2)
            .with_max_wait_time(5_000);
        Session::new(config)
    }

    fn tool_event(name: &str) -> TelemetryEvent {
        TelemetryEvent::Tool(ToolEvent {
            name: Some(name.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_start_registers_and_runs() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);

        session.start(vec!["test".to_string()], None).await.unwrap();
        assert!(session.is_running());
        assert!(!session.id().is_empty());

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].path.ends_with("/v2/create_session"));
        assert_eq!(requests[0].api_key.as_deref(), Some("test-api-key"));
        let body = &requests[0].body["session"];
        assert_eq!(body["id"], session.id().as_str());
        assert_eq!(body["tags"][0], "test");
        assert!(body["host_env"].is_object());
    }

    #[tokio::test]
    async fn test_inherited_session_id() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);

        session
            .start(Vec::new(), Some("inherited-id".to_string()))
            .await
            .unwrap();
        assert_eq!(session.id(), "inherited-id");
    }

    #[tokio::test]
    async fn test_parent_key_header() {
        let backend = spawn_backend().await;
        let config = Configuration::default()
            .with_endpoint(backend.base_url.clone())
            .with_api_key("test-api-key")
            .with_parent_key("parent-key");
        let session = Session::new(config);

        session.start(Vec::new(), None).await.unwrap();

        let requests = backend.requests.lock();
        assert_eq!(requests[0].parent_key.as_deref(), Some("parent-key"));
    }

    #[tokio::test]
    async fn test_missing_jwt_fails_start() {
        let backend = spawn_backend().await;
        backend.include_jwt.store(false, Ordering::SeqCst);
        let session = session_for(&backend);

        let err = session.start(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, SessionStartError::MissingJwt));
        assert!(!session.is_running());

        // Events recorded against the failed session go nowhere.
        session.record_event(tool_event("search"));
        assert_eq!(session.event_counts().tools, 0);
        assert!(backend.event_batches().is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_registration_fails_start() {
        let backend = spawn_backend().await;
        backend.session_status.store(503, Ordering::SeqCst);
        let session = session_for(&backend);

        let err = session.start(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, SessionStartError::Http(_)));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_concurrent_start_registers_once() {
        let backend = spawn_backend().await;
        let session = Arc::new(session_for(&backend));

        let a = {
            let session = session.clone();
            tokio::spawn(async move { session.start(Vec::new(), None).await })
        };
        let b = {
            let session = session.clone();
            tokio::spawn(async move { session.start(Vec::new(), None).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let registrations = backend
            .requests
            .lock()
            .iter()
            .filter(|r| r.path.ends_with("/v2/create_session"))
            .count();
        assert_eq!(registrations, 1);
    }

    #[tokio::test]
    async fn test_events_before_start_are_discarded() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);

        session.record_event(tool_event("early"));
        session.start(Vec::new(), None).await.unwrap();
        session.end(SessionEndState::Success, None).await;

        assert_eq!(session.event_counts().total(), 0);
        assert!(backend.event_batches().is_empty());
    }

    #[tokio::test]
    async fn test_batching_scenario() {
        // max_queue_size=2, max_wait_time=5000: three tool events produce an
        // immediate batch of 2, the third flushes on session end.
        let backend = spawn_backend().await;
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();

        for name in ["a", "b", "c"] {
            session.record_event(tool_event(name));
        }

        assert!(
            wait_until(
                || backend.event_batches().first().map(Vec::len) == Some(2),
                StdDuration::from_secs(2)
            )
            .await,
            "size-triggered batch never arrived"
        );

        session.end(SessionEndState::Success, None).await;

        let batches = backend.event_batches();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1]);
        assert_eq!(session.event_counts().tools, 3);

        // Records flushed in enqueue order, under the session's bearer token.
        let names: Vec<String> = batches
            .iter()
            .flatten()
            .map(|e| e["data"]["name"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let requests = backend.requests.lock();
        let export = requests
            .iter()
            .find(|r| r.path.ends_with("/v2/create_events"))
            .unwrap();
        assert_eq!(export.authorization.as_deref(), Some("Bearer test-jwt"));
    }

    #[tokio::test]
    async fn test_end_drains_before_returning() {
        let backend = spawn_backend().await;
        let config = Configuration::default()
            .with_endpoint(backend.base_url.clone())
            .with_api_key("test-api-key")
            .with_max_queue_size(100)
            .with_max_wait_time(60_000);
        let session = Session::new(config);
        session.start(Vec::new(), None).await.unwrap();

        for n in 0..7 {
            session.record_event(tool_event(&format!("tool-{n}")));
        }
        session.end(SessionEndState::Success, Some("done".to_string())).await;

        // No waiting: the final flush settled before end() returned.
        let batches = backend.event_batches();
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 7);
        assert_eq!(session.end_state(), SessionEndState::Success);
    }

    #[tokio::test]
    async fn test_events_after_end_are_discarded() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();
        session.end(SessionEndState::Success, None).await;

        session.record_event(tool_event("late"));
        session.end(SessionEndState::Fail, None).await;

        assert_eq!(session.event_counts().total(), 0);
        assert!(backend.event_batches().is_empty());
        // The first end sticks.
        assert_eq!(session.end_state(), SessionEndState::Success);
    }

    #[tokio::test]
    async fn test_start_after_end_is_rejected() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();
        session.end(SessionEndState::Success, None).await;

        let err = session.start(Vec::new(), None).await.unwrap_err();
        assert!(matches!(err, SessionStartError::AlreadyEnded));
    }

    #[tokio::test]
    async fn test_counters_survive_export_failure() {
        let backend = spawn_backend().await;
        backend.events_status.store(500, Ordering::SeqCst);
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();

        for name in ["a", "b", "c"] {
            session.record_event(tool_event(name));
        }
        session.end(SessionEndState::Fail, Some("backend down".to_string())).await;

        // Batches were dropped, counters were not rolled back.
        assert_eq!(session.event_counts().tools, 3);
    }

    #[tokio::test]
    async fn test_cost_accumulates_from_llm_events() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();

        for _ in 0..2 {
            session.record_event(TelemetryEvent::Llm(LlmEvent {
                model: Some("gpt-4".to_string()),
                cost: Some(0.25),
                ..Default::default()
            }));
        }
        session.record_event(TelemetryEvent::Action(ActionEvent::default()));
        session.end(SessionEndState::Success, None).await;

        assert!((session.token_cost() - 0.5).abs() < f64::EPSILON);
        assert_eq!(session.event_counts().llms, 2);
        assert_eq!(session.event_counts().actions, 1);
    }

    #[tokio::test]
    async fn test_record_raw_counts_only_recognized_kinds() {
        let backend = spawn_backend().await;
        let session = session_for(&backend);
        session.start(Vec::new(), None).await.unwrap();

        session.record_raw("tools", json!({"name": "grep"}));
        session.record_raw("custom_kind", json!({"x": 1}));
        session.end(SessionEndState::Success, None).await;

        assert_eq!(session.event_counts().tools, 1);
        assert_eq!(session.event_counts().total(), 1);

        // Both records were exported regardless of counter recognition.
        let exported: usize = backend.event_batches().iter().map(Vec::len).sum();
        assert_eq!(exported, 2);
    }

    #[test]
    fn test_session_url() {
        let session = Session::new(
            Configuration::default().with_endpoint("https://api.agentops.ai"),
        );
        assert!(session.session_url().is_none());

        session.inner.lock().id = "abc".to_string();
        assert_eq!(
            session.session_url().as_deref(),
            Some("https://app.agentops.ai/drilldown?session_id=abc")
        );
    }
}
