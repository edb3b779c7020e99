//! Process-level client facade.
//!
//! `Client` owns the configuration and the sessions created through it,
//! routing recording calls to the current session. Hosts that manage
//! [`Session`] handles directly do not need it.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::Configuration;
use crate::telemetry::{Session, SessionEndState, SessionStartError, TelemetryEvent};

/// Options for [`Client::init`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// API key; falls back to the configuration (or its env default).
    pub api_key: Option<String>,
    /// Tags attached to the session.
    pub tags: Vec<String>,
    /// Continue a session started in another process.
    pub inherited_session_id: Option<String>,
}

/// Entry point managing sessions for one process.
pub struct Client {
    config: RwLock<Configuration>,
    sessions: RwLock<Vec<Arc<Session>>>,
    current: RwLock<Option<Arc<Session>>>,
}

impl Client {
    pub fn new(config: Configuration) -> Self {
        Self {
            config: RwLock::new(config),
            sessions: RwLock::new(Vec::new()),
            current: RwLock::new(None),
        }
    }

    /// Create a session and make it current.
    ///
    /// When `auto_start_sessions` is enabled (the default) the session is
    /// started before this returns; otherwise it is returned unstarted and
    /// the caller invokes [`Session::start`] with its own tags.
    pub async fn init(&self, options: InitOptions) -> Result<Arc<Session>, SessionStartError> {
        let config = {
            let mut config = self.config.write();
            if let Some(api_key) = options.api_key {
                config.api_key = Some(api_key);
            }
            config.clone()
        };

        let auto_start = config.auto_start_sessions;
        let session = Arc::new(Session::new(config));
        if auto_start {
            session
                .start(options.tags, options.inherited_session_id)
                .await?;
        }

        self.sessions.write().push(Arc::clone(&session));
        *self.current.write() = Some(Arc::clone(&session));
        Ok(session)
    }

    /// The session currently receiving events, if any.
    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.current.read().clone()
    }

    /// Record a typed event against the current session. No-op without one.
    pub fn record(&self, event: TelemetryEvent) {
        if let Some(session) = self.current_session() {
            session.record_event(event);
        }
    }

    /// Record a raw event against the current session. No-op without one.
    pub fn log_event(&self, event_type: &str, data: Value) {
        if let Some(session) = self.current_session() {
            session.record_raw(event_type, data);
        }
    }

    /// End the current session and clear the current pointer.
    pub async fn end_session(&self, end_state: SessionEndState, reason: Option<String>) {
        let session = self.current.write().take();
        match session {
            Some(session) => session.end(end_state, reason).await,
            None => tracing::debug!("end_session ignored: no current session"),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}
