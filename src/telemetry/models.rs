//! Telemetry data models.
//!
//! Events are the caller-facing types: a tagged variant per kind, each
//! carrying the universal fields plus kind-specific data. Records are the
//! flattened, serialization-ready projection queued for export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// EVENT KINDS
// ============================================================================

/// Event kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "llms")]
    Llm,
    #[serde(rename = "actions")]
    Action,
    #[serde(rename = "apis")]
    Api,
    #[serde(rename = "tools")]
    Tool,
    #[serde(rename = "errors")]
    Error,
}

impl EventKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Llm => "llms",
            EventKind::Action => "actions",
            EventKind::Api => "apis",
            EventKind::Tool => "tools",
            EventKind::Error => "errors",
        }
    }

    /// Parse a kind from its wire name (singular aliases accepted).
    pub fn from_str(kind: &str) -> Option<Self> {
        match kind {
            "llms" | "llm" => Some(EventKind::Llm),
            "actions" | "action" => Some(EventKind::Action),
            "apis" | "api" => Some(EventKind::Api),
            "tools" | "tool" => Some(EventKind::Tool),
            "errors" | "error" => Some(EventKind::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Fields common to all events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBase {
    /// Unique event id.
    pub id: String,
    /// Owning session id, filled in by the pipeline.
    #[serde(default)]
    pub session_id: Option<String>,
    /// When the observed action started.
    pub init_timestamp: DateTime<Utc>,
    /// When the observed action finished.
    #[serde(default)]
    pub end_timestamp: Option<DateTime<Utc>>,
    /// Agent the event is attributed to.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Free-form call parameters.
    #[serde(default)]
    pub params: Option<Value>,
    /// Free-form return values.
    #[serde(default)]
    pub returns: Option<Value>,
}

impl EventBase {
    /// Fresh base fields: new id, `init_timestamp` now.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: None,
            init_timestamp: Utc::now(),
            end_timestamp: None,
            agent_id: None,
            params: None,
            returns: None,
        }
    }
}

impl Default for EventBase {
    fn default() -> Self {
        Self::new()
    }
}

/// LLM call event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmEvent {
    #[serde(flatten)]
    pub base: EventBase,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub prompt_tokens: Option<i64>,
    #[serde(default)]
    pub completion: Option<Value>,
    #[serde(default)]
    pub completion_tokens: Option<i64>,
    /// Cost of the call in USD; accumulated onto the session.
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Agent action event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionEvent {
    #[serde(flatten)]
    pub base: EventBase,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub logs: Option<Value>,
    #[serde(default)]
    pub screenshot: Option<String>,
}

/// Tool invocation event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolEvent {
    #[serde(flatten)]
    pub base: EventBase,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logs: Option<Value>,
}

/// External API call event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEvent {
    #[serde(flatten)]
    pub base: EventBase,
}

/// Error event.
///
/// Holds only strings derived from the source error. The live error value is
/// never retained, so the event is always serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(flatten)]
    pub base: EventBase,
    /// The event whose execution triggered this error, if any.
    #[serde(default)]
    pub trigger_event: Option<Box<TelemetryEvent>>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
}

impl ErrorEvent {
    /// New error event with `end_timestamp` stamped now.
    pub fn new() -> Self {
        let mut base = EventBase::new();
        base.end_timestamp = Some(Utc::now());
        Self {
            base,
            trigger_event: None,
            error_type: None,
            code: None,
            details: None,
            logs: None,
        }
    }

    /// Derive an error event from any error value.
    ///
    /// `error_type` is the error's short type name, `details` its display
    /// message, and `logs` the joined source chain.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        Self {
            error_type: Some(short_type_name::<E>()),
            details: Some(err.to_string()),
            logs: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\ncaused by: "))
            },
            ..Self::new()
        }
    }
}

impl Default for ErrorEvent {
    fn default() -> Self {
        Self::new()
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// Unified event type using a tagged enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum TelemetryEvent {
    #[serde(rename = "llms")]
    Llm(LlmEvent),
    #[serde(rename = "actions")]
    Action(ActionEvent),
    #[serde(rename = "apis")]
    Api(ApiEvent),
    #[serde(rename = "tools")]
    Tool(ToolEvent),
    #[serde(rename = "errors")]
    Error(ErrorEvent),
}

impl TelemetryEvent {
    /// Get the event kind.
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::Llm(_) => EventKind::Llm,
            TelemetryEvent::Action(_) => EventKind::Action,
            TelemetryEvent::Api(_) => EventKind::Api,
            TelemetryEvent::Tool(_) => EventKind::Tool,
            TelemetryEvent::Error(_) => EventKind::Error,
        }
    }

    /// Get the universal fields.
    pub fn base(&self) -> &EventBase {
        match self {
            TelemetryEvent::Llm(e) => &e.base,
            TelemetryEvent::Action(e) => &e.base,
            TelemetryEvent::Api(e) => &e.base,
            TelemetryEvent::Tool(e) => &e.base,
            TelemetryEvent::Error(e) => &e.base,
        }
    }

    /// Get the universal fields mutably.
    pub fn base_mut(&mut self) -> &mut EventBase {
        match self {
            TelemetryEvent::Llm(e) => &mut e.base,
            TelemetryEvent::Action(e) => &mut e.base,
            TelemetryEvent::Api(e) => &mut e.base,
            TelemetryEvent::Tool(e) => &mut e.base,
            TelemetryEvent::Error(e) => &mut e.base,
        }
    }

    /// Cost attributed to this event, if any.
    pub fn cost(&self) -> Option<f64> {
        match self {
            TelemetryEvent::Llm(e) => e.cost,
            _ => None,
        }
    }

    /// Serialize the kind-specific payload (without the kind tag).
    pub fn payload(&self) -> Value {
        let result = match self {
            TelemetryEvent::Llm(e) => serde_json::to_value(e),
            TelemetryEvent::Action(e) => serde_json::to_value(e),
            TelemetryEvent::Api(e) => serde_json::to_value(e),
            TelemetryEvent::Tool(e) => serde_json::to_value(e),
            TelemetryEvent::Error(e) => serde_json::to_value(e),
        };
        result.unwrap_or_default()
    }
}

impl From<LlmEvent> for TelemetryEvent {
    fn from(event: LlmEvent) -> Self {
        TelemetryEvent::Llm(event)
    }
}

impl From<ActionEvent> for TelemetryEvent {
    fn from(event: ActionEvent) -> Self {
        TelemetryEvent::Action(event)
    }
}

impl From<ApiEvent> for TelemetryEvent {
    fn from(event: ApiEvent) -> Self {
        TelemetryEvent::Api(event)
    }
}

impl From<ToolEvent> for TelemetryEvent {
    fn from(event: ToolEvent) -> Self {
        TelemetryEvent::Tool(event)
    }
}

impl From<ErrorEvent> for TelemetryEvent {
    fn from(event: ErrorEvent) -> Self {
        TelemetryEvent::Error(event)
    }
}

// ============================================================================
// COUNTERS
// ============================================================================

/// Per-kind running event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub llms: u64,
    pub tools: u64,
    pub actions: u64,
    pub errors: u64,
    pub apis: u64,
}

impl EventCounts {
    pub fn increment(&mut self, kind: EventKind) {
        match kind {
            EventKind::Llm => self.llms += 1,
            EventKind::Tool => self.tools += 1,
            EventKind::Action => self.actions += 1,
            EventKind::Error => self.errors += 1,
            EventKind::Api => self.apis += 1,
        }
    }

    pub fn get(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Llm => self.llms,
            EventKind::Tool => self.tools,
            EventKind::Action => self.actions,
            EventKind::Error => self.errors,
            EventKind::Api => self.apis,
        }
    }

    pub fn total(&self) -> u64 {
        self.llms + self.tools + self.actions + self.errors + self.apis
    }
}

// ============================================================================
// BATCH RECORDS
// ============================================================================

/// The flattened export unit: one record per event, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub event_type: String,
    pub init_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub end_timestamp: Option<DateTime<Utc>>,
    pub session_id: String,
    pub data: Value,
}
