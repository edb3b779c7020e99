//! Session telemetry pipeline.
//!
//! Captures discrete application events during the lifetime of a session,
//! converts them into flattened records, batches them, and ships them
//! asynchronously to the collection backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Host Application                     │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────▼──────────┐
//!               │      Session        │
//!               │   - start()         │
//!               │   - record_event()  │
//!               │   - end()           │
//!               └──────────┬──────────┘
//!                          │ EventRecord
//!               ┌──────────▼──────────┐
//!               │   BatchProcessor    │  size / time flush triggers
//!               └──────────┬──────────┘
//!                          │ batch
//!               ┌──────────▼──────────┐
//!               │   EventExporter     │  (trait)
//!               └──────────┬──────────┘
//!                          │
//!               ┌──────────▼──────────┐
//!               │  HttpEventExporter  │  POST /v2/create_events
//!               └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use agentops::telemetry::{Session, SessionEndState, TelemetryEvent, ToolEvent};
//! use agentops::Configuration;
//!
//! let session = Session::new(Configuration::default().with_api_key("sk-..."));
//! session.start(vec!["experiment".into()], None).await?;
//!
//! session.record_event(TelemetryEvent::Tool(ToolEvent {
//!     name: Some("web_search".into()),
//!     ..Default::default()
//! }));
//!
//! session.end(SessionEndState::Success, Some("done".into())).await;
//! ```

pub mod error;
pub mod exporter;
pub mod models;
pub mod processor;
pub mod session;
pub mod summary;

// Re-export main types for convenience
pub use error::SessionStartError;
pub use exporter::{EventExporter, ExportResult, HttpEventExporter};
pub use models::{
    ActionEvent, ApiEvent, ErrorEvent, EventBase, EventCounts, EventKind, EventRecord, LlmEvent,
    TelemetryEvent, ToolEvent,
};
pub use processor::{BatchConfig, BatchProcessor};
pub use session::{Session, SessionEndState};
pub use summary::SessionSummary;
