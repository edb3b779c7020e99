//! AgentOps client SDK.
//!
//! A client-side telemetry pipeline for agent applications: sessions capture
//! discrete events (LLM calls, tool invocations, actions, API calls,
//! errors), batch them with bounded latency and bounded memory, and ship
//! them asynchronously to the collection backend. Graceful session end
//! drains every buffered record before returning.
//!
//! # Example
//!
//! ```ignore
//! use agentops::{Client, InitOptions};
//! use agentops::telemetry::{LlmEvent, SessionEndState, TelemetryEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     agentops::init_logging();
//!
//!     let client = Client::default();
//!     client.init(InitOptions {
//!         api_key: Some("sk-...".into()),
//!         tags: vec!["production".into()],
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     client.record(TelemetryEvent::Llm(LlmEvent {
//!         model: Some("gpt-4".into()),
//!         prompt_tokens: Some(150),
//!         completion_tokens: Some(50),
//!         cost: Some(0.006),
//!         ..Default::default()
//!     }));
//!
//!     client.end_session(SessionEndState::Success, Some("done".into())).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod host_env;
pub mod http;
pub mod logger;
pub mod telemetry;

// Re-export core types at crate root for convenience
pub use client::{Client, InitOptions};
pub use config::Configuration;
pub use http::{HttpError, HttpErrorDetail};
pub use logger::init_logging;

// Re-export telemetry types
pub use telemetry::{
    ActionEvent, ApiEvent, BatchConfig, BatchProcessor, ErrorEvent, EventBase, EventCounts,
    EventExporter, EventKind, EventRecord, ExportResult, HttpEventExporter, LlmEvent, Session,
    SessionEndState, SessionStartError, SessionSummary, TelemetryEvent, ToolEvent,
};
