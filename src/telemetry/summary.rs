//! End-of-session summary rendering.
//!
//! Pure presentation: a colored analysis block emitted through the logging
//! sink once the final flush has settled. Never on a correctness path.

use colored::Colorize;

use super::models::EventCounts;
use super::session::SessionEndState;

/// Snapshot of a session for rendering.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_secs: Option<f64>,
    pub token_cost: f64,
    pub event_counts: EventCounts,
    pub end_state: SessionEndState,
    pub end_state_reason: Option<String>,
}

/// Render the colored analysis block.
pub fn render(summary: &SessionSummary) -> String {
    let mut lines = vec!["\nSession Analysis:".bold().to_string()];

    if let Some(duration) = summary.duration_secs {
        lines.push(format!("  Duration: {duration:.1}s").green().to_string());
    }
    lines.push(format!("  Cost: ${:.4}", summary.token_cost).blue().to_string());
    lines.push(
        format!("  LLM Calls: {}", summary.event_counts.llms)
            .magenta()
            .to_string(),
    );
    lines.push(
        format!("  Tool Calls: {}", summary.event_counts.tools)
            .cyan()
            .to_string(),
    );
    lines.push(
        format!("  Actions: {}", summary.event_counts.actions)
            .yellow()
            .to_string(),
    );
    lines.push(
        format!("  Errors: {}", summary.event_counts.errors)
            .red()
            .to_string(),
    );

    let state_line = format!("  End State: {}", summary.end_state);
    lines.push(match summary.end_state {
        SessionEndState::Success => state_line.green().to_string(),
        SessionEndState::Fail => state_line.red().to_string(),
        SessionEndState::Indeterminate => state_line.yellow().to_string(),
    });

    if let Some(ref reason) = summary.end_state_reason {
        lines.push(format!("  Reason: {reason}").dimmed().to_string());
    }

    lines.join("\n")
}
