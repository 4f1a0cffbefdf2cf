//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is the channel form of a run's output, for consumers
//! that prefer a receiver over callbacks (the CLI).

use serde::{Deserialize, Serialize};

/// Events emitted by a run.
///
/// - `chunk`: one output fragment (`"\r"` ends a text unit)
/// - `complete`: the run is over; carries the final answer or `"finished"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// One output fragment.
    Chunk { content: String },

    /// Terminal completion value.
    Complete { content: String },
}

impl AgentStreamEvent {
    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "complete",
        }
    }

    /// True for the `"\r"` end-of-unit sentinel.
    pub fn is_unit_end(&self) -> bool {
        matches!(self, Self::Chunk { content } if content == "\r")
    }
}
