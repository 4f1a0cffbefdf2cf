//! Remote agent transport - one request/response call to a remote agent.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything a single remote call carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCallRequest {
    pub agent_url: String,
    pub task_id: String,
    pub message_id: String,
    pub skill_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_part_template: Option<String>,
}

/// `{result}` or `{error}`, as a remote agent answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RemoteTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<RemotePart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<RemoteArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteArtifact {
    #[serde(default)]
    pub parts: Vec<RemotePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

impl RemoteTask {
    /// Task state; a missing status counts as completed.
    pub fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.state.as_str())
            .unwrap_or("completed")
    }

    /// First text part of the reply, looking at message parts before
    /// artifact parts. Empty when there is none.
    pub fn first_text(&self) -> &str {
        self.parts
            .iter()
            .chain(self.artifacts.iter().flat_map(|a| a.parts.iter()))
            .find_map(|p| p.text.as_deref())
            .unwrap_or("")
    }
}

/// The remote agent protocol seam.
#[async_trait]
pub trait RemoteAgentTransport: Send + Sync {
    async fn send_message(
        &self,
        request: RemoteCallRequest,
    ) -> std::result::Result<RemoteResponse, TransportError>;
}
