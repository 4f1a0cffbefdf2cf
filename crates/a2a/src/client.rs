//! JSON-RPC `message/send` client.

use crate::normalize_url;
use async_trait::async_trait;
use hostagent_core::error::TransportError;
use hostagent_core::transport::{RemoteAgentTransport, RemoteCallRequest, RemoteResponse};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Placeholder replaced by the message inside a data part template.
pub const USER_PROMPT_PLACEHOLDER: &str = "{{USER_PROMPT}}";

/// HTTP transport for A2A remote agents.
pub struct HttpA2aTransport {
    client: reqwest::Client,
}

impl HttpA2aTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpA2aTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'static str,
    params: SendParams<'a>,
}

#[derive(Debug, Serialize)]
struct SendParams<'a> {
    id: &'a str,
    message: OutgoingMessage<'a>,
    metadata: Value,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    message_id: &'a str,
    kind: &'static str,
    role: &'static str,
    parts: Vec<Value>,
}

/// Build the message parts for a call.
///
/// A template shaped `{"kind":"data","data":"..."}` yields a data part with
/// the placeholder substituted. A template that is not JSON is used as the
/// data payload directly. Anything else falls back to a text part.
fn message_parts(message: &str, template: Option<&str>) -> Vec<Value> {
    let text_part = || serde_json::json!({ "kind": "text", "text": message });

    let Some(template) = template.filter(|t| !t.trim().is_empty()) else {
        return vec![text_part()];
    };

    let data = match serde_json::from_str::<Value>(template) {
        Ok(obj) if obj.get("kind").and_then(Value::as_str) == Some("data") => obj
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or("")
            .replace(USER_PROMPT_PLACEHOLDER, message),
        Ok(_) => return vec![text_part()],
        Err(_) => template.replace(USER_PROMPT_PLACEHOLDER, message),
    };

    vec![serde_json::json!({ "kind": "data", "data": data })]
}

/// The JSON-RPC body for one `message/send` call.
pub fn build_request_body(request: &RemoteCallRequest) -> Value {
    let body = JsonRpcRequest {
        jsonrpc: "2.0",
        id: &request.message_id,
        method: "message/send",
        params: SendParams {
            id: &request.task_id,
            message: OutgoingMessage {
                message_id: &request.message_id,
                kind: "message",
                role: "user",
                parts: message_parts(&request.message, request.data_part_template.as_deref()),
            },
            metadata: Value::Object(serde_json::Map::new()),
        },
    };
    serde_json::to_value(body).unwrap_or(Value::Null)
}

#[async_trait]
impl RemoteAgentTransport for HttpA2aTransport {
    async fn send_message(
        &self,
        request: RemoteCallRequest,
    ) -> Result<RemoteResponse, TransportError> {
        if request.agent_url.trim().is_empty() {
            return Err(TransportError::InvalidUrl("agent URL is empty".into()));
        }

        let url = normalize_url(&request.agent_url);
        let body = build_request_body(&request);

        debug!(
            url = %url,
            skill_id = %request.skill_id,
            task_id = %request.task_id,
            "Sending A2A message"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-A2A-Skill-Id", &request.skill_id)
            .json(&body);

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "A2A request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
