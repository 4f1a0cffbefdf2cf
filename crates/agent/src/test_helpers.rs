//! Shared test helpers for agent tests.

use crate::sink::ChunkSink;
use hostagent_core::error::{ProviderError, TransportError};
use hostagent_core::message::Message;
use hostagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use hostagent_core::registry::CapabilityRegistryEntry;
use hostagent_core::transport::{
    RemoteAgentTransport, RemoteCallRequest, RemotePart, RemoteResponse, RemoteTask, TaskStatus,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next entry in the queue and records
/// the messages it was given. Calls past the end of the script fail with
/// `ProviderError::NotConfigured`.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The same completion, `n` times.
    pub fn repeating(response: &str, n: usize) -> Self {
        Self::new(vec![response; n])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages sent on each call, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.messages.clone());
            requests.len() - 1
        };

        let responses = self.responses.lock().unwrap();
        let Some(response) = responses.get(call) else {
            return Err(ProviderError::NotConfigured(format!(
                "ScriptedProvider: no more responses (call #{call}, have {})",
                responses.len()
            )));
        };

        response.clone().map(|content| ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}

/// A transport that records every call and answers from a script.
pub struct MockTransport {
    response: Result<RemoteResponse, TransportError>,
    calls: Mutex<Vec<RemoteCallRequest>>,
}

impl MockTransport {
    /// Always answer with a completed task whose text is `text`.
    pub fn replying(text: &str) -> Self {
        Self::with_response(Ok(task_response("completed", text)))
    }

    pub fn with_response(response: Result<RemoteResponse, TransportError>) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RemoteCallRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RemoteAgentTransport for MockTransport {
    async fn send_message(
        &self,
        request: RemoteCallRequest,
    ) -> Result<RemoteResponse, TransportError> {
        self.calls.lock().unwrap().push(request);
        self.response.clone()
    }
}

/// A `{result: {status: {state}, parts: [{text}]}}` reply.
pub fn task_response(state: &str, text: &str) -> RemoteResponse {
    RemoteResponse {
        result: Some(RemoteTask {
            status: Some(TaskStatus {
                state: state.into(),
            }),
            parts: vec![RemotePart {
                text: Some(text.into()),
            }],
            ..RemoteTask::default()
        }),
        error: None,
    }
}

/// An enabled registry entry whose cached card lists `skills` as (id, name).
pub fn agent_entry(id: i64, name: &str, skills: &[(&str, &str)]) -> CapabilityRegistryEntry {
    let skills: Vec<serde_json::Value> = skills
        .iter()
        .map(|(id, skill)| {
            serde_json::json!({ "id": id, "name": skill, "description": format!("{skill} skill") })
        })
        .collect();
    let card = serde_json::json!({
        "name": format!("{name} card"),
        "url": format!("http://{name}.local:9000"),
        "skills": skills,
    });

    CapabilityRegistryEntry {
        id,
        name: name.into(),
        agent_card_url: format!("http://{name}.local:9000/.well-known/agent.json"),
        agent_card_json: Some(card.to_string()),
        enabled: true,
        custom_headers: HashMap::new(),
        data_part_template: None,
    }
}

/// Records everything a run emits.
#[derive(Default)]
pub struct RecordingSink {
    chunks: Mutex<Vec<String>>,
    completions: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }

    /// All chunks joined, sentinels included.
    pub fn text(&self) -> String {
        self.chunks.lock().unwrap().concat()
    }

    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

impl ChunkSink for RecordingSink {
    fn on_chunk(&self, chunk: &str) {
        self.chunks.lock().unwrap().push(chunk.to_string());
    }

    fn on_complete(&self, text: &str) {
        self.completions.lock().unwrap().push(text.to_string());
    }
}
