//! Entry point for one user request.
//!
//! Picks the execution mode before any ReAct work happens:
//! no model configured, no enabled agents (plain chat), missing `@A2A`
//! command, or a full ReAct run.

use crate::markdown::{ERROR_PREFIX, json_block_with_prefix};
use crate::react::{FINISHED, ReactOrchestrator, RunOutcome, render_failure};
use crate::sink::ChunkSink;
use crate::streamer::{ChunkStreamer, UNIT_END};
use crate::subscription::{ChunkCallback, EventSubscriptionManager};
use hostagent_config::AppConfig;
use hostagent_core::event::EventBus;
use hostagent_core::message::Message;
use hostagent_core::provider::{Provider, ProviderRequest};
use hostagent_core::registry::RegistryProvider;
use hostagent_core::transport::RemoteAgentTransport;
use hostagent_providers::{OpenAiCompatProvider, spawn_completion};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Prompt markers that opt a request into the ReAct loop.
pub const A2A_COMMANDS: [&str; 2] = ["@/message/send", "@/message/stream"];

pub const NO_MODEL_MESSAGE: &str = "No model is configured. Set a model API key in the model configuration first.";

pub const MISSING_COMMAND_MESSAGE: &str = "Use the @A2A command to get started. If you'd prefer not to use A2A, you can disable A2A Servers anytime.";

/// Body of the error block for requests refused before the loop.
#[derive(Serialize)]
struct Rejection<'a> {
    userprompt: &'a str,
    message: &'a str,
}

/// Pause between a plain chat reply and its end sentinel.
const SIMPLE_CHAT_TAIL: Duration = Duration::from_millis(300);

/// The host agent: routes a request to plain chat or the ReAct loop.
pub struct HostAgent {
    provider: Option<Arc<dyn Provider>>,
    registry: Arc<dyn RegistryProvider>,
    transport: Arc<dyn RemoteAgentTransport>,
    subscriptions: Arc<EventSubscriptionManager>,
    streamer: Arc<ChunkStreamer>,
    model: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    channel: String,
    completion_timeout: Duration,
}

impl HostAgent {
    pub fn new(
        provider: Option<Arc<dyn Provider>>,
        registry: Arc<dyn RegistryProvider>,
        transport: Arc<dyn RemoteAgentTransport>,
    ) -> Self {
        Self {
            provider,
            registry,
            transport,
            subscriptions: Arc::new(EventSubscriptionManager::new(Arc::new(EventBus::default()))),
            streamer: Arc::new(ChunkStreamer::new()),
            model: None,
            temperature: 0.3,
            max_tokens: None,
            max_iterations: crate::react::MAX_ITERATIONS,
            channel: crate::react::COMPLETION_CHANNEL.to_string(),
            completion_timeout: Duration::from_secs(300),
        }
    }

    /// Build from configuration: model, loop settings, pacing and the
    /// `[[agents]]` registry. Without an API key no provider is attached.
    pub fn from_config(config: &AppConfig, transport: Arc<dyn RemoteAgentTransport>) -> Self {
        let provider = OpenAiCompatProvider::from_config(&config.model)
            .map(|p| Arc::new(p) as Arc<dyn Provider>);

        let mut agent = Self::new(provider, Arc::new(config.registry()), transport)
            .with_streamer(Arc::new(ChunkStreamer::from_config(&config.streaming)))
            .with_model(config.model.model.clone())
            .with_temperature(config.model.temperature)
            .with_max_iterations(config.react.max_iterations)
            .with_completion_timeout(Duration::from_secs(config.react.completion_timeout_secs));
        agent.max_tokens = Some(config.model.max_tokens);
        agent.channel = config.react.channel.clone();
        agent
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_streamer(mut self, streamer: Arc<ChunkStreamer>) -> Self {
        self.streamer = streamer;
        self
    }

    /// Share a subscription manager (and its bus) with other components.
    pub fn with_subscriptions(mut self, subscriptions: Arc<EventSubscriptionManager>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Handle one user request. All output, failures included, goes to `sink`.
    pub async fn execute(&self, user_prompt: &str, sink: Arc<dyn ChunkSink>) -> RunOutcome {
        let Some(provider) = self.provider.clone() else {
            warn!("No model provider configured");
            return self.reject(user_prompt, NO_MODEL_MESSAGE, sink.as_ref()).await;
        };

        let agents = match self.registry.enabled_agents().await {
            Ok(agents) => agents,
            Err(e) => return render_failure(&self.streamer, e, sink.as_ref()).await,
        };

        if agents.is_empty() {
            info!("No remote agents enabled, answering as plain chat");
            return self.simple_chat(provider, user_prompt, sink).await;
        }

        if !A2A_COMMANDS.iter().any(|c| user_prompt.contains(c)) {
            return self
                .reject(user_prompt, MISSING_COMMAND_MESSAGE, sink.as_ref())
                .await;
        }

        let mut orchestrator =
            ReactOrchestrator::new(provider, self.subscriptions.clone(), self.transport.clone())
                .with_temperature(self.temperature)
                .with_max_iterations(self.max_iterations)
                .with_channel(self.channel.clone())
                .with_completion_timeout(self.completion_timeout)
                .with_streamer(self.streamer.clone());
        if let Some(model) = &self.model {
            orchestrator = orchestrator.with_model(model.clone());
        }
        if let Some(max) = self.max_tokens {
            orchestrator = orchestrator.with_max_tokens(max);
        }

        orchestrator.run(user_prompt, &agents, sink.as_ref()).await
    }

    /// One completion over `[user]`, forwarded to the sink as it arrives.
    async fn simple_chat(
        &self,
        provider: Arc<dyn Provider>,
        user_prompt: &str,
        sink: Arc<dyn ChunkSink>,
    ) -> RunOutcome {
        let request = ProviderRequest {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            messages: vec![Message::user(user_prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let forward: ChunkCallback = {
            let sink = sink.clone();
            Arc::new(move |chunk: &str| sink.on_chunk(chunk))
        };
        let bus = self.subscriptions.bus().clone();
        let channel = self.channel.clone();
        let timeout = self.completion_timeout;

        let result = self
            .subscriptions
            .request_completion(
                &self.channel,
                Some(Uuid::new_v4().to_string()),
                Some(forward),
                self.completion_timeout,
                move || {
                    spawn_completion(provider, request, bus, channel, timeout);
                },
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Plain chat failed");
            return render_failure(&self.streamer, e, sink.as_ref()).await;
        }

        tokio::time::sleep(SIMPLE_CHAT_TAIL).await;
        sink.on_chunk(UNIT_END);
        sink.on_complete(FINISHED);
        RunOutcome::Chatted
    }

    /// Stream `{userprompt, message}` as an error block and finish.
    async fn reject(&self, user_prompt: &str, message: &str, sink: &dyn ChunkSink) -> RunOutcome {
        let block = json_block_with_prefix(
            ERROR_PREFIX,
            &Rejection {
                userprompt: user_prompt,
                message,
            },
        );
        self.streamer.stream(&block, sink).await;
        sink.on_complete(FINISHED);
        RunOutcome::Rejected {
            reason: message.to_string(),
        }
    }
}
