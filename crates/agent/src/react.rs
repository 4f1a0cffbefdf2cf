//! ReAct orchestrator - Reason → Act → Observe over remote agent skills.
//!
//! ```text
//! Init → Reasoning → { Acting → Reasoning | Answering | Failed } → Terminal
//! ```
//!
//! - **Init** builds the context: the system prompt (with the skills XML)
//!   and `<question>{prompt}</question>`.
//! - **Reasoning** requests one completion through the subscription
//!   manager and parses its tags. A thought is streamed; a non-empty final
//!   answer is streamed and completes the run; otherwise an action is
//!   required.
//! - **Acting** dispatches the action, streams a human-readable block, and
//!   appends `<observation>{iteration}. {text}</observation>` as a user
//!   message. The iteration counter starts at 1 and only advances here.
//! - **Failed** streams an error block and completes with `"finished"`.
//!
//! At most `max_iterations` Reasoning steps run. Running out of budget
//! without a final answer ends the run silently: no error block and no
//! completion callback.

use crate::dispatcher::CapabilityDispatcher;
use crate::markdown::{self, ERROR_PREFIX, FATAL_ERROR_PREFIX};
use crate::prompt::build_system_prompt;
use crate::sink::ChunkSink;
use crate::streamer::ChunkStreamer;
use crate::subscription::EventSubscriptionManager;
use crate::tags::{ActionCall, TagExtractor};
use hostagent_core::error::AgentError;
use hostagent_core::message::ConversationContext;
use hostagent_core::provider::{Provider, ProviderRequest};
use hostagent_core::registry::CapabilityRegistryEntry;
use hostagent_core::transport::RemoteAgentTransport;
use hostagent_providers::spawn_completion;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Completion value reported when a run ends without an answer.
pub const FINISHED: &str = "finished";

/// Default Reasoning budget per run.
pub const MAX_ITERATIONS: u32 = 8;

/// Channel model completions stream on.
pub const COMPLETION_CHANNEL: &str = "chat_stream_chunk";

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// A final answer was streamed and passed to `on_complete`.
    Answered { answer: String, iterations: u32 },
    /// An error block was streamed and `on_complete("finished")` called.
    Failed { error: AgentError },
    /// The Reasoning budget ran out; nothing further was emitted.
    Exhausted { iterations: u32 },
    /// Answered by a plain model completion outside the loop.
    Chatted,
    /// Refused before the loop started; a hint block was streamed.
    Rejected { reason: String },
}

/// The ReAct control loop.
pub struct ReactOrchestrator {
    provider: Arc<dyn Provider>,
    subscriptions: Arc<EventSubscriptionManager>,
    dispatcher: CapabilityDispatcher,
    streamer: Arc<ChunkStreamer>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    channel: String,
    completion_timeout: Duration,
}

impl ReactOrchestrator {
    /// Create an orchestrator with default settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        subscriptions: Arc<EventSubscriptionManager>,
        transport: Arc<dyn RemoteAgentTransport>,
    ) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            subscriptions,
            dispatcher: CapabilityDispatcher::new(transport),
            streamer: Arc::new(ChunkStreamer::new()),
            model,
            temperature: 0.3,
            max_tokens: None,
            max_iterations: MAX_ITERATIONS,
            channel: COMPLETION_CHANNEL.to_string(),
            completion_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Upper wall clock for one completion.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_streamer(mut self, streamer: Arc<ChunkStreamer>) -> Self {
        self.streamer = streamer;
        self
    }

    /// Run the loop for one user request over the enabled `agents`.
    ///
    /// Never returns an error: failures are rendered to `sink`.
    pub async fn run(
        &self,
        user_prompt: &str,
        agents: &[CapabilityRegistryEntry],
        sink: &dyn ChunkSink,
    ) -> RunOutcome {
        let system_prompt = match build_system_prompt(agents) {
            Ok(prompt) => prompt,
            Err(e) => return self.fail(e, sink).await,
        };

        let mut context = ConversationContext::new(system_prompt);
        context.push_user(format!("<question>{user_prompt}</question>"));

        info!(
            agents = agents.len(),
            max_iterations = self.max_iterations,
            "Starting ReAct run"
        );

        let mut iteration: u32 = 1;

        for step in 1..=self.max_iterations {
            debug!(step, iteration, messages = context.len(), "Reasoning");

            let raw = match self.reason(&context).await {
                Ok(raw) => raw,
                Err(e) => return self.fail(e, sink).await,
            };
            let parsed = TagExtractor::parse(&raw);

            if let Some(thought) = &parsed.thought {
                self.streamer
                    .stream(&markdown::thought_block(thought), sink)
                    .await;
            }

            if let Some(answer) = parsed.final_answer {
                self.streamer
                    .stream(&markdown::final_answer_block(&answer), sink)
                    .await;
                sink.on_complete(&answer);
                info!(iterations = iteration - 1, "ReAct run answered");
                return RunOutcome::Answered {
                    answer,
                    iterations: iteration - 1,
                };
            }

            let action = match parsed.action {
                Ok(Some(action)) => action,
                Ok(None) => {
                    let e = AgentError::ParseFailure(
                        "model response has neither <final_answer> nor <action>".into(),
                    );
                    return self.fail(e, sink).await;
                }
                Err(e) => return self.fail(e, sink).await,
            };

            if let Err(e) = self
                .act(&action, agents, iteration, &mut context, sink)
                .await
            {
                return self.fail(e, sink).await;
            }
            iteration += 1;
        }

        warn!(
            iterations = iteration - 1,
            "Iteration budget exhausted without a final answer"
        );
        RunOutcome::Exhausted {
            iterations: iteration - 1,
        }
    }

    /// One model completion over the current context.
    async fn reason(&self, context: &ConversationContext) -> Result<String, AgentError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: context.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let provider = self.provider.clone();
        let bus = self.subscriptions.bus().clone();
        let channel = self.channel.clone();
        // Listener deadline expires before the backend's.
        let backend_timeout = self.completion_timeout + Duration::from_secs(1);

        self.subscriptions
            .request_completion(
                &self.channel,
                Some(Uuid::new_v4().to_string()),
                None,
                self.completion_timeout,
                move || {
                    spawn_completion(provider, request, bus, channel, backend_timeout);
                },
            )
            .await
    }

    /// Dispatch one action and fold its observation into the context.
    async fn act(
        &self,
        action: &ActionCall,
        agents: &[CapabilityRegistryEntry],
        iteration: u32,
        context: &mut ConversationContext,
        sink: &dyn ChunkSink,
    ) -> Result<(), AgentError> {
        let task = self
            .dispatcher
            .dispatch(
                &action.agent_name,
                &action.skill_name,
                &action.message,
                agents,
            )
            .await?;

        self.streamer
            .stream(
                &markdown::invocation_block(&action.agent_name, &action.skill_name, &task),
                sink,
            )
            .await;

        let text = task.first_text();
        if let Some(block) = markdown::result_block(text) {
            self.streamer.stream(&block, sink).await;
        }

        // An empty reply still needs something the model can read
        let observed = if text.is_empty() {
            serde_json::to_string(&task).unwrap_or_default()
        } else {
            text.to_string()
        };
        context.push_user(markdown::observation_message(iteration, &observed));

        debug!(iteration, state = task.state(), "Observation recorded");
        Ok(())
    }

    async fn fail(&self, error: AgentError, sink: &dyn ChunkSink) -> RunOutcome {
        warn!(error = %error, "ReAct run failed");
        render_failure(&self.streamer, error, sink).await
    }
}

/// Stream an error block for `error` and complete with `"finished"`.
///
/// Registry errors get the catch-all heading; everything else the regular one.
pub(crate) async fn render_failure(
    streamer: &ChunkStreamer,
    error: AgentError,
    sink: &dyn ChunkSink,
) -> RunOutcome {
    let prefix = match error {
        AgentError::Registry(_) => FATAL_ERROR_PREFIX,
        _ => ERROR_PREFIX,
    };
    sink.on_chunk(prefix);
    streamer
        .stream(&markdown::extract_json_block(&error.to_string()), sink)
        .await;
    sink.on_complete(FINISHED);
    RunOutcome::Failed { error }
}
