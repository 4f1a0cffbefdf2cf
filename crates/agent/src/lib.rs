//! The host agent - a ReAct loop over remote agent skills.
//!
//! One user request flows through:
//!
//! 1. **Route** ([`HostAgent`]): no model, plain chat, or the loop
//! 2. **Reason**: one model completion, collected through the
//!    [`EventSubscriptionManager`] and split into tags by [`TagExtractor`]
//! 3. **Act**: `send_to_agent(...)` resolved and sent by the
//!    [`CapabilityDispatcher`]
//! 4. **Observe**: the reply is appended to the context and the loop repeats
//!
//! Everything the user sees is paced out through the [`ChunkStreamer`] to a
//! [`ChunkSink`]. The loop ends on a final answer, an error block, or after
//! the iteration budget runs out.

pub mod dispatcher;
pub mod facade;
pub mod markdown;
pub mod prompt;
pub mod react;
pub mod sink;
pub mod stream_event;
pub mod streamer;
pub mod subscription;
pub mod tags;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::CapabilityDispatcher;
pub use facade::HostAgent;
pub use react::{ReactOrchestrator, RunOutcome};
pub use sink::{ChunkSink, FnSink};
pub use stream_event::AgentStreamEvent;
pub use streamer::ChunkStreamer;
pub use subscription::{EventCallbacks, EventSubscriptionManager};
pub use tags::{ActionCall, ParsedResponse, TagExtractor};
