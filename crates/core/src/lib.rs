//! # hostagent core
//!
//! Domain types, traits, and error definitions for the hostagent ReAct engine.
//! This crate has **no framework dependencies** - it defines the domain model
//! that the provider, transport, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`] - the model completion service
//! - [`RegistryProvider`] - the source of enabled remote agents
//! - [`RemoteAgentTransport`] - the remote agent protocol
//!
//! Implementations live in their respective crates, and tests swap in
//! scripted stand-ins.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod registry;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, ProviderError, Result, TransportError};
pub use event::{EventBus, StreamFragment};
pub use message::{ConversationContext, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use registry::{AgentCard, AgentSkill, CapabilityRegistryEntry, RegistryProvider, StaticRegistry};
pub use transport::{RemoteAgentTransport, RemoteCallRequest, RemoteResponse};
