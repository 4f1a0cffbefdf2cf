//! Model provider implementations for hostagent.
//!
//! All providers implement the `hostagent_core::Provider` trait. The
//! emitter turns a provider stream into fragments on an event bus channel.

pub mod emitter;
pub mod openai_compat;

pub use emitter::{DEFAULT_COMPLETION_TIMEOUT, emit_completion, spawn_completion};
pub use openai_compat::OpenAiCompatProvider;
