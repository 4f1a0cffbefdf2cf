//! Error types for the hostagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all hostagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Remote agent transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- ReAct loop errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Invalid agent URL: {0}")]
    InvalidUrl(String),

    #[error("Remote agent request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Failed to decode remote agent response: {0}")]
    Decode(String),
}

/// Failures inside the ReAct loop.
///
/// Every variant is caught at the orchestrator boundary and rendered as an
/// error block; none of them escape to the caller's completion callback as
/// a thrown error.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Capability not found: {agent_name}")]
    CapabilityNotFound { agent_name: String },

    #[error("Skill not found: {skill_name} on agent {agent_name}")]
    SkillNotFound {
        agent_name: String,
        skill_name: String,
    },

    #[error("Failed to send task: {0}")]
    RemoteCallFailed(String),

    #[error("Streaming timeout after {timeout_secs}s on channel {channel}")]
    SubscriptionTimeout { channel: String, timeout_secs: u64 },

    #[error("{0}")]
    SubscriptionError(String),

    #[error("Invalid capability registry data: {0}")]
    Registry(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
