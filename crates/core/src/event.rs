//! Channel-keyed event bus - the backend-to-core streaming pathway.
//!
//! A backend task (the model emitter) publishes [`StreamFragment`]s on a
//! logical channel name such as `"chat_stream_chunk"`. Listeners attach per
//! channel. Fragments published while nobody listens are dropped, exactly
//! like a fire-and-forget UI event.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// One fragment pushed on a streaming channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFragment {
    /// Content delta (may be empty for status and terminal fragments)
    #[serde(default)]
    pub content: String,

    /// Terminal marker: the stream is over after this fragment
    #[serde(default)]
    pub is_complete: bool,

    /// Set on a terminal fragment when the stream failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Status code (streaming_started, progress, completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Human-readable status message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StreamFragment {
    /// A content delta.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// A non-terminal status notice.
    pub fn status(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The terminal success fragment.
    pub fn completed() -> Self {
        Self {
            is_complete: true,
            status: Some("completed".into()),
            message: Some("Streaming completed successfully".into()),
            ..Self::default()
        }
    }

    /// The terminal failure fragment.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_complete: true,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A broadcast-based event bus keyed by channel name.
///
/// Uses one `tokio::sync::broadcast` sender per channel, created lazily on
/// first emit or listen.
pub struct EventBus {
    channels: Mutex<HashMap<String, broadcast::Sender<Arc<StreamFragment>>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus whose channels buffer `capacity` fragments.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Arc<StreamFragment>> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish a fragment on `channel`. Returns how many listeners received it.
    pub fn emit(&self, channel: &str, fragment: StreamFragment) -> usize {
        match self.sender(channel).send(Arc::new(fragment)) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!(channel, "Fragment dropped, no listeners");
                0
            }
        }
    }

    /// Attach a listener to `channel`. Dropping the receiver detaches it.
    pub fn listen(&self, channel: &str) -> broadcast::Receiver<Arc<StreamFragment>> {
        self.sender(channel).subscribe()
    }

    /// Number of listeners currently attached to `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .get(channel)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
