//! Backend completion emitter.
//!
//! Pumps one provider stream onto an [`EventBus`] channel: a
//! `streaming_started` status fragment, one content fragment per delta,
//! then exactly one terminal fragment (completed or failed).

use hostagent_core::event::{EventBus, StreamFragment};
use hostagent_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Upper wall clock for one completion.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(300);

/// Run one completion and publish it on `channel`.
///
/// Never returns an error: every failure becomes a terminal failed
/// fragment on the channel.
pub async fn emit_completion(
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    bus: Arc<EventBus>,
    channel: &str,
    timeout: Duration,
) {
    bus.emit(
        channel,
        StreamFragment::status("streaming_started", "Waiting for response..."),
    );

    let pump = pump_stream(provider.as_ref(), request, &bus, channel);
    let terminal = match tokio::time::timeout(timeout, pump).await {
        Ok(Ok(chunks)) => {
            debug!(channel, chunks, "Completion streamed");
            StreamFragment::completed()
        }
        Ok(Err(e)) => {
            warn!(channel, error = %e, "Completion failed");
            StreamFragment::failed(e)
        }
        Err(_) => {
            warn!(channel, timeout_secs = timeout.as_secs(), "Completion timed out");
            StreamFragment::failed(timeout_message(timeout))
        }
    };

    bus.emit(channel, terminal);
}

/// Spawn [`emit_completion`] as a background task.
pub fn spawn_completion(
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    bus: Arc<EventBus>,
    channel: impl Into<String>,
    timeout: Duration,
) -> JoinHandle<()> {
    let channel = channel.into();
    tokio::spawn(async move { emit_completion(provider, request, bus, &channel, timeout).await })
}

async fn pump_stream(
    provider: &dyn Provider,
    request: ProviderRequest,
    bus: &EventBus,
    channel: &str,
) -> Result<usize, String> {
    let mut rx = provider.stream(request).await.map_err(|e| e.to_string())?;
    let mut chunks = 0;

    while let Some(item) = rx.recv().await {
        let chunk = item.map_err(|e| e.to_string())?;
        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
            bus.emit(channel, StreamFragment::content(content));
            chunks += 1;
        }
        if chunk.done {
            break;
        }
    }

    Ok(chunks)
}

fn timeout_message(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("Streaming timeout after {} minutes", secs / 60)
    } else {
        format!("Streaming timeout after {secs} seconds")
    }
}
