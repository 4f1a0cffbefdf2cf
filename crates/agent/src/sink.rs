//! Output surface of a run: ordered chunks, then one completion.

use crate::stream_event::AgentStreamEvent;
use tokio::sync::mpsc;

/// Receives the user-visible output of one run.
///
/// `on_chunk` is called once per emitted fragment, in order. `on_complete`
/// is called at most once, last.
pub trait ChunkSink: Send + Sync {
    fn on_chunk(&self, chunk: &str);
    fn on_complete(&self, text: &str);
}

/// A sink built from a pair of closures.
pub struct FnSink<C, D> {
    chunk: C,
    complete: D,
}

impl<C, D> FnSink<C, D>
where
    C: Fn(&str) + Send + Sync,
    D: Fn(&str) + Send + Sync,
{
    pub fn new(chunk: C, complete: D) -> Self {
        Self { chunk, complete }
    }
}

impl<C, D> ChunkSink for FnSink<C, D>
where
    C: Fn(&str) + Send + Sync,
    D: Fn(&str) + Send + Sync,
{
    fn on_chunk(&self, chunk: &str) {
        (self.chunk)(chunk)
    }

    fn on_complete(&self, text: &str) {
        (self.complete)(text)
    }
}

/// Forward output as [`AgentStreamEvent`]s. A dropped receiver is ignored.
impl ChunkSink for mpsc::UnboundedSender<AgentStreamEvent> {
    fn on_chunk(&self, chunk: &str) {
        let _ = self.send(AgentStreamEvent::Chunk {
            content: chunk.to_string(),
        });
    }

    fn on_complete(&self, text: &str) {
        let _ = self.send(AgentStreamEvent::Complete {
            content: text.to_string(),
        });
    }
}
