//! Per-channel event subscriptions over the [`EventBus`].
//!
//! The manager owns at most one live listener per channel. A second
//! `subscribe` on an active channel only swaps the callback set and request
//! id; the listener, and the content accumulated so far, stay in place.
//!
//! Fragment handling, in order:
//! - terminal fragment: `on_error(error)` or `on_complete(accumulated)`,
//!   then the channel is torn down and can be subscribed again
//! - status fragment (status and message both set): `on_status`
//! - content fragment: append to the accumulator, `on_chunk(fragment)`
//!
//! Callbacks always run outside the state lock, so they may call back
//! into the manager.

use hostagent_core::error::AgentError;
use hostagent_core::event::{EventBus, StreamFragment};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type ChunkCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type CompleteCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// The callback set attached to a channel. Every callback is optional.
#[derive(Clone, Default)]
pub struct EventCallbacks {
    on_chunk: Option<ChunkCallback>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
    on_status: Option<StatusCallback>,
}

impl EventCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_chunk(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_chunk = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_status(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for EventCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCallbacks")
            .field("on_chunk", &self.on_chunk.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}

/// Live state of one channel.
struct SubscriptionState {
    /// Distinguishes this listener from an earlier one on the same channel
    generation: u64,
    accumulated: String,
    callbacks: EventCallbacks,
    request_id: Option<String>,
    task: JoinHandle<()>,
}

type Channels = Arc<Mutex<HashMap<String, SubscriptionState>>>;

fn lock(channels: &Channels) -> MutexGuard<'_, HashMap<String, SubscriptionState>> {
    channels.lock().unwrap_or_else(|e| e.into_inner())
}

/// Single-flight subscription registry keyed by channel name.
///
/// One instance is shared (behind an `Arc`) by everything in an application
/// session that awaits completions on the same bus.
pub struct EventSubscriptionManager {
    bus: Arc<EventBus>,
    channels: Channels,
    next_generation: AtomicU64,
}

impl EventSubscriptionManager {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            channels: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// The bus this manager listens on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Attach `callbacks` to `channel`.
    ///
    /// If the channel is already active its callbacks and request id are
    /// replaced and no new listener is created. Must be called from within
    /// a Tokio runtime.
    pub fn subscribe(&self, channel: &str, callbacks: EventCallbacks, request_id: Option<String>) {
        let mut channels = lock(&self.channels);

        if let Some(state) = channels.get_mut(channel) {
            state.callbacks = callbacks;
            state.request_id = request_id;
            debug!(channel, "Subscription already active, callbacks updated");
            return;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        // Listen before spawning so no fragment published after this call is missed
        let rx = self.bus.listen(channel);
        let task = tokio::spawn(listen_loop(
            self.channels.clone(),
            channel.to_string(),
            generation,
            rx,
        ));

        channels.insert(
            channel.to_string(),
            SubscriptionState {
                generation,
                accumulated: String::new(),
                callbacks,
                request_id,
                task,
            },
        );
        debug!(channel, generation, "Subscription started");
    }

    /// Replace the callbacks of an active channel. False when not active.
    pub fn update_callbacks(&self, channel: &str, callbacks: EventCallbacks) -> bool {
        match lock(&self.channels).get_mut(channel) {
            Some(state) => {
                state.callbacks = callbacks;
                true
            }
            None => {
                warn!(channel, "No active subscription to update");
                false
            }
        }
    }

    /// Stop listening on `channel`. No-op when not active.
    pub fn unsubscribe(&self, channel: &str) {
        if let Some(state) = lock(&self.channels).remove(channel) {
            state.task.abort();
            debug!(channel, "Subscription stopped");
        }
    }

    /// Stop every active subscription.
    pub fn unsubscribe_all(&self) {
        let drained: Vec<(String, SubscriptionState)> = lock(&self.channels).drain().collect();
        let count = drained.len();
        for (_, state) in drained {
            state.task.abort();
        }
        if count > 0 {
            info!(count, "All subscriptions stopped");
        }
    }

    pub fn is_active(&self, channel: &str) -> bool {
        lock(&self.channels).contains_key(channel)
    }

    /// Content accumulated so far on an active channel.
    pub fn accumulated(&self, channel: &str) -> Option<String> {
        lock(&self.channels)
            .get(channel)
            .map(|s| s.accumulated.clone())
    }

    pub fn request_id(&self, channel: &str) -> Option<String> {
        lock(&self.channels)
            .get(channel)
            .and_then(|s| s.request_id.clone())
    }

    /// Names of the active channels, sorted.
    pub fn active_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.channels).keys().cloned().collect();
        names.sort();
        names
    }

    /// Subscribe, run `start`, and wait for the terminal fragment.
    ///
    /// `start` is invoked after the listener is attached; it is expected to
    /// kick off whatever publishes on the channel. Resolves with the full
    /// accumulated content, or fails with `SubscriptionError` (terminal
    /// error fragment) or `SubscriptionTimeout` (nothing terminal within
    /// `timeout`; the channel is torn down).
    pub async fn request_completion<F>(
        &self,
        channel: &str,
        request_id: Option<String>,
        on_chunk: Option<ChunkCallback>,
        timeout: Duration,
        start: F,
    ) -> Result<String, AgentError>
    where
        F: FnOnce(),
    {
        let (tx, rx) = oneshot::channel::<Result<String, String>>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let resolve = {
            let tx = tx.clone();
            move |result: Result<String, String>| {
                let sender = tx.lock().unwrap_or_else(|e| e.into_inner()).take();
                if let Some(sender) = sender {
                    let _ = sender.send(result);
                }
            }
        };
        let reject = resolve.clone();

        let mut callbacks = EventCallbacks::new()
            .on_complete(move |content| resolve(Ok(content)))
            .on_error(move |error| reject(Err(error)))
            .on_status(|status, message| debug!(status, message, "Streaming status"));
        callbacks.on_chunk = on_chunk;

        self.subscribe(channel, callbacks, request_id);
        start();

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(content))) => {
                debug!(channel, len = content.len(), "Completion received");
                Ok(content)
            }
            Ok(Ok(Err(error))) => Err(AgentError::SubscriptionError(error)),
            Ok(Err(_)) => Err(AgentError::SubscriptionError(format!(
                "subscription on {channel} closed before completion"
            ))),
            Err(_) => {
                warn!(channel, timeout_secs = timeout.as_secs(), "Completion timed out");
                self.unsubscribe(channel);
                Err(AgentError::SubscriptionTimeout {
                    channel: channel.to_string(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }
}

impl Drop for EventSubscriptionManager {
    fn drop(&mut self) {
        for (_, state) in lock(&self.channels).drain() {
            state.task.abort();
        }
    }
}

/// What the listener must do after updating state under the lock.
enum Delivery {
    Progress {
        callbacks: EventCallbacks,
        status: Option<(String, String)>,
        content: Option<String>,
    },
    Complete {
        callbacks: EventCallbacks,
        result: Result<String, String>,
    },
}

async fn listen_loop(
    channels: Channels,
    channel: String,
    generation: u64,
    mut rx: broadcast::Receiver<Arc<StreamFragment>>,
) {
    loop {
        let fragment = match rx.recv().await {
            Ok(fragment) => fragment,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Dropped content cannot be recovered; fail the stream
                warn!(channel = %channel, skipped, "Listener lagged behind");
                Arc::new(StreamFragment::failed(format!(
                    "stream lagged, {skipped} fragments dropped"
                )))
            }
            Err(broadcast::error::RecvError::Closed) => {
                Arc::new(StreamFragment::failed("event channel closed"))
            }
        };

        let delivery = {
            let mut guard = lock(&channels);
            let Some(state) = guard.get_mut(&channel) else {
                return;
            };
            if state.generation != generation {
                return;
            }

            if fragment.is_complete {
                let Some(state) = guard.remove(&channel) else {
                    return;
                };
                let result = match &fragment.error {
                    Some(error) => Err(error.clone()),
                    None => Ok(state.accumulated),
                };
                Delivery::Complete {
                    callbacks: state.callbacks,
                    result,
                }
            } else {
                let status = match (&fragment.status, &fragment.message) {
                    (Some(s), Some(m)) => Some((s.clone(), m.clone())),
                    _ => None,
                };
                let content = if fragment.content.is_empty() {
                    None
                } else {
                    state.accumulated.push_str(&fragment.content);
                    Some(fragment.content.clone())
                };
                Delivery::Progress {
                    callbacks: state.callbacks.clone(),
                    status,
                    content,
                }
            }
        };

        match delivery {
            Delivery::Progress {
                callbacks,
                status,
                content,
            } => {
                if let (Some((s, m)), Some(f)) = (status, &callbacks.on_status) {
                    f(&s, &m);
                }
                if let (Some(c), Some(f)) = (content, &callbacks.on_chunk) {
                    f(&c);
                }
            }
            Delivery::Complete { callbacks, result } => {
                match result {
                    Ok(content) => {
                        debug!(channel = %channel, len = content.len(), "Stream completed");
                        if let Some(f) = &callbacks.on_complete {
                            f(content);
                        }
                    }
                    Err(error) => {
                        warn!(channel = %channel, error = %error, "Stream failed");
                        if let Some(f) = &callbacks.on_error {
                            f(error);
                        }
                    }
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn manager() -> (Arc<EventBus>, EventSubscriptionManager) {
        let bus = Arc::new(EventBus::new(64));
        let manager = EventSubscriptionManager::new(bus.clone());
        (bus, manager)
    }

    /// Let spawned listener tasks drain the bus.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, EventCallbacks) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        let callbacks = EventCallbacks::new()
            .on_chunk(move |s| a.lock().unwrap().push(format!("chunk:{s}")))
            .on_complete(move |s| b.lock().unwrap().push(format!("complete:{s}")))
            .on_error(move |s| c.lock().unwrap().push(format!("error:{s}")))
            .on_status(move |s, m| d.lock().unwrap().push(format!("status:{s}:{m}")));
        (log, callbacks)
    }

    #[tokio::test]
    async fn accumulates_and_completes_with_full_content() {
        let (bus, manager) = manager();
        let (log, callbacks) = recorder();
        manager.subscribe("chat", callbacks, Some("r1".into()));
        assert_eq!(manager.request_id("chat").as_deref(), Some("r1"));

        bus.emit("chat", StreamFragment::status("streaming_started", "Waiting for response..."));
        bus.emit("chat", StreamFragment::content("Hel"));
        bus.emit("chat", StreamFragment::content("lo"));
        settle().await;
        assert_eq!(manager.accumulated("chat").as_deref(), Some("Hello"));

        bus.emit("chat", StreamFragment::completed());
        settle().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "status:streaming_started:Waiting for response...",
                "chunk:Hel",
                "chunk:lo",
                "complete:Hello",
            ]
        );
        assert!(!manager.is_active("chat"));
        assert_eq!(bus.listener_count("chat"), 0);
    }

    #[tokio::test]
    async fn terminal_error_goes_to_on_error() {
        let (bus, manager) = manager();
        let (log, callbacks) = recorder();
        manager.subscribe("chat", callbacks, None);

        bus.emit("chat", StreamFragment::content("partial"));
        bus.emit("chat", StreamFragment::failed("upstream 500"));
        settle().await;

        let log = log.lock().unwrap();
        assert_eq!(log.last().unwrap(), "error:upstream 500");
        assert!(!log.iter().any(|l| l.starts_with("complete:")));
        assert!(!manager.is_active("chat"));
    }

    #[tokio::test]
    async fn second_subscribe_reuses_listener_and_takes_over_callbacks() {
        let (bus, manager) = manager();
        let (first, first_callbacks) = recorder();
        let (second, second_callbacks) = recorder();

        manager.subscribe("chat", first_callbacks, Some("a".into()));
        manager.subscribe("chat", second_callbacks, Some("b".into()));
        assert_eq!(bus.listener_count("chat"), 1);
        assert_eq!(manager.request_id("chat").as_deref(), Some("b"));

        bus.emit("chat", StreamFragment::content("x"));
        bus.emit("chat", StreamFragment::completed());
        settle().await;

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), vec!["chunk:x", "complete:x"]);
    }

    #[tokio::test]
    async fn channel_is_reusable_after_completion() {
        let (bus, manager) = manager();
        let completions = Arc::new(AtomicUsize::new(0));

        for round in 0..2 {
            let c = completions.clone();
            manager.subscribe(
                "chat",
                EventCallbacks::new().on_complete(move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                }),
                None,
            );
            bus.emit("chat", StreamFragment::content(format!("round {round}")));
            bus.emit("chat", StreamFragment::completed());
            settle().await;
        }

        assert_eq!(completions.load(Ordering::SeqCst), 2);
        assert_eq!(bus.listener_count("chat"), 0);
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let (bus, manager) = manager();
        let (chat, chat_callbacks) = recorder();
        let (a2a, a2a_callbacks) = recorder();
        manager.subscribe("chat_stream_chunk", chat_callbacks, None);
        manager.subscribe("a2a_stream_chunk", a2a_callbacks, None);
        assert_eq!(
            manager.active_channels(),
            vec!["a2a_stream_chunk", "chat_stream_chunk"]
        );

        bus.emit("chat_stream_chunk", StreamFragment::content("c"));
        bus.emit("chat_stream_chunk", StreamFragment::completed());
        settle().await;

        assert_eq!(*chat.lock().unwrap(), vec!["chunk:c", "complete:c"]);
        assert!(a2a.lock().unwrap().is_empty());
        assert!(manager.is_active("a2a_stream_chunk"));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_detaches() {
        let (bus, manager) = manager();
        let (log, callbacks) = recorder();
        manager.subscribe("chat", callbacks, None);
        assert_eq!(bus.listener_count("chat"), 1);

        manager.unsubscribe("chat");
        manager.unsubscribe("chat");
        settle().await;
        assert!(!manager.is_active("chat"));
        assert_eq!(bus.listener_count("chat"), 0);

        bus.emit("chat", StreamFragment::completed());
        settle().await;
        assert!(log.lock().unwrap().is_empty());

        manager.unsubscribe_all();
        manager.unsubscribe("never-subscribed");
    }

    #[tokio::test]
    async fn unsubscribe_all_stops_every_channel() {
        let (_bus, manager) = manager();
        manager.subscribe("a", EventCallbacks::new(), None);
        manager.subscribe("b", EventCallbacks::new(), None);
        manager.unsubscribe_all();
        assert!(manager.active_channels().is_empty());
    }

    #[tokio::test]
    async fn update_callbacks_requires_active_channel() {
        let (bus, manager) = manager();
        assert!(!manager.update_callbacks("chat", EventCallbacks::new()));

        manager.subscribe("chat", EventCallbacks::new(), None);
        let (log, callbacks) = recorder();
        assert!(manager.update_callbacks("chat", callbacks));

        bus.emit("chat", StreamFragment::completed());
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["complete:"]);
    }

    #[tokio::test]
    async fn status_without_message_is_ignored() {
        let (bus, manager) = manager();
        let (log, callbacks) = recorder();
        manager.subscribe("chat", callbacks, None);

        bus.emit(
            "chat",
            StreamFragment {
                status: Some("progress".into()),
                ..StreamFragment::default()
            },
        );
        bus.emit("chat", StreamFragment::completed());
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["complete:"]);
    }

    #[tokio::test]
    async fn request_completion_resolves_with_accumulated_content() {
        let (bus, manager) = manager();
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink = chunks.clone();
        let on_chunk: ChunkCallback = Arc::new(move |c: &str| sink.lock().unwrap().push(c.to_string()));

        let publisher = bus.clone();
        let content = manager
            .request_completion("chat", None, Some(on_chunk), Duration::from_secs(5), move || {
                tokio::spawn(async move {
                    publisher.emit("chat", StreamFragment::content("4"));
                    publisher.emit("chat", StreamFragment::content("2"));
                    publisher.emit("chat", StreamFragment::completed());
                });
            })
            .await
            .unwrap();

        assert_eq!(content, "42");
        assert_eq!(*chunks.lock().unwrap(), vec!["4", "2"]);
    }

    #[tokio::test]
    async fn request_completion_surfaces_stream_error() {
        let (bus, manager) = manager();
        let publisher = bus.clone();
        let err = manager
            .request_completion("chat", None, None, Duration::from_secs(5), move || {
                publisher.emit("chat", StreamFragment::failed("Invalid API key"));
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SubscriptionError(m) if m == "Invalid API key"));
    }

    #[tokio::test(start_paused = true)]
    async fn request_completion_times_out_and_tears_down() {
        let (bus, manager) = manager();
        let err = manager
            .request_completion("chat", None, None, Duration::from_secs(300), || {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::SubscriptionTimeout { timeout_secs: 300, .. }
        ));
        assert!(!manager.is_active("chat"));
        settle().await;
        assert_eq!(bus.listener_count("chat"), 0);
    }
}
