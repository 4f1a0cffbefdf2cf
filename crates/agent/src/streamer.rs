//! Paced chunk emission.
//!
//! Text is released in pseudo-random slices of 5–10 characters with a
//! 100–200 ms pause between slices, then a 200 ms tail pause and a single
//! `"\r"` sentinel marking the end of the text unit. Real model output and
//! synthetic narration go through the same cadence.

use crate::sink::ChunkSink;
use hostagent_config::StreamingConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// End-of-unit sentinel chunk.
pub const UNIT_END: &str = "\r";

/// Emits a text buffer as a sequence of small, delayed chunks.
pub struct ChunkStreamer {
    min_chunk_chars: usize,
    max_chunk_chars: usize,
    min_delay_ms: u64,
    max_delay_ms: u64,
    tail_delay_ms: u64,
    rng: Mutex<StdRng>,
}

impl ChunkStreamer {
    /// Default pacing with an entropy-seeded random source.
    pub fn new() -> Self {
        Self::from_config(&StreamingConfig::default())
    }

    pub fn from_config(config: &StreamingConfig) -> Self {
        // gen_range needs non-empty ranges
        let min_chunk_chars = config.min_chunk_chars.max(1);
        Self {
            min_chunk_chars,
            max_chunk_chars: config.max_chunk_chars.max(min_chunk_chars),
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms.max(config.min_delay_ms),
            tail_delay_ms: config.tail_delay_ms,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Default chunk sizes with every delay set to zero.
    pub fn instant() -> Self {
        Self::from_config(&StreamingConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            tail_delay_ms: 0,
            ..StreamingConfig::default()
        })
    }

    /// Replace the random source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Deterministic random source for reproducible chunk boundaries.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// Draw the next chunk size and inter-chunk delay.
    fn draw(&self) -> (usize, Duration) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let size = rng.gen_range(self.min_chunk_chars..=self.max_chunk_chars);
        let delay = rng.gen_range(self.min_delay_ms..=self.max_delay_ms);
        (size, Duration::from_millis(delay))
    }

    /// Emit `text` to `sink` in paced chunks, then the `"\r"` sentinel.
    ///
    /// Chunks are cut on character boundaries, never inside a code point.
    pub async fn stream(&self, text: &str, sink: &dyn ChunkSink) {
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let (size, delay) = self.draw();
            let end = (i + size).min(chars.len());
            let chunk: String = chars[i..end].iter().collect();
            sink.on_chunk(&chunk);

            // No pause after the last chunk
            if end < chars.len() {
                pause(delay).await;
            }
            i = end;
        }

        pause(Duration::from_millis(self.tail_delay_ms)).await;
        sink.on_chunk(UNIT_END);
    }
}

impl Default for ChunkStreamer {
    fn default() -> Self {
        Self::new()
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
