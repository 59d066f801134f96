//! Chunked model output and streaming statistics.

use serde::Serialize;
use std::time::Duration;

/// One item delivered by the upstream model-output transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Next piece of text, in order.
    Delta(String),
    /// The producer believes the document is complete.
    End,
    /// The transport failed.
    Error(String),
    /// The transport gave up waiting for the next chunk.
    TimedOut,
}

impl StreamChunk {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamChunk::Delta(_))
    }
}

/// Throughput of one streamed step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetrics {
    pub chunks: usize,
    pub chars: usize,
    pub elapsed: Duration,
}

impl StreamMetrics {
    pub fn record(&mut self, chunk: &str, elapsed: Duration) {
        self.chunks += 1;
        self.chars += chunk.chars().count();
        self.elapsed = elapsed;
    }

    pub fn chars_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.chars as f64 / secs
        } else {
            0.0
        }
    }
}
