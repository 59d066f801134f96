//! Chunk stream port
//!
//! Defines how the application layer receives streamed step text from the
//! model-output transport.

use async_trait::async_trait;
use sgr_domain::StreamChunk;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur while opening a step stream
#[derive(Error, Debug)]
pub enum StepSourceError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Handle for receiving the chunks of one streamed step.
///
/// Chunks arrive strictly in order from a single producer. Dropping the
/// handle tells the producer to stop.
pub struct ChunkStream {
    pub receiver: mpsc::Receiver<StreamChunk>,
}

impl ChunkStream {
    pub fn new(receiver: mpsc::Receiver<StreamChunk>) -> Self {
        Self { receiver }
    }

    /// A stream that yields the given text pieces followed by
    /// [`StreamChunk::End`].
    pub fn from_text<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks: Vec<StreamChunk> = pieces
            .into_iter()
            .map(|p| StreamChunk::Delta(p.into()))
            .collect();
        chunks.push(StreamChunk::End);
        Self::from_chunks(chunks)
    }

    /// A stream that yields exactly the given chunks, then closes.
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk, so this never fails
            let _ = tx.try_send(chunk);
        }
        Self::new(rx)
    }
}

/// Source of streamed steps, one stream per reasoning cycle.
///
/// Implementations (adapters) live in the infrastructure layer and bound
/// their own wait for each chunk, reporting [`StreamChunk::TimedOut`] when
/// it elapses.
#[async_trait]
pub trait StepSource: Send + Sync {
    /// Open the stream for step `index` (zero-based). `None` means the
    /// source has no more steps.
    async fn open_step(&self, index: usize) -> Result<Option<ChunkStream>, StepSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_text_appends_end() {
        let mut stream = ChunkStream::from_text(["{\"a\"", ":1}"]);
        assert_eq!(
            stream.receiver.recv().await,
            Some(StreamChunk::Delta("{\"a\"".to_string()))
        );
        assert_eq!(
            stream.receiver.recv().await,
            Some(StreamChunk::Delta(":1}".to_string()))
        );
        assert_eq!(stream.receiver.recv().await, Some(StreamChunk::End));
        assert_eq!(stream.receiver.recv().await, None);
    }

    #[tokio::test]
    async fn test_from_chunks_empty() {
        let mut stream = ChunkStream::from_chunks(vec![]);
        assert_eq!(stream.receiver.recv().await, None);
    }
}
