//! Replay step source.
//!
//! Each recorded document is one step. Opening step `i` spawns a producer
//! that emits document `i` in fixed-size character chunks, followed by
//! [`StreamChunk::End`].

use super::relay::with_chunk_timeout;
use async_trait::async_trait;
use sgr_application::{ChunkStream, StepSource, StepSourceError};
use sgr_domain::StreamChunk;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Errors that can occur while loading a transcript
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcript {path} is empty")]
    Empty { path: PathBuf },

    #[error("No transcript documents given")]
    NoDocuments,
}

/// Pacing for replayed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Characters per chunk. A chunk never splits a character.
    pub chunk_size: usize,
    /// Pause before each chunk.
    pub chunk_delay: Duration,
    /// Longest wait for the next chunk before the step times out.
    pub chunk_timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            chunk_size: 24,
            chunk_delay: Duration::from_millis(15),
            chunk_timeout: Duration::from_secs(30),
        }
    }
}

impl ReplayOptions {
    // ==================== Builder Methods ====================

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }
}

/// Replays recorded step documents.
pub struct ReplaySource {
    documents: Vec<Arc<str>>,
    options: ReplayOptions,
}

impl ReplaySource {
    pub fn from_documents<I, S>(documents: I, options: ReplayOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|d| {
                    let d: String = d.into();
                    Arc::from(d)
                })
                .collect(),
            options,
        }
    }

    /// Load one document per file, in the given order.
    pub fn from_files<P: AsRef<Path>>(
        paths: &[P],
        options: ReplayOptions,
    ) -> Result<Self, ReplayError> {
        if paths.is_empty() {
            return Err(ReplayError::NoDocuments);
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let text = text.trim();
            if text.is_empty() {
                return Err(ReplayError::Empty {
                    path: path.to_path_buf(),
                });
            }
            debug!("Loaded transcript {} ({} chars)", path.display(), text.len());
            documents.push(text.to_string());
        }

        info!("Loaded {} transcript document(s)", documents.len());
        Ok(Self::from_documents(documents, options))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn options(&self) -> ReplayOptions {
        self.options
    }
}

/// Split text into pieces of at most `size` characters.
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl StepSource for ReplaySource {
    async fn open_step(&self, index: usize) -> Result<Option<ChunkStream>, StepSourceError> {
        let Some(document) = self.documents.get(index).cloned() else {
            return Ok(None);
        };

        let options = self.options;
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            for piece in split_chunks(&document, options.chunk_size) {
                if !options.chunk_delay.is_zero() {
                    tokio::time::sleep(options.chunk_delay).await;
                }
                if tx.send(StreamChunk::Delta(piece)).await.is_err() {
                    debug!("Replay of step {} stopped by receiver", index);
                    return;
                }
            }
            let _ = tx.send(StreamChunk::End).await;
        });

        Ok(Some(with_chunk_timeout(
            ChunkStream::new(rx),
            options.chunk_timeout,
        )))
    }
}
