//! Per-chunk timeout relay.

use sgr_application::ChunkStream;
use sgr_domain::StreamChunk;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Wrap a stream so that waiting longer than `timeout` for any chunk yields
/// [`StreamChunk::TimedOut`] and ends the stream.
///
/// The relay stops after the first terminal chunk. Dropping the returned
/// stream stops the relay, which in turn drops the inner stream.
pub fn with_chunk_timeout(stream: ChunkStream, timeout: Duration) -> ChunkStream {
    let (tx, rx) = mpsc::channel(16);
    let mut inner = stream.receiver;

    tokio::spawn(async move {
        loop {
            let chunk = match tokio::time::timeout(timeout, inner.recv()).await {
                Ok(Some(chunk)) => chunk,
                // Producer closed the channel; closing ours passes that on
                Ok(None) => break,
                Err(_) => {
                    warn!("No chunk within {:?}, timing out step", timeout);
                    let _ = tx.send(StreamChunk::TimedOut).await;
                    break;
                }
            };
            let terminal = chunk.is_terminal();
            if tx.send(chunk).await.is_err() {
                debug!("Chunk receiver dropped, stopping relay");
                break;
            }
            if terminal {
                break;
            }
        }
    });

    ChunkStream::new(rx)
}
