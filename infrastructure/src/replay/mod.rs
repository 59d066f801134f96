//! Replay transport
//!
//! Streams recorded step documents as paced chunks through the
//! [`StepSource`](sgr_application::StepSource) port, bounding the wait for
//! each chunk.

mod relay;
mod source;

pub use relay::with_chunk_timeout;
pub use source::{ReplayError, ReplayOptions, ReplaySource};
