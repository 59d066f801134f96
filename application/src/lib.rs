//! Application layer for sgr-stream
//!
//! This crate contains the research session use case, port definitions,
//! and session configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::SessionConfig;
pub use ports::{
    chunk_stream::{ChunkStream, StepSource, StepSourceError},
    progress::{NoSessionProgress, SessionProgressNotifier},
};
pub use use_cases::run_session::{
    ResearchSession, STEP_PHASE, SessionError, SessionSnapshot, StepNotice, StepOutcome,
};
