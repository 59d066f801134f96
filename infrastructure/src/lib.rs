//! Infrastructure layer for sgr-stream
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading and the replay
//! transport.

pub mod config;
pub mod replay;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileMarkersConfig, FileOutputConfig,
    FileOutputFormat, FileReplayConfig, FileSessionConfig,
};
pub use replay::{ReplayError, ReplayOptions, ReplaySource, with_chunk_timeout};
