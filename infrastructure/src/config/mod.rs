//! Configuration file loading for sgr-stream
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `SGR_` (`SGR_SESSION__MAX_STEPS=4`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./sgr-stream.toml` or `./.sgr-stream.toml`
//! 4. Global config: `<config_dir>/sgr-stream/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileMarkersConfig, FileOutputConfig, FileOutputFormat,
    FileReplayConfig, FileSessionConfig,
};
pub use loader::ConfigLoader;
