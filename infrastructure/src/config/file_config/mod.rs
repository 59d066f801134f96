//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly, validated, then converted into the
//! application's [`SessionConfig`] and the replay adapter's options.

mod markers;
mod output;
mod replay;
mod session;

pub use markers::FileMarkersConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use replay::FileReplayConfig;
pub use session::FileSessionConfig;

use crate::replay::ReplayOptions;
use serde::{Deserialize, Serialize};
use sgr_application::SessionConfig;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("session.max_steps cannot be 0")]
    ZeroMaxSteps,

    #[error("replay.chunk_size cannot be 0")]
    ZeroChunkSize,

    #[error("replay.chunk_timeout_ms cannot be 0")]
    ZeroChunkTimeout,

    #[error("markers.{intent} contains an empty marker")]
    EmptyMarker { intent: &'static str },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Session orchestration settings
    pub session: FileSessionConfig,
    /// Router marker vocabularies
    pub markers: FileMarkersConfig,
    /// Replay transport settings
    pub replay: FileReplayConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session.max_steps == 0 {
            return Err(ConfigValidationError::ZeroMaxSteps);
        }
        if self.replay.chunk_size == 0 {
            return Err(ConfigValidationError::ZeroChunkSize);
        }
        if self.replay.chunk_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroChunkTimeout);
        }

        let markers = self.markers.to_markers();
        for (intent, list) in markers.ordered() {
            if list.iter().any(|m| m.is_empty()) {
                return Err(ConfigValidationError::EmptyMarker {
                    intent: intent.as_str(),
                });
            }
        }

        Ok(())
    }

    /// Build the session configuration after validating.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigValidationError> {
        self.validate()?;
        Ok(SessionConfig::default()
            .with_schema_validation(self.session.schema_validation)
            .with_markers(self.markers.to_markers())
            .with_min_evidence_for_report(self.session.min_evidence_for_report)
            .with_max_steps(self.session.max_steps)
            .with_render_interval(self.session.render_interval())
            .with_render_chunk_threshold(self.session.render_chunk_threshold))
    }

    /// Build the replay adapter options after validating.
    pub fn to_replay_options(&self) -> Result<ReplayOptions, ConfigValidationError> {
        self.validate()?;
        Ok(self.replay.to_replay_options())
    }
}
