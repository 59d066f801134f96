//! Session configuration from TOML (`[session]` section)

use serde::{Deserialize, Serialize};
use sgr_application::SessionConfig;
use std::time::Duration;

/// Raw session configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Validate completed steps against the action schema
    pub schema_validation: bool,
    /// Notes or searches required before the counter policy picks a report
    pub min_evidence_for_report: u32,
    /// Maximum number of routed steps per session
    pub max_steps: usize,
    /// Minimum interval between partial renders, in milliseconds
    pub render_interval_ms: u64,
    /// Chunks longer than this (in characters) always trigger a render
    pub render_chunk_threshold: usize,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            schema_validation: defaults.schema_validation,
            min_evidence_for_report: defaults.min_evidence_for_report,
            max_steps: defaults.max_steps,
            render_interval_ms: defaults.render_interval.as_millis() as u64,
            render_chunk_threshold: defaults.render_chunk_threshold,
        }
    }
}

impl FileSessionConfig {
    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}
