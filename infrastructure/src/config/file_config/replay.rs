//! Replay transport configuration from TOML (`[replay]` section)

use crate::replay::ReplayOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw replay configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReplayConfig {
    /// Characters per emitted chunk
    pub chunk_size: usize,
    /// Pause before each chunk, in milliseconds
    pub chunk_delay_ms: u64,
    /// Longest wait for the next chunk before the step times out, in milliseconds
    pub chunk_timeout_ms: u64,
}

impl Default for FileReplayConfig {
    fn default() -> Self {
        let defaults = ReplayOptions::default();
        Self {
            chunk_size: defaults.chunk_size,
            chunk_delay_ms: defaults.chunk_delay.as_millis() as u64,
            chunk_timeout_ms: defaults.chunk_timeout.as_millis() as u64,
        }
    }
}

impl FileReplayConfig {
    pub fn to_replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            chunk_size: self.chunk_size,
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
            chunk_timeout: Duration::from_millis(self.chunk_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_deserialize() {
        let toml_str = r#"
[replay]
chunk_size = 5
chunk_delay_ms = 0
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let options = config.replay.to_replay_options();
        assert_eq!(options.chunk_size, 5);
        assert_eq!(options.chunk_delay, Duration::ZERO);
        assert_eq!(options.chunk_timeout, ReplayOptions::default().chunk_timeout);
    }
}
