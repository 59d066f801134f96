//! Output configuration from TOML (`[output]` section)

use serde::{Deserialize, Serialize};

/// How routed steps are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOutputFormat {
    /// Step details, routing decision and phase summary
    #[default]
    Full,
    /// One routing token per line
    Routes,
    /// One JSON object per routed step
    Json,
}

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format
    pub format: Option<FileOutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
    /// Show the live spinner while steps stream
    pub show_progress: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            show_progress: true,
        }
    }
}
