//! Presentation layer for sgr-stream
//!
//! This crate contains CLI definitions, output formatters,
//! and progress reporters for streaming sessions.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
