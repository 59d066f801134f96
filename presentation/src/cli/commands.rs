//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for routed steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Step details, routing decision and phase summary
    Full,
    /// Only the routing token of each step
    Routes,
    /// One JSON object per routed step
    Json,
}

/// CLI arguments for sgr-stream
#[derive(Parser, Debug)]
#[command(name = "sgr-stream")]
#[command(author, version, about = "Replay streamed reasoning steps through the decoder and router")]
#[command(long_about = r#"
sgr-stream replays recorded agent steps as a chunked stream, decodes each
step incrementally, and prints the routing token the session produces.

Each transcript file holds one step document. Steps are replayed in the
order given, all through one session, so counters carry over:

1. Decode: chunks are parsed as they arrive; partial fields are shown live
2. Route:  the finished step is mapped to clarify, research, report or end
3. Track:  every cycle is timed as a phase and summarised at exit

Configuration files are loaded from (in priority order):
1. SGR_* environment variables (e.g. SGR_SESSION__MAX_STEPS=4)
2. --config <path>       Explicit config file
3. ./sgr-stream.toml     Project-level config
4. ~/.config/sgr-stream/config.toml   Global config

Example:
  sgr-stream steps/01-clarify.json steps/02-plan.json steps/03-search.json
  sgr-stream --output routes --chunk-size 8 --chunk-delay-ms 0 steps/*.json
"#)]
pub struct Cli {
    /// Transcript files, one recorded step per file
    #[arg(value_name = "FILE", required_unless_present = "show_config")]
    pub transcripts: Vec<PathBuf>,

    /// Output format (defaults to the configured format, then full)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Characters per replayed chunk
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Pause before each replayed chunk, in milliseconds
    #[arg(long, value_name = "MS")]
    pub chunk_delay_ms: Option<u64>,

    /// Accept steps that parse but violate the action schema
    #[arg(long)]
    pub no_validation: bool,

    /// Maximum number of routed steps
    #[arg(long, value_name = "N")]
    pub max_steps: Option<usize>,
}
