//! CLI entrypoint for sgr-stream
//!
//! This is the main binary that wires together all layers using
//! dependency injection. It replays recorded steps through one research
//! session and plays the host's part for each routing token.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use sgr_application::{
    NoSessionProgress, ResearchSession, SessionConfig, SessionError, SessionProgressNotifier,
    StepOutcome, StepSource,
};
use sgr_domain::{Action, PhaseMetadata, RouteToken};
use sgr_infrastructure::{ConfigLoader, FileConfig, FileOutputFormat, ReplaySource};
use sgr_presentation::{Cli, ConsoleFormatter, OutputFormat, OutputFormatter, ProgressReporter};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    let config = apply_overrides(&cli, &file_config)?;

    if !file_config.output.color {
        colored::control::set_override(false);
    }
    let format = cli.output.unwrap_or(match file_config.output.format {
        Some(FileOutputFormat::Routes) => OutputFormat::Routes,
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        Some(FileOutputFormat::Full) | None => OutputFormat::Full,
    });

    // === Dependency Injection ===
    let mut replay_options = file_config.to_replay_options()?;
    if let Some(size) = cli.chunk_size {
        replay_options = replay_options.with_chunk_size(size.max(1));
    }
    if let Some(ms) = cli.chunk_delay_ms {
        replay_options = replay_options.with_chunk_delay(Duration::from_millis(ms));
    }
    let source = ReplaySource::from_files(&cli.transcripts, replay_options)
        .context("Failed to load transcripts")?;

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            ctrl_c_token.cancel();
        }
    });

    let mut session = ResearchSession::new(config).with_cancellation(cancellation);

    let show_progress = !cli.quiet && file_config.output.show_progress;
    let reporter = ProgressReporter::new();
    let progress: &dyn SessionProgressNotifier = if show_progress {
        &reporter
    } else {
        &NoSessionProgress
    };
    let formatter = ConsoleFormatter;

    info!("Replaying {} step(s)", source.len());

    let mut index = 0;
    while let Some(stream) = source.open_step(index).await? {
        index += 1;

        let outcome = match session.run_step_with_progress(stream, progress).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                eprintln!("{}", ConsoleFormatter::format_failure(&e));
                break;
            }
            Err(e @ (SessionError::StepBudgetExhausted { .. } | SessionError::Finished)) => {
                eprintln!("{}", ConsoleFormatter::format_failure(&e));
                break;
            }
            Err(e) => {
                // No route for this step; the next recorded step gets its turn
                eprintln!("{}", ConsoleFormatter::format_failure(&e));
                continue;
            }
        };

        println!("{}", formatter.format_as(format, &outcome));

        if !act_on_route(&mut session, &outcome, format, progress) {
            break;
        }
    }

    if format == OutputFormat::Full {
        println!("{}", ConsoleFormatter::format_summary(session.tracker()));
        if !session.sources().is_empty() {
            println!("Sources:\n{}", session.format_sources());
        }
    }

    Ok(())
}

/// Layer command-line flags over the file configuration.
fn apply_overrides(cli: &Cli, file_config: &FileConfig) -> Result<SessionConfig> {
    let mut config = file_config.to_session_config()?;
    if cli.no_validation {
        config = config.with_schema_validation(false);
    }
    if let Some(max) = cli.max_steps {
        config = config.with_max_steps(max);
    }
    Ok(config)
}

/// Play the host's part for a routed step. Returns `false` when the
/// session is over.
fn act_on_route(
    session: &mut ResearchSession,
    outcome: &StepOutcome,
    format: OutputFormat,
    progress: &dyn SessionProgressNotifier,
) -> bool {
    let verbose = format == OutputFormat::Full;
    match (outcome.token(), &outcome.step.action) {
        (RouteToken::End, _) => {
            hand_off_report(session, outcome, verbose, progress);
            info!("Task completed after {} step(s)", outcome.index);
            return false;
        }
        (RouteToken::Research, Action::Search(search)) => {
            let mut metadata = PhaseMetadata::new();
            metadata.insert("query".to_string(), search.query.clone());
            session.start_phase("web_search", metadata, progress);
            let number = session.record_source(
                format!("replay://search/{}", outcome.index),
                search.query.clone(),
            );
            session.record_note();
            session.complete_phase(format!("source [{}] recorded", number));
        }
        (RouteToken::Research, _) => {}
        (RouteToken::Clarify, _) => {
            // Replay has no user; treat the questions as answered
            if verbose {
                println!("(clarification answered by replay)");
            }
            session.resume_after_clarification();
        }
        (RouteToken::Report, _) => {
            if outcome.report().is_some() {
                hand_off_report(session, outcome, verbose, progress);
            } else if verbose {
                println!("(report requested; next step should write it)");
            }
        }
    }
    true
}

/// Time the external writer's work on a finalized report.
fn hand_off_report(
    session: &mut ResearchSession,
    outcome: &StepOutcome,
    verbose: bool,
    progress: &dyn SessionProgressNotifier,
) {
    let Some(report) = outcome.report() else {
        return;
    };
    session.start_phase("create_report", PhaseMetadata::new(), progress);
    if verbose {
        println!("(report '{}' handed to writer)", report.title);
    }
    session.complete_phase(format!("{} words", report.word_count()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from(["sgr-stream", "--no-validation", "--max-steps", "3", "a.json"]);
        let config = apply_overrides(&cli, &FileConfig::default()).unwrap();
        assert!(!config.schema_validation);
        assert_eq!(config.max_steps, 3);
    }

    #[tokio::test]
    async fn test_completed_report_is_handed_off_and_ends() {
        let mut session = ResearchSession::new(SessionConfig::default());
        let outcome = session
            .run_step(sgr_application::ChunkStream::from_text([include_str!(
                "../../demos/bmw-x6/06-report.json"
            )]))
            .await
            .unwrap();
        assert_eq!(outcome.token(), RouteToken::End);

        let keep_going = act_on_route(&mut session, &outcome, OutputFormat::Routes, &NoSessionProgress);
        assert!(!keep_going);
        let last = session.tracker().history().last().unwrap();
        assert_eq!(last.name, "create_report");
    }

    #[tokio::test]
    async fn test_report_request_without_report_continues() {
        let mut session = ResearchSession::new(SessionConfig::default());
        let outcome = session
            .run_step(sgr_application::ChunkStream::from_text([include_str!(
                "../../demos/bmw-x6/05-ready-to-report.json"
            )]))
            .await
            .unwrap();
        assert_eq!(outcome.token(), RouteToken::Report);
        assert!(act_on_route(&mut session, &outcome, OutputFormat::Routes, &NoSessionProgress));
        assert_eq!(session.tracker().history().len(), 1);
    }

    #[test]
    fn test_apply_overrides_rejects_invalid_file_config() {
        let cli = Cli::parse_from(["sgr-stream", "a.json"]);
        let mut file_config = FileConfig::default();
        file_config.session.max_steps = 0;
        assert!(apply_overrides(&cli, &file_config).is_err());
    }
}
