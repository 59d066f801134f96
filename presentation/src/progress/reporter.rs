//! Progress reporting for research sessions

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sgr_application::{SessionError, SessionProgressNotifier, SessionSnapshot, StepOutcome};
use sgr_domain::PhaseRecord;
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a live spinner per streaming step
pub struct ProgressReporter {
    step_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            step_bar: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.step_bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.as_ref() {
            f(pb);
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.step_bar
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProgressNotifier for ProgressReporter {
    fn on_step_start(&self, index: usize) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(format!("Step {}", index));
        pb.set_message("waiting for output...");
        pb.enable_steady_tick(Duration::from_millis(100));

        let previous = self
            .step_bar
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(pb);
        if let Some(previous) = previous {
            previous.finish_and_clear();
        }
    }

    fn on_partial(&self, snapshot: &SessionSnapshot) {
        self.with_bar(|pb| pb.set_message(ConsoleFormatter::format_partial(snapshot)));
    }

    fn on_step_complete(&self, outcome: &StepOutcome) {
        if let Some(pb) = self.take_bar() {
            pb.finish_with_message(format!(
                "{} {} -> {}",
                "v".green(),
                outcome.step.action.tag(),
                outcome.decision.token.as_str().bold()
            ));
        }
    }

    fn on_step_failed(&self, error: &SessionError) {
        match self.take_bar() {
            Some(pb) => pb.finish_with_message(format!("{} {}", "x".red(), error)),
            None => eprintln!("{} {}", "x".red(), error),
        }
    }

    fn on_phase_auto_closed(&self, record: &PhaseRecord) {
        let message = format!(
            "{} phase '{}' was still running and has been closed",
            "!".yellow(),
            record.name
        );
        let guard = self.step_bar.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(pb) => pb.println(message),
            None => eprintln!("{}", message),
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl SessionProgressNotifier for SimpleProgress {
    fn on_step_start(&self, index: usize) {
        println!("{} {}", "->".cyan(), format!("Step {}", index).bold());
    }

    fn on_step_complete(&self, outcome: &StepOutcome) {
        println!(
            "  {} {} -> {}",
            "v".green(),
            outcome.step.action.tag(),
            outcome.decision.token
        );
    }

    fn on_step_failed(&self, error: &SessionError) {
        println!("  {} {}", "x".red(), error);
    }

    fn on_phase_auto_closed(&self, record: &PhaseRecord) {
        println!("  {} phase '{}' auto-completed", "!".yellow(), record.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgr_application::{ChunkStream, ResearchSession, SessionConfig};

    const SEARCH_STEP: &str = r#"{"reasoning_steps":["a","b"],"remaining_steps":["c"],"function":{"tool":"web_search","query":"bmw x6 price"}}"#;

    #[tokio::test]
    async fn test_reporter_drives_spinner_through_a_step() {
        let reporter = ProgressReporter::new();
        let mut session = ResearchSession::new(SessionConfig::default());
        let outcome = session
            .run_step_with_progress(ChunkStream::from_text([&SEARCH_STEP[..40], &SEARCH_STEP[40..]]), &reporter)
            .await
            .unwrap();

        assert_eq!(outcome.decision.token.as_str(), "research");
        assert!(reporter.step_bar.lock().unwrap().is_none());
    }

    #[test]
    fn test_failure_without_spinner_does_not_panic() {
        let reporter = ProgressReporter::new();
        reporter.on_step_failed(&SessionError::Cancelled);
        reporter.on_step_start(1);
        reporter.on_step_failed(&SessionError::Cancelled);
        assert!(reporter.step_bar.lock().unwrap().is_none());
    }
}
