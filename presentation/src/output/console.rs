//! Console output formatter for routed steps

use crate::output::formatter::OutputFormatter;
use chrono::{DateTime, Local};
use colored::Colorize;
use sgr_application::{SessionError, SessionSnapshot, StepNotice, StepOutcome};
use sgr_domain::{Action, PhaseRecord, PhaseStatus, PhaseTracker, RouteToken, text};
use std::time::Duration;

/// Formats routed steps and session summaries for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format one routed step
    pub fn format(outcome: &StepOutcome) -> String {
        let step = &outcome.step;
        let mut output = String::new();

        output.push_str(&Self::section_header(&format!(
            "Step {}: {}",
            outcome.index,
            step.action.tag().display_name()
        )));

        if !step.current_situation.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Situation:".cyan().bold(),
                step.current_situation
            ));
        }
        if !step.reasoning_steps.is_empty() {
            output.push_str(&format!("{}\n", "Reasoning:".cyan().bold()));
            output.push_str(&Self::list(&step.reasoning_steps));
        }

        output.push_str(&Self::action_details(&step.action));

        if !step.remaining_steps.is_empty() {
            output.push_str(&format!("{}\n", "Remaining:".dimmed()));
            output.push_str(&Self::list(&step.remaining_steps));
        }

        output.push_str(&format!(
            "\n{} {} {}\n",
            "Route:".bold(),
            Self::token(outcome.decision.token),
            format!("({})", outcome.decision.reason).dimmed()
        ));

        for notice in &outcome.notices {
            output.push_str(&format!("{} {}\n", "!".yellow().bold(), Self::notice(notice)));
        }

        output
    }

    fn action_details(action: &Action) -> String {
        let mut output = String::new();
        match action {
            Action::Clarify(c) => {
                output.push_str(&format!("{}\n", "Questions:".yellow().bold()));
                output.push_str(&Self::list(&c.questions));
                if !c.unclear_terms.is_empty() {
                    output.push_str(&format!(
                        "{} {}\n",
                        "Unclear terms:".dimmed(),
                        c.unclear_terms.join(", ")
                    ));
                }
            }
            Action::Plan(p) => {
                output.push_str(&format!("{} {}\n", "Goal:".yellow().bold(), p.research_goal));
                output.push_str(&Self::list(&p.planned_steps));
            }
            Action::Search(s) => {
                output.push_str(&format!(
                    "{} {} {}\n",
                    "Query:".yellow().bold(),
                    s.query,
                    format!("(max {} results)", s.max_results).dimmed()
                ));
            }
            Action::Report(r) => {
                output.push_str(&format!("{} {}\n", "Report:".yellow().bold(), r.title));
                output.push_str(&format!(
                    "  {} words, confidence {}, {} citation(s)\n",
                    r.word_count(),
                    r.confidence,
                    r.citations().len()
                ));
            }
        }
        output
    }

    /// Format as JSON (one line per step)
    pub fn format_json(outcome: &StepOutcome) -> String {
        serde_json::to_string(outcome).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the routing token only
    pub fn format_route(outcome: &StepOutcome) -> String {
        outcome.decision.token.to_string()
    }

    /// Format a step that ended without a route
    pub fn format_failure(error: &SessionError) -> String {
        let mut output = format!("{} {}\n", "x".red().bold(), error.to_string().red());
        if let Some(raw) = error.raw_text()
            && !raw.is_empty()
        {
            output.push_str(&format!(
                "  {} {}\n",
                "received:".dimmed(),
                text::tail(raw, 120)
            ));
        }
        output
    }

    /// One-line view of a streaming step for the spinner
    pub fn format_partial(snapshot: &SessionSnapshot) -> String {
        let tag = snapshot
            .detected_tag
            .map(|t| t.to_string())
            .unwrap_or_else(|| "...".to_string());
        let fields = snapshot.known_fields.envelope.len() + snapshot.known_fields.action.len();
        let mut line = format!("{} | {} field(s)", tag, fields);
        if !snapshot.questions.is_empty() {
            line.push_str(&format!(" | {} question(s)", snapshot.questions.len()));
        }
        line.push_str(&format!(
            " | {:.0} chars/s",
            snapshot.metrics.chars_per_second()
        ));
        line
    }

    /// Format the phase history and summary of a session
    pub fn format_summary(tracker: &PhaseTracker) -> String {
        let mut output = Self::section_header("Session Summary");

        for record in tracker.history() {
            output.push_str(&Self::phase_line(record));
        }

        let groups = tracker.grouped_history();
        if groups.iter().any(|g| g.occurrences > 1) {
            output.push_str(&format!("\n{}\n", "Grouped:".cyan().bold()));
            for group in &groups {
                output.push_str(&format!(
                    "  {:<24} {:>8}  {}\n",
                    group.label,
                    Self::duration(group.total_duration),
                    group.result.as_deref().unwrap_or("")
                ));
            }
        }

        let summary = tracker.summary();
        output.push_str(&format!(
            "\n{} {} phase(s), {} completed, {} failed, avg {}, total {}\n",
            "Phases:".bold(),
            summary.phase_count,
            summary.completed_count,
            summary.failed_count,
            Self::duration(summary.average_duration),
            Self::duration(summary.total_elapsed)
        ));
        if let Some(current) = summary.current_phase {
            output.push_str(&format!("{} {}\n", "Still running:".yellow(), current));
        }
        output
    }

    fn phase_line(record: &PhaseRecord) -> String {
        let marker = match record.status {
            PhaseStatus::Completed => "v".green(),
            PhaseStatus::Failed => "x".red(),
            PhaseStatus::Running => "~".yellow(),
        };
        format!(
            "  {} {} {:<12} {:>8}  {}\n",
            marker,
            Self::timestamp(record.started_at_ms).dimmed(),
            record.name,
            record
                .duration()
                .map(Self::duration)
                .unwrap_or_else(|| "-".to_string()),
            text::truncate(record.result.as_deref().unwrap_or(""), 60)
        )
    }

    fn timestamp(ms: u64) -> String {
        i64::try_from(ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "--:--:--.---".to_string())
    }

    fn duration(d: Duration) -> String {
        if d.as_secs() >= 1 {
            format!("{:.2}s", d.as_secs_f64())
        } else {
            format!("{}ms", d.as_millis())
        }
    }

    fn token(token: RouteToken) -> String {
        let name = token.as_str().to_uppercase();
        match token {
            RouteToken::Clarify => name.yellow().bold().to_string(),
            RouteToken::Research => name.cyan().bold().to_string(),
            RouteToken::Report => name.green().bold().to_string(),
            RouteToken::End => name.magenta().bold().to_string(),
        }
    }

    fn notice(notice: &StepNotice) -> String {
        match notice {
            StepNotice::ClarificationRepeated => {
                "clarification requested again before the previous one was answered".to_string()
            }
            StepNotice::UnknownCitations { numbers } => {
                let list: Vec<String> = numbers.iter().map(|n| format!("[{}]", n)).collect();
                format!("report cites unknown sources {}", list.join(" "))
            }
        }
    }

    fn list(items: &[String]) -> String {
        items.iter().map(|item| format!("  * {}\n", item)).collect()
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, outcome: &StepOutcome) -> String {
        Self::format(outcome)
    }

    fn format_json(&self, outcome: &StepOutcome) -> String {
        Self::format_json(outcome)
    }

    fn format_route(&self, outcome: &StepOutcome) -> String {
        Self::format_route(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormat;
    use sgr_domain::{
        Clarification, DecodeFailure, ManualClock, PhaseMetadata, RouteDecision, RouteReason,
        Step, StreamMetrics, WebSearch,
    };

    fn outcome(action: Action, token: RouteToken, reason: RouteReason) -> StepOutcome {
        StepOutcome {
            index: 2,
            step: Step::new(action)
                .with_reasoning_steps(["compare dealers", "need prices"])
                .with_situation("two dealers found"),
            decision: RouteDecision::new(token, reason),
            notices: vec![],
            metrics: StreamMetrics::default(),
        }
    }

    fn search_outcome() -> StepOutcome {
        outcome(
            Action::Search(WebSearch::new("bmw x6 price")),
            RouteToken::Research,
            RouteReason::NoPlan,
        )
    }

    #[test]
    fn test_format_full_step() {
        let text = ConsoleFormatter::format(&search_outcome());
        assert!(text.contains("Step 2"));
        assert!(text.contains("two dealers found"));
        assert!(text.contains("compare dealers"));
        assert!(text.contains("bmw x6 price"));
        assert!(text.contains("RESEARCH"));
        assert!(text.contains("no research plan yet"));
    }

    #[test]
    fn test_format_clarification_lists_questions() {
        let mut result = outcome(
            Action::Clarify(Clarification {
                questions: vec!["Which country?".to_string(), "New or used?".to_string()],
                ..Default::default()
            }),
            RouteToken::Clarify,
            RouteReason::NoPlan,
        );
        result.notices.push(StepNotice::ClarificationRepeated);
        let text = ConsoleFormatter::format(&result);
        assert!(text.contains("* Which country?"));
        assert!(text.contains("* New or used?"));
        assert!(text.contains("clarification requested again"));
    }

    #[test]
    fn test_format_route_and_json() {
        let result = search_outcome();
        assert_eq!(ConsoleFormatter::format_route(&result), "research");

        let json: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_json(&result)).unwrap();
        assert_eq!(json["decision"]["token"], "research");
        assert_eq!(json["decision"]["reason"]["rule"], "no_plan");
        assert_eq!(json["step"]["function"]["tool"], "web_search");
    }

    #[test]
    fn test_format_as_dispatches_on_format() {
        let result = search_outcome();
        let formatter = ConsoleFormatter;
        assert_eq!(formatter.format_as(OutputFormat::Routes, &result), "research");
        assert!(formatter.format_as(OutputFormat::Json, &result).starts_with('{'));
    }

    #[test]
    fn test_format_failure_shows_received_text() {
        let error = SessionError::RoutingFailed {
            failure: DecodeFailure::Incomplete,
            raw_text: r#"{"current_situation":"x""#.to_string(),
        };
        let text = ConsoleFormatter::format_failure(&error);
        assert!(text.contains("Routing failed"));
        assert!(text.contains("current_situation"));

        let cancelled = ConsoleFormatter::format_failure(&SessionError::Cancelled);
        assert!(!cancelled.contains("received:"));
    }

    #[test]
    fn test_format_summary_groups_repeats() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut tracker = PhaseTracker::with_clock(clock.clone());
        for _ in 0..2 {
            tracker.start_phase("next_step", PhaseMetadata::new());
            clock.advance(Duration::from_millis(250));
            tracker.complete_phase("web_search -> research");
        }
        tracker.start_phase("next_step", PhaseMetadata::new());
        tracker.fail_phase("cancelled");

        let text = ConsoleFormatter::format_summary(&tracker);
        assert!(text.contains("Session Summary"));
        assert!(text.contains("next_step (x2)"));
        assert!(text.contains("3 phase(s), 2 completed, 1 failed"));
        assert!(text.contains("250ms"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(ConsoleFormatter::duration(Duration::from_millis(42)), "42ms");
        assert_eq!(ConsoleFormatter::duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
