//! Research session use case
//!
//! Drives one decode → track → route cycle per streamed step:
//!
//! 1. start the `next_step` phase
//! 2. feed chunks into the incremental decoder, rendering throttled
//!    partial views, until the step completes or the stream fails
//! 3. route the finalized step with the counters as they stood when the
//!    cycle began, then update the counters
//! 4. close the phase and hand the routing token to the caller
//!
//! A step that fails to decode, validate or stream never produces a route;
//! the failure is returned instead.

use crate::config::SessionConfig;
use crate::ports::chunk_stream::ChunkStream;
use crate::ports::progress::{NoSessionProgress, SessionProgressNotifier};
use crate::use_cases::shared::check_cancelled;
use serde::Serialize;
use sgr_domain::{
    Action, ActionTag, DecisionRouter, DecodeAmbiguity, DecodeEvent, DecodeFailure, DetectedTag,
    IncrementalDecoder, KnownFields, PhaseMetadata, PhaseRecord, PhaseStart, PhaseSummary,
    PhaseTracker, Report, RouteDecision, RouteReason, RouteToken, SessionCounters, SourceRegistry,
    Step, StreamChunk, StreamFailure, StreamMetrics,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Phase name wrapping each decode-and-route cycle.
pub const STEP_PHASE: &str = "next_step";

/// Errors that end a step without a route
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The step closed but could not be parsed or validated, or the stream
    /// ended before it closed.
    #[error("Routing failed: {failure}")]
    RoutingFailed {
        failure: DecodeFailure,
        raw_text: String,
    },

    #[error("Stream error: {failure}")]
    Stream {
        failure: StreamFailure,
        raw_text: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Step budget exhausted after {max} steps")]
    StepBudgetExhausted { max: usize },

    /// A step already routed to `end`.
    #[error("Session already finished")]
    Finished,
}

impl SessionError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    /// The text received before the failure, if any.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            SessionError::RoutingFailed { raw_text, .. } | SessionError::Stream { raw_text, .. } => {
                Some(raw_text)
            }
            _ => None,
        }
    }

    fn from_decode(failure: DecodeFailure, raw_text: String) -> Self {
        match failure {
            DecodeFailure::Stream(StreamFailure::Cancelled) => SessionError::Cancelled,
            DecodeFailure::Stream(failure) => SessionError::Stream { failure, raw_text },
            failure => SessionError::RoutingFailed { failure, raw_text },
        }
    }

    /// Reason recorded on the failed phase.
    fn phase_reason(&self) -> String {
        match self {
            SessionError::Cancelled => "cancelled".to_string(),
            other => other.to_string(),
        }
    }
}

/// Non-fatal observations about a routed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepNotice {
    /// The agent asked for clarification again before the previous one was
    /// resolved. The step still routes to `clarify`; the host should move the
    /// session on (answer with assumptions, or call
    /// [`ResearchSession::resume_after_clarification`]) instead of asking the
    /// user again.
    ClarificationRepeated,
    /// The report cites numbers that no registered source carries.
    UnknownCitations { numbers: Vec<u32> },
}

/// Result of one routed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// 1-based step index within the session.
    pub index: usize,
    pub step: Step,
    pub decision: RouteDecision,
    pub notices: Vec<StepNotice>,
    pub metrics: StreamMetrics,
}

impl StepOutcome {
    pub fn token(&self) -> RouteToken {
        self.decision.token
    }

    /// The finalized report to hand to the external writer.
    pub fn report(&self) -> Option<&Report> {
        self.step.action.as_report()
    }
}

/// Read-only view of a session for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub detected_tag: Option<DetectedTag>,
    pub known_fields: KnownFields,
    pub questions: Vec<String>,
    pub phase_summary: PhaseSummary,
    pub counters: SessionCounters,
    pub steps_routed: usize,
    pub metrics: StreamMetrics,
    /// Last action tag conflict seen in the current step.
    pub ambiguity: Option<DecodeAmbiguity>,
    /// Tail of the raw text received for the current step.
    pub raw_tail: String,
}

/// Decides when a streaming step is worth re-rendering.
struct RenderThrottle {
    interval: Duration,
    chunk_threshold: usize,
    last: Option<Instant>,
}

impl RenderThrottle {
    fn new(config: &SessionConfig) -> Self {
        Self {
            interval: config.render_interval,
            chunk_threshold: config.render_chunk_threshold,
            last: None,
        }
    }

    fn should_render(&mut self, chunk_chars: usize, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due || chunk_chars > self.chunk_threshold {
            self.last = Some(now);
            true
        } else {
            false
        }
    }
}

/// One research session: owns its decoder, tracker, counters and sources.
///
/// Sessions share no mutable state; run several concurrently by creating
/// one instance each.
pub struct ResearchSession {
    config: SessionConfig,
    decoder: IncrementalDecoder,
    router: DecisionRouter,
    tracker: PhaseTracker,
    counters: SessionCounters,
    sources: SourceRegistry,
    steps_routed: usize,
    steps_attempted: usize,
    finished: bool,
    metrics: StreamMetrics,
    cancellation_token: Option<CancellationToken>,
}

impl ResearchSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_tracker(config, PhaseTracker::new())
    }

    /// Create a session timed by the given tracker.
    pub fn with_tracker(config: SessionConfig, tracker: PhaseTracker) -> Self {
        Self {
            decoder: IncrementalDecoder::with_options(config.decoder_options()),
            router: config.router(),
            tracker,
            counters: SessionCounters::default(),
            sources: SourceRegistry::new(),
            steps_routed: 0,
            steps_attempted: 0,
            finished: false,
            metrics: StreamMetrics::default(),
            cancellation_token: None,
            config,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn tracker(&self) -> &PhaseTracker {
        &self.tracker
    }

    pub fn steps_routed(&self) -> usize {
        self.steps_routed
    }

    /// Steps started so far, failed ones included.
    pub fn steps_attempted(&self) -> usize {
        self.steps_attempted
    }

    /// Whether a step has routed to `end`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run one step without progress reporting
    pub async fn run_step(&mut self, stream: ChunkStream) -> Result<StepOutcome, SessionError> {
        self.run_step_with_progress(stream, &NoSessionProgress).await
    }

    /// Run one step with progress callbacks
    pub async fn run_step_with_progress(
        &mut self,
        stream: ChunkStream,
        progress: &dyn SessionProgressNotifier,
    ) -> Result<StepOutcome, SessionError> {
        if self.finished {
            let error = SessionError::Finished;
            warn!("{}", error);
            progress.on_step_failed(&error);
            return Err(error);
        }
        if self.steps_attempted >= self.config.max_steps {
            let error = SessionError::StepBudgetExhausted {
                max: self.config.max_steps,
            };
            warn!("{}", error);
            progress.on_step_failed(&error);
            return Err(error);
        }

        self.steps_attempted += 1;
        let index = self.steps_attempted;
        self.decoder.reset();
        self.metrics = StreamMetrics::default();

        let mut metadata = PhaseMetadata::new();
        metadata.insert("step".to_string(), index.to_string());
        let started = self.tracker.start_phase(STEP_PHASE, metadata);
        self.report_auto_closed(started, progress);

        debug!("Step {}: streaming", index);
        progress.on_step_start(index);

        let step = match self.consume(stream, progress).await {
            Ok(step) => step,
            Err(error) => {
                self.tracker.fail_phase(error.phase_reason());
                if error.is_cancelled() {
                    info!("Step {} cancelled", index);
                } else {
                    warn!("Step {} failed: {}", index, error);
                }
                progress.on_step_failed(&error);
                return Err(error);
            }
        };

        let decision = self.decide(&step);
        let notices = self.notices(&step);
        self.apply(&step);
        self.steps_routed += 1;
        if decision.token == RouteToken::End {
            self.finished = true;
        }

        self.tracker
            .complete_phase(format!("{} -> {}", step.action.tag(), decision.token));
        info!(
            "Step {}: {} routed to {} ({})",
            index,
            step.action.tag(),
            decision.token,
            decision.reason
        );
        for notice in &notices {
            warn!("Step {}: {:?}", index, notice);
        }

        let outcome = StepOutcome {
            index,
            step,
            decision,
            notices,
            metrics: self.metrics,
        };
        progress.on_step_complete(&outcome);
        Ok(outcome)
    }

    /// Feed chunks into the decoder until the step reaches a terminal event.
    async fn consume(
        &mut self,
        stream: ChunkStream,
        progress: &dyn SessionProgressNotifier,
    ) -> Result<Step, SessionError> {
        check_cancelled(&self.cancellation_token)?;

        let token = self.cancellation_token.clone();
        let mut receiver = stream.receiver;
        let mut throttle = RenderThrottle::new(&self.config);
        let started = Instant::now();

        loop {
            let chunk = if let Some(ref token) = token {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(SessionError::Cancelled),
                    chunk = receiver.recv() => chunk,
                }
            } else {
                receiver.recv().await
            };

            let mut rendered_chars = 0;
            let event = match chunk {
                Some(StreamChunk::Delta(text)) => {
                    self.metrics.record(&text, started.elapsed());
                    rendered_chars = text.chars().count();
                    self.decoder.push(&text)
                }
                // A closed channel means the producer is done.
                Some(StreamChunk::End) | None => self.decoder.finish(),
                Some(StreamChunk::Error(message)) => {
                    self.decoder.fail(StreamFailure::Transport(message))
                }
                Some(StreamChunk::TimedOut) => self.decoder.fail(StreamFailure::TimedOut),
            };

            match event {
                DecodeEvent::Partial { .. } => {
                    if throttle.should_render(rendered_chars, Instant::now()) {
                        progress.on_partial(&self.snapshot());
                    }
                }
                DecodeEvent::Complete { step } => {
                    if let Some(ambiguity) = self.decoder.state().ambiguity() {
                        debug!(
                            "Conflicting action tags {:?}, chose {}",
                            ambiguity.candidates, ambiguity.chosen
                        );
                    }
                    return Ok(step);
                }
                DecodeEvent::Error { reason, raw_text } => {
                    return Err(SessionError::from_decode(reason, raw_text));
                }
            }
        }
    }

    /// Route a finalized step against the counters of the current cycle.
    ///
    /// A completed task ends the session once a report exists, either
    /// carried by this step or handed off earlier.
    fn decide(&self, step: &Step) -> RouteDecision {
        let has_report = step.action.as_report().is_some() || self.counters.reports_created;
        if step.task_completed && has_report {
            return RouteDecision::new(RouteToken::End, RouteReason::TaskCompleted);
        }
        self.router.route(&step.action, &self.counters)
    }

    fn notices(&self, step: &Step) -> Vec<StepNotice> {
        let mut notices = Vec::new();
        match &step.action {
            Action::Clarify(_) if self.counters.clarification_used => {
                notices.push(StepNotice::ClarificationRepeated);
            }
            Action::Report(report) if !self.sources.is_empty() => {
                let numbers: Vec<u32> = report
                    .citations()
                    .into_iter()
                    .filter(|n| !self.sources.contains(*n))
                    .collect();
                if !numbers.is_empty() {
                    notices.push(StepNotice::UnknownCitations { numbers });
                }
            }
            _ => {}
        }
        notices
    }

    /// Update counters from a routed step.
    fn apply(&mut self, step: &Step) {
        match step.action.tag() {
            ActionTag::Search => self.counters.searches_done += 1,
            ActionTag::Clarify => self.counters.clarification_used = true,
            ActionTag::Plan => self.counters.plan_established = true,
            ActionTag::Report => self.counters.reports_created = true,
        }
    }

    fn report_auto_closed(&self, started: PhaseStart, progress: &dyn SessionProgressNotifier) {
        if let Some(closed) = started.auto_closed {
            warn!(
                "Phase '{}' was still running and has been auto-completed",
                closed.name
            );
            progress.on_phase_auto_closed(&closed);
        }
    }

    // ==================== Snapshot ====================

    /// Current view for renderers. Safe to call between feeds.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.decoder.state();
        SessionSnapshot {
            detected_tag: state.detected_tag(),
            known_fields: state.known_fields().clone(),
            questions: state.known_fields().questions(),
            phase_summary: self.tracker.summary(),
            counters: self.counters.clone(),
            steps_routed: self.steps_routed,
            metrics: self.metrics,
            ambiguity: state.ambiguity().cloned(),
            raw_tail: sgr_domain::text::tail(state.raw_text(), 80),
        }
    }

    // ==================== Host Feedback ====================

    /// The host stored a research note.
    pub fn record_note(&mut self) {
        self.counters.notes_count += 1;
    }

    /// Register a citation source; returns its citation number.
    pub fn record_source(&mut self, url: impl Into<String>, title: impl Into<String>) -> u32 {
        self.sources.add(url, title)
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn format_sources(&self) -> String {
        self.sources.format()
    }

    /// The user answered the pending clarification.
    pub fn resume_after_clarification(&mut self) {
        self.counters.clarification_used = false;
    }

    // ==================== Host Phases ====================

    /// Time host-side work (search, report writing) on the session tracker.
    pub fn start_phase(
        &mut self,
        name: impl Into<String>,
        metadata: PhaseMetadata,
        progress: &dyn SessionProgressNotifier,
    ) {
        let started = self.tracker.start_phase(name, metadata);
        self.report_auto_closed(started, progress);
    }

    pub fn complete_phase(&mut self, result: impl Into<String>) -> Option<PhaseRecord> {
        self.tracker.complete_phase(result)
    }

    pub fn fail_phase(&mut self, reason: impl Into<String>) -> Option<PhaseRecord> {
        self.tracker.fail_phase(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sgr_domain::{ManualClock, PhaseStatus};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    // ==================== Fixtures ====================

    fn envelope(function: serde_json::Value) -> serde_json::Value {
        json!({
            "reasoning_steps": ["read the request", "pick the next action"],
            "current_situation": "working",
            "plan_status": "in progress",
            "searches_done": 0,
            "enough_data": false,
            "remaining_steps": ["continue"],
            "task_completed": false,
            "function": function
        })
    }

    fn search_step(query: &str) -> String {
        envelope(json!({
            "tool": "web_search",
            "reasoning": "need current data",
            "query": query
        }))
        .to_string()
    }

    fn clarify_step() -> String {
        envelope(json!({
            "tool": "clarification",
            "reasoning": "market is ambiguous",
            "unclear_terms": ["market"],
            "assumptions": ["new car", "base trim"],
            "questions": ["Which country?", "New or used?", "Which trim?"]
        }))
        .to_string()
    }

    fn plan_step() -> String {
        envelope(json!({
            "tool": "generate_plan",
            "reasoning": "outline",
            "research_goal": "BMW X6 pricing",
            "planned_steps": ["dealers", "official sites", "compare"],
            "search_strategies": ["manufacturer pages", "dealer listings"]
        }))
        .to_string()
    }

    fn report_step(completed: bool, citation: &str) -> String {
        let mut body = vec!["word"; 800].join(" ");
        body.push(' ');
        body.push_str(citation);
        let mut value = envelope(json!({
            "tool": "create_report",
            "reasoning": "enough data gathered",
            "title": "BMW X6 pricing",
            "user_request_language_reference": "en",
            "content": body,
            "confidence": "high"
        }));
        value["task_completed"] = json!(completed);
        value.to_string()
    }

    fn chunked(text: &str, size: usize) -> ChunkStream {
        let pieces: Vec<String> = text
            .chars()
            .collect::<Vec<_>>()
            .chunks(size)
            .map(|c| c.iter().collect())
            .collect();
        ChunkStream::from_text(pieces)
    }

    fn session() -> ResearchSession {
        ResearchSession::with_tracker(
            SessionConfig::default(),
            PhaseTracker::with_clock(ManualClock::new(0)),
        )
    }

    /// Session that accepts steps the schema would reject.
    fn lenient_session() -> ResearchSession {
        ResearchSession::new(SessionConfig::default().with_schema_validation(false))
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
        partial_tags: Mutex<Vec<Option<DetectedTag>>>,
    }

    impl SessionProgressNotifier for RecordingProgress {
        fn on_step_start(&self, index: usize) {
            self.events.lock().unwrap().push(format!("start {index}"));
        }

        fn on_partial(&self, snapshot: &SessionSnapshot) {
            self.partial_tags.lock().unwrap().push(snapshot.detected_tag);
        }

        fn on_step_complete(&self, outcome: &StepOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("complete {}", outcome.token()));
        }

        fn on_step_failed(&self, error: &SessionError) {
            self.events.lock().unwrap().push(format!("failed {error}"));
        }

        fn on_phase_auto_closed(&self, record: &PhaseRecord) {
            self.events
                .lock()
                .unwrap()
                .push(format!("auto-closed {}", record.name));
        }
    }

    // ==================== Routing Cycle Tests ====================

    #[tokio::test]
    async fn test_search_step_routes_to_research_and_counts() {
        let mut session = session();
        let outcome = session.run_step(chunked(&search_step("bmw x6 price"), 9)).await.unwrap();

        assert_eq!(outcome.index, 1);
        assert_eq!(outcome.token(), RouteToken::Research);
        assert_eq!(session.counters().searches_done, 1);
        assert_eq!(session.steps_routed(), 1);
        assert!(outcome.metrics.chunks > 1);

        let history = session.tracker().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, STEP_PHASE);
        assert_eq!(history[0].status, PhaseStatus::Completed);
        assert_eq!(history[0].result.as_deref(), Some("web_search -> research"));
    }

    #[tokio::test]
    async fn test_scenario_without_validation() {
        let config = SessionConfig::default().with_schema_validation(false);
        let mut session = ResearchSession::new(config);
        let stream = ChunkStream::from_text([
            r#"{"reasoning_steps":["a"],"current_situation":"x""#,
            r#","function":{"tool":"web_search","query":"bmw x6 price"}}"#,
        ]);
        let outcome = session.run_step(stream).await.unwrap();
        assert_eq!(outcome.token(), RouteToken::Research);
    }

    #[tokio::test]
    async fn test_counters_are_read_before_update() {
        let mut session = session();
        session.run_step(chunked(&plan_step(), 32)).await.unwrap();
        assert!(session.counters().plan_established);

        session.record_note();
        session.record_note();
        // Report marker routes to report regardless of counters
        let outcome = session.run_step(chunked(&report_step(false, "[1]"), 64)).await.unwrap();
        assert_eq!(outcome.token(), RouteToken::Report);
        assert!(outcome.report().is_some());
        assert!(session.counters().reports_created);
    }

    #[tokio::test]
    async fn test_completed_report_ends_session() {
        let mut session = session();
        let outcome = session.run_step(chunked(&report_step(true, "[1]"), 64)).await.unwrap();
        assert_eq!(outcome.token(), RouteToken::End);
        assert_eq!(outcome.decision.reason, RouteReason::TaskCompleted);
        assert_eq!(outcome.report().map(|r| r.title.as_str()), Some("BMW X6 pricing"));
        assert!(session.counters().reports_created);
        assert!(session.is_finished());

        let error = session.run_step(chunked(&search_step("q"), 8)).await.unwrap_err();
        assert_eq!(error, SessionError::Finished);
        assert_eq!(session.steps_routed(), 1);
    }

    #[tokio::test]
    async fn test_completed_task_after_earlier_report_ends() {
        let mut session = lenient_session();
        let first = session.run_step(chunked(&report_step(false, "[1]"), 64)).await.unwrap();
        assert_eq!(first.token(), RouteToken::Report);
        assert!(!session.is_finished());

        let mut done: serde_json::Value = serde_json::from_str(&search_step("q")).unwrap();
        done["task_completed"] = json!(true);
        let second = session.run_step(chunked(&done.to_string(), 32)).await.unwrap();
        assert_eq!(second.token(), RouteToken::End);
        assert!(second.report().is_none());
    }

    #[tokio::test]
    async fn test_completed_task_without_report_is_routed() {
        let mut session = lenient_session();
        let mut done: serde_json::Value = serde_json::from_str(&search_step("q")).unwrap();
        done["task_completed"] = json!(true);
        let outcome = session.run_step(chunked(&done.to_string(), 32)).await.unwrap();
        assert_eq!(outcome.token(), RouteToken::Research);
        assert!(!session.is_finished());
    }

    #[tokio::test]
    async fn test_repeated_clarification_notice() {
        let mut session = session();
        let first = session.run_step(chunked(&clarify_step(), 16)).await.unwrap();
        assert_eq!(first.token(), RouteToken::Clarify);
        assert!(first.notices.is_empty());
        assert!(session.counters().clarification_used);

        let second = session.run_step(chunked(&clarify_step(), 16)).await.unwrap();
        assert_eq!(second.notices, vec![StepNotice::ClarificationRepeated]);
        assert_eq!(second.token(), RouteToken::Clarify);

        session.resume_after_clarification();
        let third = session.run_step(chunked(&clarify_step(), 16)).await.unwrap();
        assert!(third.notices.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_citations_notice() {
        let mut session = session();
        assert_eq!(session.record_source("https://a.example", "A"), 1);
        let outcome = session.run_step(chunked(&report_step(false, "[1] [7]"), 64)).await.unwrap();
        assert_eq!(
            outcome.notices,
            vec![StepNotice::UnknownCitations { numbers: vec![7] }]
        );
        assert_eq!(session.format_sources(), "[1] A - https://a.example");
    }

    // ==================== Failure Tests ====================

    #[tokio::test]
    async fn test_invalid_step_is_routing_failure() {
        let mut session = session();
        let text = r#"{"function":{"tool":"web_search","query":"q"}}"#;
        let error = session.run_step(chunked(text, 5)).await.unwrap_err();
        match &error {
            SessionError::RoutingFailed {
                failure: DecodeFailure::Invalid(_),
                raw_text,
            } => assert_eq!(raw_text, text),
            other => panic!("expected routing failure, got {:?}", other),
        }
        assert_eq!(session.steps_routed(), 0);
        assert_eq!(session.counters(), &SessionCounters::default());
        assert_eq!(session.tracker().history()[0].status, PhaseStatus::Failed);
    }

    #[tokio::test]
    async fn test_stream_ending_early_is_incomplete() {
        let mut session = session();
        let error = session
            .run_step(ChunkStream::from_text([r#"{"current_situation":"x""#]))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            SessionError::RoutingFailed {
                failure: DecodeFailure::Incomplete,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_stream_error() {
        let mut session = session();
        let stream = ChunkStream::from_chunks(vec![
            StreamChunk::Delta(r#"{"current_situation":"x","#.to_string()),
            StreamChunk::TimedOut,
        ]);
        let error = session.run_step(stream).await.unwrap_err();
        assert_eq!(
            error,
            SessionError::Stream {
                failure: StreamFailure::TimedOut,
                raw_text: r#"{"current_situation":"x","#.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_stream_error() {
        let mut session = session();
        let stream = ChunkStream::from_chunks(vec![StreamChunk::Error("reset".to_string())]);
        let error = session.run_step(stream).await.unwrap_err();
        assert!(matches!(
            error,
            SessionError::Stream {
                failure: StreamFailure::Transport(_),
                ..
            }
        ));
        assert_eq!(error.raw_text(), Some(""));
    }

    #[tokio::test]
    async fn test_cancellation_between_chunks() {
        let token = CancellationToken::new();
        let mut session = session().with_cancellation(token.clone());
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamChunk::Delta(r#"{"current_situation":"#.to_string()))
            .await
            .unwrap();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
            // Keep the sender alive until after cancellation
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(tx);
        });

        let error = session.run_step(ChunkStream::new(rx)).await.unwrap_err();
        assert!(error.is_cancelled());
        let failed = &session.tracker().history()[0];
        assert_eq!(failed.status, PhaseStatus::Failed);
        assert_eq!(failed.result.as_deref(), Some("cancelled"));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut session = session().with_cancellation(token);
        let error = session.run_step(chunked(&search_step("q"), 8)).await.unwrap_err();
        assert_eq!(error, SessionError::Cancelled);
        assert_eq!(session.tracker().history()[0].result.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_step_budget() {
        let mut session = ResearchSession::new(SessionConfig::default().with_max_steps(1));
        session.run_step(chunked(&search_step("q"), 8)).await.unwrap();
        let error = session.run_step(chunked(&search_step("q"), 8)).await.unwrap_err();
        assert_eq!(error, SessionError::StepBudgetExhausted { max: 1 });
    }

    #[tokio::test]
    async fn test_failed_steps_count_against_budget() {
        let mut session = ResearchSession::new(SessionConfig::default().with_max_steps(2));
        let invalid = r#"{"function":{"tool":"web_search","query":"q"}}"#;
        for _ in 0..2 {
            let error = session.run_step(chunked(invalid, 8)).await.unwrap_err();
            assert!(matches!(error, SessionError::RoutingFailed { .. }));
        }

        let error = session.run_step(chunked(invalid, 8)).await.unwrap_err();
        assert_eq!(error, SessionError::StepBudgetExhausted { max: 2 });
        assert_eq!(session.steps_attempted(), 2);
        assert_eq!(session.steps_routed(), 0);
    }

    #[tokio::test]
    async fn test_outcome_index_counts_failed_attempts() {
        let mut session = session();
        session
            .run_step(ChunkStream::from_text([r#"{"current_situation":"x""#]))
            .await
            .unwrap_err();
        let outcome = session.run_step(chunked(&search_step("q"), 8)).await.unwrap();
        assert_eq!(outcome.index, 2);
        assert_eq!(session.steps_routed(), 1);
    }

    // ==================== Progress & Snapshot Tests ====================

    #[tokio::test]
    async fn test_progress_callbacks() {
        let mut session = session();
        let progress = RecordingProgress::default();
        session
            .run_step_with_progress(chunked(&clarify_step(), 12), &progress)
            .await
            .unwrap();

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start 1".to_string(), "complete clarify".to_string()]);

        let tags = progress.partial_tags.lock().unwrap().clone();
        assert!(!tags.is_empty());
        assert!(tags.contains(&Some(DetectedTag::Action(ActionTag::Clarify))));
    }

    #[tokio::test]
    async fn test_render_throttle_limits_partials() {
        let config = SessionConfig::default().with_render_interval(Duration::from_secs(60));
        let mut session = ResearchSession::new(config);
        let progress = RecordingProgress::default();
        session
            .run_step_with_progress(chunked(&search_step("q"), 4), &progress)
            .await
            .unwrap();
        // First partial renders; later small chunks fall inside the interval
        assert_eq!(progress.partial_tags.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_host_phase_auto_closed_by_next_step() {
        let mut session = session();
        let progress = RecordingProgress::default();
        session.start_phase("web_search", PhaseMetadata::new(), &progress);
        session
            .run_step_with_progress(chunked(&search_step("q"), 8), &progress)
            .await
            .unwrap();

        let events = progress.events.lock().unwrap().clone();
        assert_eq!(events[0], "auto-closed web_search");
        assert_eq!(session.tracker().history().len(), 2);
    }

    #[test]
    fn test_snapshot_of_idle_session() {
        let session = session();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.detected_tag, None);
        assert!(snapshot.known_fields.is_empty());
        assert!(snapshot.questions.is_empty());
        assert_eq!(snapshot.steps_routed, 0);
        assert_eq!(snapshot.ambiguity, None);
        assert_eq!(snapshot.phase_summary.phase_count, 0);
    }

    #[tokio::test]
    async fn test_snapshot_after_step_keeps_fields() {
        let mut session = session();
        session.run_step(chunked(&clarify_step(), 16)).await.unwrap();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.detected_tag, Some(DetectedTag::Action(ActionTag::Clarify)));
        assert_eq!(snapshot.questions.len(), 3);
        assert!(snapshot.counters.clarification_used);
        assert_eq!(snapshot.phase_summary.completed_count, 1);
    }

    #[tokio::test]
    async fn test_snapshot_exposes_tag_conflict() {
        let mut session = lenient_session();
        let mut value: serde_json::Value = serde_json::from_str(&search_step("q")).unwrap();
        value["draft"] = json!({ "tool": "clarification" });
        let outcome = session.run_step(chunked(&value.to_string(), 16)).await.unwrap();
        assert_eq!(outcome.step.action.tag(), ActionTag::Search);

        let ambiguity = session.snapshot().ambiguity.unwrap();
        assert!(ambiguity.candidates.contains(&ActionTag::Search));
        assert!(ambiguity.candidates.contains(&ActionTag::Clarify));
    }

    #[test]
    fn test_render_throttle() {
        let mut throttle = RenderThrottle::new(&SessionConfig::default());
        let t0 = Instant::now();
        assert!(throttle.should_render(1, t0));
        assert!(!throttle.should_render(1, t0 + Duration::from_millis(50)));
        assert!(throttle.should_render(11, t0 + Duration::from_millis(60)));
        assert!(throttle.should_render(1, t0 + Duration::from_millis(300)));
    }
}
