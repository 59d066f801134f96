//! Session configuration.
//!
//! [`SessionConfig`] is passed explicitly to
//! [`ResearchSession`](crate::use_cases::run_session::ResearchSession) at
//! construction; there is no process-wide configuration state.

use serde::{Deserialize, Serialize};
use sgr_domain::{DecisionRouter, DecoderOptions, IntentMarkers};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Validate completed steps against the action schema.
    pub schema_validation: bool,
    /// Lexical markers used by the decision router.
    pub markers: IntentMarkers,
    /// Notes or searches required before the counter policy picks a report.
    pub min_evidence_for_report: u32,
    /// Maximum number of steps routed in one session.
    pub max_steps: usize,
    /// Minimum time between live renders of a streaming step.
    pub render_interval: Duration,
    /// A chunk longer than this many characters forces a render.
    pub render_chunk_threshold: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_validation: true,
            markers: IntentMarkers::default(),
            min_evidence_for_report: DecisionRouter::DEFAULT_MIN_EVIDENCE,
            max_steps: 6,
            render_interval: Duration::from_millis(200),
            render_chunk_threshold: 10,
        }
    }
}

impl SessionConfig {
    // ==================== Builder Methods ====================

    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.schema_validation = enabled;
        self
    }

    pub fn with_markers(mut self, markers: IntentMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_min_evidence_for_report(mut self, min: u32) -> Self {
        self.min_evidence_for_report = min;
        self
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_render_interval(mut self, interval: Duration) -> Self {
        self.render_interval = interval;
        self
    }

    pub fn with_render_chunk_threshold(mut self, threshold: usize) -> Self {
        self.render_chunk_threshold = threshold;
        self
    }

    /// Decoder options configured from this session config.
    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            schema_validation: self.schema_validation,
        }
    }

    /// Router configured from this session config.
    pub fn router(&self) -> DecisionRouter {
        DecisionRouter::new()
            .with_markers(self.markers.clone())
            .with_min_evidence(self.min_evidence_for_report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = SessionConfig::default();
        assert!(config.schema_validation);
        assert_eq!(config.min_evidence_for_report, 2);
        assert_eq!(config.max_steps, 6);
        assert_eq!(config.render_interval, Duration::from_millis(200));
        assert_eq!(config.render_chunk_threshold, 10);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::default()
            .with_schema_validation(false)
            .with_max_steps(12)
            .with_min_evidence_for_report(3)
            .with_render_interval(Duration::ZERO);

        assert!(!config.schema_validation);
        assert_eq!(config.max_steps, 12);
        assert_eq!(config.min_evidence_for_report, 3);
        assert_eq!(config.render_interval, Duration::ZERO);
    }

    #[test]
    fn test_decoder_options_follow_validation_flag() {
        assert!(SessionConfig::default().decoder_options().schema_validation);
        let options = SessionConfig::default()
            .with_schema_validation(false)
            .decoder_options();
        assert!(!options.schema_validation);
    }

    #[test]
    fn test_router_uses_config() {
        let router = SessionConfig::default()
            .with_markers(IntentMarkers {
                clarify: vec!["hmm".to_string()],
                report: vec![],
                research: vec![],
            })
            .router();
        assert_eq!(router.markers().clarify, vec!["hmm".to_string()]);
    }
}
