//! Decision router.
//!
//! Two tiers, evaluated in order:
//!
//! 1. Lexical markers in the action text: clarify, then report, then
//!    research. A lexical match always wins over counters.
//! 2. Counter policy when no marker matches: no plan yet → research;
//!    not enough evidence → research; otherwise → report.

use super::counters::SessionCounters;
use super::markers::{Intent, IntentMarkers, words};
use crate::schema::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Next workflow phase handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteToken {
    Clarify,
    Research,
    Report,
    End,
}

impl RouteToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteToken::Clarify => "clarify",
            RouteToken::Research => "research",
            RouteToken::Report => "report",
            RouteToken::End => "end",
        }
    }
}

impl fmt::Display for RouteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Intent> for RouteToken {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Clarify => RouteToken::Clarify,
            Intent::Report => RouteToken::Report,
            Intent::Research => RouteToken::Research,
        }
    }
}

/// Which rule produced a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RouteReason {
    Marker { intent: Intent, marker: String },
    NoPlan,
    InsufficientEvidence { evidence: u32, required: u32 },
    EnoughEvidence { evidence: u32 },
    /// The task completed after a report was already handed off.
    TaskCompleted,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteReason::Marker { intent, marker } => {
                write!(f, "{intent} marker '{marker}'")
            }
            RouteReason::NoPlan => write!(f, "no research plan yet"),
            RouteReason::InsufficientEvidence { evidence, required } => {
                write!(f, "evidence {evidence} below {required}")
            }
            RouteReason::EnoughEvidence { evidence } => write!(f, "evidence {evidence} sufficient"),
            RouteReason::TaskCompleted => write!(f, "task completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub token: RouteToken,
    pub reason: RouteReason,
}

impl RouteDecision {
    pub fn new(token: RouteToken, reason: RouteReason) -> Self {
        Self { token, reason }
    }
}

/// Pure mapping from `(action, counters)` to a [`RouteToken`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRouter {
    markers: IntentMarkers,
    min_evidence: u32,
}

impl DecisionRouter {
    pub const DEFAULT_MIN_EVIDENCE: u32 = 2;

    pub fn new() -> Self {
        Self {
            markers: IntentMarkers::default(),
            min_evidence: Self::DEFAULT_MIN_EVIDENCE,
        }
    }

    pub fn with_markers(mut self, markers: IntentMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_min_evidence(mut self, min_evidence: u32) -> Self {
        self.min_evidence = min_evidence;
        self
    }

    pub fn markers(&self) -> &IntentMarkers {
        &self.markers
    }

    /// Route a decoded action. The scanned text is the action's wire tag
    /// followed by its short-form string content.
    pub fn route(&self, action: &Action, counters: &SessionCounters) -> RouteDecision {
        let mut text = String::from(action.tag().as_str());
        for fragment in action.text_fragments() {
            text.push(' ');
            text.push_str(fragment);
        }
        self.route_text(&text, counters)
    }

    /// Route arbitrary text.
    pub fn route_text(&self, text: &str, counters: &SessionCounters) -> RouteDecision {
        if let Some((intent, marker)) = self.markers.detect(&words(text)) {
            return RouteDecision::new(
                intent.into(),
                RouteReason::Marker {
                    intent,
                    marker: marker.to_string(),
                },
            );
        }
        self.route_by_counters(counters)
    }

    fn route_by_counters(&self, counters: &SessionCounters) -> RouteDecision {
        if !counters.plan_established {
            return RouteDecision::new(RouteToken::Research, RouteReason::NoPlan);
        }
        let evidence = counters.evidence();
        if evidence < self.min_evidence {
            return RouteDecision::new(
                RouteToken::Research,
                RouteReason::InsufficientEvidence {
                    evidence,
                    required: self.min_evidence,
                },
            );
        }
        RouteDecision::new(RouteToken::Report, RouteReason::EnoughEvidence { evidence })
    }
}

impl Default for DecisionRouter {
    fn default() -> Self {
        Self::new()
    }
}
