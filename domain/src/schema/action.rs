//! Agent actions and their discriminator tags.
//!
//! On the wire an action is a JSON object whose `tool` member selects the
//! variant:
//!
//! | Variant | `tool` value |
//! |---------|--------------|
//! | [`Action::Clarify`] | `clarification` |
//! | [`Action::Plan`] | `generate_plan` |
//! | [`Action::Search`] | `web_search` |
//! | [`Action::Report`] | `create_report` |
//!
//! Members are parsed leniently (missing members take their defaults);
//! bounds and completeness are enforced by [`validate`](super::validate).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator of an [`Action`] variant.
///
/// Declaration order is the detection priority order used when a buffer
/// carries conflicting signals: Clarify > Plan > Search > Report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionTag {
    #[serde(rename = "clarification")]
    Clarify,
    #[serde(rename = "generate_plan")]
    Plan,
    #[serde(rename = "web_search")]
    Search,
    #[serde(rename = "create_report")]
    Report,
}

impl ActionTag {
    /// All tags, highest detection priority first.
    pub const ALL: [ActionTag; 4] = [
        ActionTag::Clarify,
        ActionTag::Plan,
        ActionTag::Search,
        ActionTag::Report,
    ];

    /// The `tool` value identifying this variant on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::Clarify => "clarification",
            ActionTag::Plan => "generate_plan",
            ActionTag::Search => "web_search",
            ActionTag::Report => "create_report",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ActionTag::Clarify => "Clarification",
            ActionTag::Plan => "Research Plan",
            ActionTag::Search => "Web Search",
            ActionTag::Report => "Report",
        }
    }

    /// Resolve a wire `tool` value. Matching is exact.
    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == value)
    }

    /// Lower value means higher priority.
    pub fn priority(&self) -> u8 {
        match self {
            ActionTag::Clarify => 0,
            ActionTag::Plan => 1,
            ActionTag::Search => 2,
            ActionTag::Report => 3,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The next operation the agent decided to take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool")]
pub enum Action {
    #[serde(rename = "clarification")]
    Clarify(Clarification),
    #[serde(rename = "generate_plan")]
    Plan(ResearchPlan),
    #[serde(rename = "web_search")]
    Search(WebSearch),
    #[serde(rename = "create_report")]
    Report(Report),
}

impl Action {
    pub fn tag(&self) -> ActionTag {
        match self {
            Action::Clarify(_) => ActionTag::Clarify,
            Action::Plan(_) => ActionTag::Plan,
            Action::Search(_) => ActionTag::Search,
            Action::Report(_) => ActionTag::Report,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Action::Clarify(c) => &c.reasoning,
            Action::Plan(p) => &p.reasoning,
            Action::Search(s) => &s.reasoning,
            Action::Report(r) => &r.reasoning,
        }
    }

    /// Short-form string content of the action, in declaration order.
    ///
    /// The long-form report body is excluded; it is handed off opaquely and
    /// never inspected for intent.
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut fragments = vec![self.reasoning()];
        match self {
            Action::Clarify(c) => {
                fragments.extend(c.unclear_terms.iter().map(String::as_str));
                fragments.extend(c.assumptions.iter().map(String::as_str));
                fragments.extend(c.questions.iter().map(String::as_str));
            }
            Action::Plan(p) => {
                fragments.push(&p.research_goal);
                fragments.extend(p.planned_steps.iter().map(String::as_str));
                fragments.extend(p.search_strategies.iter().map(String::as_str));
            }
            Action::Search(s) => fragments.push(&s.query),
            Action::Report(r) => {
                fragments.push(&r.title);
                fragments.push(&r.language_reference);
            }
        }
        fragments
    }

    pub fn as_report(&self) -> Option<&Report> {
        match self {
            Action::Report(report) => Some(report),
            _ => None,
        }
    }
}

/// Ask the user to resolve ambiguity before researching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clarification {
    pub reasoning: String,
    pub unclear_terms: Vec<String>,
    pub assumptions: Vec<String>,
    pub questions: Vec<String>,
}

/// Establish the research goal and the steps to reach it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPlan {
    pub reasoning: String,
    pub research_goal: String,
    pub planned_steps: Vec<String>,
    pub search_strategies: Vec<String>,
}

/// Run one web search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearch {
    pub reasoning: String,
    pub query: String,
    pub max_results: u32,
    pub plan_adapted: bool,
}

impl WebSearch {
    pub const DEFAULT_MAX_RESULTS: u32 = 10;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

impl Default for WebSearch {
    fn default() -> Self {
        Self {
            reasoning: String::new(),
            query: String::new(),
            max_results: Self::DEFAULT_MAX_RESULTS,
            plan_adapted: false,
        }
    }
}

/// Produce the final research report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub reasoning: String,
    pub title: String,
    #[serde(
        rename = "user_request_language_reference",
        alias = "language_reference"
    )]
    pub language_reference: String,
    pub content: String,
    pub confidence: Confidence,
}

impl Report {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Distinct bracketed citation numbers (`[1]`, `[12]`) in order of first
    /// appearance.
    pub fn citations(&self) -> Vec<u32> {
        let mut found = Vec::new();
        let bytes = self.content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'[' {
                i += 1;
                continue;
            }
            let digits_start = i + 1;
            let mut j = digits_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digits_start
                && j < bytes.len()
                && bytes[j] == b']'
                && let Ok(number) = self.content[digits_start..j].parse::<u32>()
                && !found.contains(&number)
            {
                found.push(number);
            }
            i = j.max(i + 1);
        }
        found
    }
}

/// Self-assessed confidence of a report.
///
/// Values outside the known set are kept verbatim so that validation, not
/// parsing, reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl Confidence {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Confidence::Unrecognized(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Unrecognized(value) => value,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Unrecognized(String::new())
    }
}

impl From<String> for Confidence {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            "low" => Confidence::Low,
            _ => Confidence::Unrecognized(value),
        }
    }
}

impl From<Confidence> for String {
    fn from(value: Confidence) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
