//! Lexical intent markers.
//!
//! Text is split into lowercase alphanumeric words; a marker matches a word
//! that starts with it. `web_search` yields the words `web` and `search`,
//! so markers never match across word boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Clarify,
    Report,
    Research,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Clarify => "clarify",
            Intent::Report => "report",
            Intent::Research => "research",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Marker vocabularies per intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentMarkers {
    pub clarify: Vec<String>,
    pub report: Vec<String>,
    pub research: Vec<String>,
}

impl Default for IntentMarkers {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|w| w.to_string()).collect()
        }
        Self {
            clarify: words(&["unclear", "clarif", "question", "what"]),
            report: words(&["report", "summary", "summar", "complete", "finish", "conclu"]),
            research: words(&["search", "research", "find", "investigat"]),
        }
    }
}

impl IntentMarkers {
    /// Markers in rule order: clarify, report, research.
    pub fn ordered(&self) -> [(Intent, &[String]); 3] {
        [
            (Intent::Clarify, self.clarify.as_slice()),
            (Intent::Report, self.report.as_slice()),
            (Intent::Research, self.research.as_slice()),
        ]
    }

    /// First intent (in rule order) with a marker present in `words`,
    /// together with the matching marker.
    pub fn detect<'a>(&'a self, words: &[String]) -> Option<(Intent, &'a str)> {
        self.ordered().into_iter().find_map(|(intent, markers)| {
            markers
                .iter()
                .map(String::as_str)
                .find(|marker| !marker.is_empty() && words.iter().any(|w| w.starts_with(*marker)))
                .map(|marker| (intent, marker))
        })
    }

    pub fn has_empty_marker(&self) -> bool {
        self.ordered()
            .iter()
            .any(|(_, markers)| markers.iter().any(|m| m.trim().is_empty()))
    }
}

/// Lowercase alphanumeric words of `text`.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
