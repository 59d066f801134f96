//! Citation sources gathered during a session.

use serde::Serialize;

/// A numbered source a report may cite as `[n]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub number: u32,
    pub url: String,
    pub title: String,
}

/// Numbered, URL-deduplicated source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and return its citation number. A URL already
    /// present keeps its original number.
    pub fn add(&mut self, url: impl Into<String>, title: impl Into<String>) -> u32 {
        let url = url.into();
        if let Some(existing) = self.sources.iter().find(|s| s.url == url) {
            return existing.number;
        }
        let number = self.sources.len() as u32 + 1;
        self.sources.push(Source {
            number,
            url,
            title: title.into(),
        });
        number
    }

    pub fn get(&self, number: u32) -> Option<&Source> {
        self.sources.iter().find(|s| s.number == number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.get(number).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// One `[n] title - url` line per source.
    pub fn format(&self) -> String {
        self.sources
            .iter()
            .map(|s| {
                if s.title.is_empty() {
                    format!("[{}] {}", s.number, s.url)
                } else {
                    format!("[{}] {} - {}", s.number, s.title, s.url)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
