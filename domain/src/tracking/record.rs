//! Phase records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Free-form key/value annotations attached when a phase starts.
pub type PhaseMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Running,
    Completed,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Running => "running",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One timed segment of session work.
///
/// Records are immutable once archived by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: u64,
    pub name: String,
    pub metadata: PhaseMetadata,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub status: PhaseStatus,
    pub result: Option<String>,
}

impl PhaseRecord {
    pub fn is_running(&self) -> bool {
        self.status == PhaseStatus::Running
    }

    /// Elapsed time until the record closed, or until `now_ms` while it is
    /// still running.
    pub fn duration_at(&self, now_ms: u64) -> Duration {
        let end = self.ended_at_ms.unwrap_or(now_ms);
        Duration::from_millis(end.saturating_sub(self.started_at_ms))
    }

    /// Elapsed time of a closed record.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at_ms
            .map(|end| Duration::from_millis(end.saturating_sub(self.started_at_ms)))
    }
}

/// History entry with repeated completions of the same phase collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseGroup {
    /// Phase name, suffixed with ` (xN)` when it completed more than once.
    pub label: String,
    pub name: String,
    pub occurrences: usize,
    pub total_duration: Duration,
    pub result: Option<String>,
}
