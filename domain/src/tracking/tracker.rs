//! Phase tracker.
//!
//! At most one phase runs at a time. Starting a phase while another runs
//! closes the running one first with result [`AUTO_COMPLETED`]; the closed
//! record is returned so the caller can surface it. Closing with no phase
//! running is a no-op.

use super::clock::{Clock, SystemClock};
use super::record::{PhaseGroup, PhaseMetadata, PhaseRecord, PhaseStatus};
use serde::Serialize;
use std::time::Duration;

/// Result recorded on a phase closed implicitly by [`PhaseTracker::start_phase`].
pub const AUTO_COMPLETED: &str = "auto-completed";

/// Identifies a started phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseHandle {
    pub id: u64,
    pub name: String,
}

/// Returned by [`PhaseTracker::start_phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStart {
    pub handle: PhaseHandle,
    /// The phase that was running and got closed implicitly.
    pub auto_closed: Option<PhaseRecord>,
}

/// Aggregate timing view of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub total_elapsed: Duration,
    /// Archived phases (running phase excluded).
    pub phase_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    /// Mean duration of completed phases.
    pub average_duration: Duration,
    pub current_phase: Option<String>,
}

pub struct PhaseTracker {
    clock: Box<dyn Clock>,
    session_started_ms: u64,
    current: Option<PhaseRecord>,
    history: Vec<PhaseRecord>,
    next_id: u64,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let session_started_ms = clock.now_ms();
        Self {
            clock: Box::new(clock),
            session_started_ms,
            current: None,
            history: Vec::new(),
            next_id: 1,
        }
    }

    pub fn start_phase(&mut self, name: impl Into<String>, metadata: PhaseMetadata) -> PhaseStart {
        let auto_closed = self.close(PhaseStatus::Completed, AUTO_COMPLETED.to_string());

        let id = self.next_id;
        self.next_id += 1;
        let record = PhaseRecord {
            id,
            name: name.into(),
            metadata,
            started_at_ms: self.clock.now_ms(),
            ended_at_ms: None,
            status: PhaseStatus::Running,
            result: None,
        };
        let handle = PhaseHandle {
            id,
            name: record.name.clone(),
        };
        self.current = Some(record);

        PhaseStart {
            handle,
            auto_closed,
        }
    }

    /// Close the running phase as completed. Returns `None` if nothing was
    /// running.
    pub fn complete_phase(&mut self, result: impl Into<String>) -> Option<PhaseRecord> {
        self.close(PhaseStatus::Completed, result.into())
    }

    /// Close the running phase as failed. Returns `None` if nothing was
    /// running.
    pub fn fail_phase(&mut self, reason: impl Into<String>) -> Option<PhaseRecord> {
        self.close(PhaseStatus::Failed, reason.into())
    }

    fn close(&mut self, status: PhaseStatus, result: String) -> Option<PhaseRecord> {
        let mut record = self.current.take()?;
        record.ended_at_ms = Some(self.clock.now_ms());
        record.status = status;
        record.result = Some(result);
        self.history.push(record.clone());
        Some(record)
    }

    pub fn current(&self) -> Option<&PhaseRecord> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }

    pub fn summary(&self) -> PhaseSummary {
        let now = self.clock.now_ms();
        let completed: Vec<Duration> = self
            .history
            .iter()
            .filter(|r| r.status == PhaseStatus::Completed)
            .filter_map(PhaseRecord::duration)
            .collect();
        let failed_count = self
            .history
            .iter()
            .filter(|r| r.status == PhaseStatus::Failed)
            .count();
        let average_duration = if completed.is_empty() {
            Duration::ZERO
        } else {
            completed.iter().sum::<Duration>() / completed.len() as u32
        };

        PhaseSummary {
            total_elapsed: Duration::from_millis(now.saturating_sub(self.session_started_ms)),
            phase_count: self.history.len(),
            completed_count: completed.len(),
            failed_count,
            average_duration,
            current_phase: self.current.as_ref().map(|r| r.name.clone()),
        }
    }

    /// Completed phases grouped by name in order of first appearance.
    pub fn grouped_history(&self) -> Vec<PhaseGroup> {
        let mut groups: Vec<PhaseGroup> = Vec::new();
        for record in self
            .history
            .iter()
            .filter(|r| r.status == PhaseStatus::Completed)
        {
            let duration = record.duration().unwrap_or_default();
            match groups.iter_mut().find(|g| g.name == record.name) {
                Some(group) => {
                    group.occurrences += 1;
                    group.total_duration += duration;
                    group.label = format!("{} (x{})", group.name, group.occurrences);
                    group.result = Some(format!("completed {} times", group.occurrences));
                }
                None => groups.push(PhaseGroup {
                    label: record.name.clone(),
                    name: record.name.clone(),
                    occurrences: 1,
                    total_duration: duration,
                    result: record.result.clone(),
                }),
            }
        }
        groups
    }

    /// Clear history and restart the session clock.
    pub fn reset(&mut self) {
        self.current = None;
        self.history.clear();
        self.session_started_ms = self.clock.now_ms();
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhaseTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseTracker")
            .field("session_started_ms", &self.session_started_ms)
            .field("current", &self.current)
            .field("history", &self.history)
            .finish()
    }
}
