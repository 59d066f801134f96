//! Accumulated session progress read by the router.

use serde::{Deserialize, Serialize};

/// Progress counters of one research session.
///
/// Owned by the session orchestrator and mutated only between step cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub searches_done: u32,
    pub reports_created: bool,
    pub clarification_used: bool,
    /// Research notes recorded by the host.
    pub notes_count: u32,
    /// A research plan (brief) has been produced.
    pub plan_established: bool,
}

impl SessionCounters {
    /// Accumulated evidence: the larger of notes and searches.
    pub fn evidence(&self) -> u32 {
        self.notes_count.max(self.searches_done)
    }
}
