//! Wall-clock instrumentation of named session phases.

pub mod clock;
pub mod record;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{PhaseGroup, PhaseMetadata, PhaseRecord, PhaseStatus};
pub use tracker::{PhaseHandle, PhaseStart, PhaseSummary, PhaseTracker};
